//! "Ensure region populated" orchestration.
//!
//! A request for a region with no cached rows (or with `reset`) rebuilds the
//! region synchronously before anything is read. A request for a warm region
//! is served from the cache straight away while a background refresh re-runs
//! the ingestion job; at most one background refresh per region is in flight.
//!
//! The response's `total_count` is overridden with the upstream listing
//! length whenever that fetch succeeds within its budget. The cache can hold
//! fewer rows than that total while a job is still running, so `has_more`
//! may point past the rows currently cached.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use dex_core::{Config, RegionPage};
use dex_ingest::{
    ingest_region, FetchClient, IngestError, IngestReport, IngestSettings, PokeApiClient,
    RetryPolicy, Upstream,
};
use dex_storage::{RegionStore, StoreError};

/// A validated page request for one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub region: String,
    pub limit: u32,
    pub offset: u64,
    pub reset: bool,
}

pub struct Orchestrator {
    upstream: Arc<dyn Upstream>,
    store: Arc<dyn RegionStore>,
    settings: IngestSettings,
    total_timeout: Duration,
    refreshing: Mutex<HashSet<String>>,
}

impl Orchestrator {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        store: Arc<dyn RegionStore>,
        settings: IngestSettings,
        total_timeout: Duration,
    ) -> Self {
        Self {
            upstream,
            store,
            settings,
            total_timeout,
            refreshing: Mutex::new(HashSet::new()),
        }
    }

    /// Wire the HTTP upstream client and ingestion pacing from `config`.
    pub fn from_config(config: &Config, store: Arc<dyn RegionStore>) -> Self {
        let fetch = FetchClient::new(RetryPolicy::from_config(&config.upstream));
        let upstream = PokeApiClient::new(config.upstream.base_url.clone(), fetch);
        Self::new(
            Arc::new(upstream),
            store,
            IngestSettings::from_config(&config.ingest),
            Duration::from_millis(config.upstream.total_timeout_ms),
        )
    }

    pub fn store(&self) -> &Arc<dyn RegionStore> {
        &self.store
    }

    /// Run the ingestion job for `region` to completion.
    pub async fn ensure_region(&self, region: &str) -> Result<IngestReport, IngestError> {
        ingest_region(self.upstream.as_ref(), self.store.as_ref(), region, &self.settings).await
    }

    /// Clear `region` and ingest it again from scratch.
    pub async fn rebuild(&self, region: &str) -> Result<IngestReport, IngestError> {
        let removed = self.store.clear_region(region).await?;
        info!(region, removed, "region cleared");
        self.ensure_region(region).await
    }

    /// Start a background refresh of `region` unless one is already running.
    /// Returns whether a new refresh was spawned.
    pub fn spawn_refresh(self: &Arc<Self>, region: &str) -> bool {
        if !self.lock_refreshing().insert(region.to_string()) {
            debug!(region, "background refresh already in flight");
            return false;
        }

        let guard = RefreshGuard {
            orchestrator: Arc::clone(self),
            region: region.to_string(),
        };
        tokio::spawn(async move {
            let region = guard.region.as_str();
            match guard.orchestrator.ensure_region(region).await {
                Ok(report) => debug!(region, upserted = report.upserted, "background refresh finished"),
                Err(e) => error!(region, error = %e, "background refresh failed"),
            }
        });
        true
    }

    /// Regions with a background refresh currently in flight, sorted.
    pub fn refreshing(&self) -> Vec<String> {
        let mut regions: Vec<String> = self.lock_refreshing().iter().cloned().collect();
        regions.sort();
        regions
    }

    /// Length of the upstream listing for `region`, if it can be fetched
    /// within the total budget and is positive.
    pub async fn authoritative_total(&self, region: &str) -> Option<u64> {
        match tokio::time::timeout(self.total_timeout, self.upstream.pokedex(region)).await {
            Ok(Ok(listing)) => {
                let total = listing.pokemon_entries.len() as u64;
                (total > 0).then_some(total)
            }
            Ok(Err(e)) => {
                warn!(region, error = %e, "authoritative total unavailable");
                None
            }
            Err(_) => {
                warn!(
                    region,
                    timeout_ms = self.total_timeout.as_millis() as u64,
                    "authoritative total timed out"
                );
                None
            }
        }
    }

    /// Make sure `request.region` is populated, then read the requested page.
    ///
    /// Every step before the page read degrades on failure; only the read
    /// itself can fail the request.
    pub async fn serve(self: &Arc<Self>, request: &PageRequest) -> Result<RegionPage, StoreError> {
        let region = request.region.as_str();
        let total = self.authoritative_total(region).await;

        if request.reset {
            match self.store.clear_region(region).await {
                Ok(removed) => info!(region, removed, "region reset requested"),
                Err(e) => warn!(region, error = %e, "region reset failed"),
            }
        }

        let cached = match self.store.count_by_region(region).await {
            Ok(count) => count,
            Err(e) => {
                warn!(region, error = %e, "cache count failed, treating region as empty");
                0
            }
        };

        if cached == 0 || request.reset {
            if let Err(e) = self.ensure_region(region).await {
                warn!(region, error = %e, "synchronous ingestion failed");
            }
        } else {
            self.spawn_refresh(region);
        }

        let page = self.store.page(region, request.limit, request.offset).await?;
        Ok(match total {
            Some(total) => {
                if total > page.total_count {
                    debug!(region, cached = page.total_count, total, "cache behind upstream listing");
                }
                page.with_total(total, request.offset, request.limit)
            }
            None => page,
        })
    }

    fn lock_refreshing(&self) -> MutexGuard<'_, HashSet<String>> {
        self.refreshing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Removes the region from the in-flight set when the refresh task ends,
/// including when it panics.
struct RefreshGuard {
    orchestrator: Arc<Orchestrator>,
    region: String,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.orchestrator.lock_refreshing().remove(&self.region);
    }
}
