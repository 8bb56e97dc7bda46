//! Region ingestion job: listing → batched expansion → per-row upserts.
//!
//! Listing entries are processed `batch_size` at a time. Entries inside a
//! batch run concurrently and land in the store in completion order; batches
//! run one after another with a short pacing pause between them. A failing
//! entry is logged and counted, never fatal to the job.

use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use dex_core::config::IngestConfig;
use dex_storage::RegionStore;

use crate::error::IngestError;
use crate::expand::{expand_entry, Expansion};
use crate::upstream::{PokedexEntry, Upstream};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSettings {
    pub batch_size: usize,
    pub variety_batch_size: usize,
    pub batch_delay: Duration,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            batch_size: 5,
            variety_batch_size: 5,
            batch_delay: Duration::from_millis(150),
        }
    }
}

impl IngestSettings {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1) as usize,
            variety_batch_size: config.variety_batch_size.max(1) as usize,
            batch_delay: Duration::from_millis(config.batch_delay_ms),
        }
    }
}

/// Summary of one completed job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub region: String,
    /// Entries in the upstream listing.
    pub listed: usize,
    pub upserted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

enum EntryOutcome {
    Upserted,
    Skipped,
    Failed,
}

/// Fetch `region`'s listing and upsert one row per species.
///
/// Fails only when the listing itself cannot be fetched.
pub async fn ingest_region(
    upstream: &dyn Upstream,
    store: &dyn RegionStore,
    region: &str,
    settings: &IngestSettings,
) -> Result<IngestReport, IngestError> {
    let start = Instant::now();
    let listing = upstream.pokedex(region).await?;
    let entries = listing.pokemon_entries;

    info!(region, entries = entries.len(), "ingesting regional pokedex");

    let mut report = IngestReport {
        region: region.to_string(),
        listed: entries.len(),
        ..Default::default()
    };

    for (i, batch) in entries.chunks(settings.batch_size.max(1)).enumerate() {
        if i > 0 && !settings.batch_delay.is_zero() {
            tokio::time::sleep(settings.batch_delay).await;
        }

        let outcomes = join_all(
            batch
                .iter()
                .map(|entry| expand_and_store(upstream, store, region, entry, settings)),
        )
        .await;

        for outcome in outcomes {
            match outcome {
                EntryOutcome::Upserted => report.upserted += 1,
                EntryOutcome::Skipped => report.skipped += 1,
                EntryOutcome::Failed => report.failed += 1,
            }
        }
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        region,
        listed = report.listed,
        upserted = report.upserted,
        skipped = report.skipped,
        failed = report.failed,
        duration_ms = report.duration_ms,
        "regional pokedex ingested"
    );
    Ok(report)
}

async fn expand_and_store(
    upstream: &dyn Upstream,
    store: &dyn RegionStore,
    region: &str,
    entry: &PokedexEntry,
    settings: &IngestSettings,
) -> EntryOutcome {
    let species = &entry.pokemon_species.name;
    match expand_entry(upstream, region, entry, settings.variety_batch_size).await {
        Ok(Expansion::Entry(row)) => {
            let dex_id = row.dex_id;
            match store.upsert_entry(row).await {
                Ok(()) => EntryOutcome::Upserted,
                Err(e) => {
                    warn!(region, %species, dex_id, error = %e, "upsert failed");
                    EntryOutcome::Failed
                }
            }
        }
        Ok(Expansion::Skipped { .. }) => EntryOutcome::Skipped,
        Err(e) => {
            warn!(region, %species, error = %e, "species expansion failed");
            EntryOutcome::Failed
        }
    }
}
