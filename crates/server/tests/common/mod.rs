#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use dex_core::{RegionEntry, RegionPage};
use dex_ingest::testing::FakeUpstream;
use dex_ingest::IngestSettings;
use dex_server::{AppState, Orchestrator};
use dex_storage::{MemoryRegionStore, RegionStore, StoreError};

pub fn kanto() -> FakeUpstream {
    let mut upstream = FakeUpstream::new();
    upstream.add_region(
        "kanto",
        &[(1, "bulbasaur", "grass"), (2, "ivysaur", "grass"), (3, "venusaur", "grass")],
    );
    upstream
}

pub fn row(region: &str, dex_id: u32, name: &str) -> RegionEntry {
    RegionEntry {
        region: region.to_string(),
        dex_id,
        name: name.to_string(),
        types: vec!["normal".into()],
        sprite: None,
        forms: vec![],
    }
}

/// Memory store that records every count it reports.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryRegionStore,
    pub counts: Mutex<Vec<u64>>,
}

#[async_trait]
impl RegionStore for RecordingStore {
    async fn upsert_entry(&self, entry: RegionEntry) -> Result<(), StoreError> {
        self.inner.upsert_entry(entry).await
    }

    async fn count_by_region(&self, region: &str) -> Result<u64, StoreError> {
        let count = self.inner.count_by_region(region).await?;
        self.counts.lock().unwrap().push(count);
        Ok(count)
    }

    async fn clear_region(&self, region: &str) -> Result<u64, StoreError> {
        self.inner.clear_region(region).await
    }

    async fn page(&self, region: &str, limit: u32, offset: u64) -> Result<RegionPage, StoreError> {
        self.inner.page(region, limit, offset).await
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }
}

/// Store whose every operation fails.
pub struct BrokenStore;

#[async_trait]
impl RegionStore for BrokenStore {
    async fn upsert_entry(&self, _entry: RegionEntry) -> Result<(), StoreError> {
        Err(StoreError::Other("disk on fire".into()))
    }

    async fn count_by_region(&self, _region: &str) -> Result<u64, StoreError> {
        Err(StoreError::Other("disk on fire".into()))
    }

    async fn clear_region(&self, _region: &str) -> Result<u64, StoreError> {
        Err(StoreError::Other("disk on fire".into()))
    }

    async fn page(&self, _region: &str, _limit: u32, _offset: u64) -> Result<RegionPage, StoreError> {
        Err(StoreError::Other("disk on fire".into()))
    }

    fn backend_name(&self) -> &'static str {
        "broken"
    }
}

pub fn settings() -> IngestSettings {
    IngestSettings {
        batch_size: 5,
        variety_batch_size: 5,
        batch_delay: Duration::ZERO,
    }
}

pub fn orchestrator(upstream: FakeUpstream, store: Arc<dyn RegionStore>) -> Arc<Orchestrator> {
    Arc::new(Orchestrator::new(
        Arc::new(upstream),
        store,
        settings(),
        Duration::from_secs(1),
    ))
}

pub fn state(orchestrator: &Arc<Orchestrator>) -> Arc<AppState> {
    Arc::new(AppState::new(Arc::clone(orchestrator)))
}
