use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use dex_core::{DexId, RegionEntry, RegionPage};

use crate::error::StoreError;
use crate::RegionStore;

/// In-process region cache keyed by `(region, dex_id)`.
///
/// `DashMap` shards its locks, so an upsert only holds the shard containing
/// its key. Reads clone rows out and never wait on an ingestion job as a whole.
#[derive(Default)]
pub struct MemoryRegionStore {
    rows: DashMap<(String, DexId), RegionEntry>,
}

impl MemoryRegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl RegionStore for MemoryRegionStore {
    async fn upsert_entry(&self, mut entry: RegionEntry) -> Result<(), StoreError> {
        entry.dedupe_forms();
        let key = (entry.region.clone(), entry.dex_id);
        self.rows.insert(key, entry);
        Ok(())
    }

    async fn count_by_region(&self, region: &str) -> Result<u64, StoreError> {
        Ok(self.rows.iter().filter(|r| r.key().0 == region).count() as u64)
    }

    async fn clear_region(&self, region: &str) -> Result<u64, StoreError> {
        let before = self.rows.len();
        self.rows.retain(|(r, _), _| r != region);
        let removed = before.saturating_sub(self.rows.len()) as u64;
        debug!(region, removed, "cleared cached region");
        Ok(removed)
    }

    async fn page(&self, region: &str, limit: u32, offset: u64) -> Result<RegionPage, StoreError> {
        let mut rows: Vec<RegionEntry> = self
            .rows
            .iter()
            .filter(|r| r.key().0 == region)
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by_key(|e| e.dex_id);

        let total = rows.len() as u64;
        let results = rows
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit as usize)
            .collect();
        Ok(RegionPage::new(results, total, offset, limit))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_core::VarietyInfo;
    use std::sync::Arc;

    fn entry(region: &str, dex_id: DexId, name: &str) -> RegionEntry {
        RegionEntry {
            region: region.to_string(),
            dex_id,
            name: name.to_string(),
            types: vec!["normal".into()],
            sprite: None,
            forms: vec![],
        }
    }

    #[tokio::test]
    async fn upsert_is_idempotent_and_replaces_in_full() {
        let store = MemoryRegionStore::new();
        let mut first = entry("kanto", 25, "pikachu");
        first.sprite = Some("https://img/25.png".into());
        store.upsert_entry(first).await.unwrap();

        let second = entry("kanto", 25, "pikachu");
        store.upsert_entry(second.clone()).await.unwrap();
        store.upsert_entry(second.clone()).await.unwrap();

        assert_eq!(store.count_by_region("kanto").await.unwrap(), 1);
        let page = store.page("kanto", 10, 0).await.unwrap();
        assert_eq!(page.results, vec![second]);
        // Replace semantics: the sprite from the first payload is gone.
        assert!(page.results[0].sprite.is_none());
    }

    #[tokio::test]
    async fn page_orders_by_dex_id_and_slices() {
        let store = MemoryRegionStore::new();
        for (id, name) in [(3, "venusaur"), (1, "bulbasaur"), (2, "ivysaur")] {
            store.upsert_entry(entry("kanto", id, name)).await.unwrap();
        }
        store.upsert_entry(entry("johto", 152, "chikorita")).await.unwrap();

        let first = store.page("kanto", 2, 0).await.unwrap();
        let names: Vec<_> = first.results.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["bulbasaur", "ivysaur"]);
        assert_eq!(first.total_count, 3);
        assert!(first.has_more);

        let second = store.page("kanto", 2, 2).await.unwrap();
        assert_eq!(second.results.len(), 1);
        assert_eq!(second.results[0].name, "venusaur");
        assert!(!second.has_more);

        let past_end = store.page("kanto", 2, 10).await.unwrap();
        assert!(past_end.results.is_empty());
        assert_eq!(past_end.total_count, 3);
    }

    #[tokio::test]
    async fn clear_region_leaves_other_regions() {
        let store = MemoryRegionStore::new();
        for id in 1..=10 {
            store.upsert_entry(entry("kanto", id, "x")).await.unwrap();
        }
        store.upsert_entry(entry("hoenn", 252, "treecko")).await.unwrap();

        assert_eq!(store.clear_region("kanto").await.unwrap(), 10);
        assert_eq!(store.count_by_region("kanto").await.unwrap(), 0);
        assert_eq!(store.count_by_region("hoenn").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upsert_dedupes_forms_by_id() {
        let store = MemoryRegionStore::new();
        let mut e = entry("kanto", 6, "charizard");
        let form = VarietyInfo {
            form_name: "charizard".into(),
            form_id: Some(6),
            types: vec!["fire".into(), "flying".into()],
            sprite: None,
        };
        e.forms = vec![form.clone(), form];
        store.upsert_entry(e).await.unwrap();

        let page = store.page("kanto", 1, 0).await.unwrap();
        assert_eq!(page.results[0].forms.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_upserts_on_distinct_keys_all_land() {
        let store = Arc::new(MemoryRegionStore::new());
        let tasks = (1..=50u32).map(|id| {
            let store = store.clone();
            tokio::spawn(async move { store.upsert_entry(entry("kanto", id, "x")).await })
        });
        for res in futures::future::join_all(tasks).await {
            res.unwrap().unwrap();
        }
        assert_eq!(store.count_by_region("kanto").await.unwrap(), 50);

        let page = store.page("kanto", 200, 0).await.unwrap();
        let ids: Vec<_> = page.results.iter().map(|e| e.dex_id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}
