mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use common::{kanto, orchestrator, row, settings};
use dex_ingest::testing::FakeUpstream;
use dex_server::{Orchestrator, PageRequest};
use dex_storage::{MemoryRegionStore, RegionStore};

/// Records the level of every event it sees.
#[derive(Clone, Default)]
struct LevelRecorder(Arc<Mutex<Vec<Level>>>);

impl<S: Subscriber> Layer<S> for LevelRecorder {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.0.lock().unwrap().push(*event.metadata().level());
    }
}

fn request(region: &str, limit: u32, offset: u64, reset: bool) -> PageRequest {
    PageRequest {
        region: region.to_string(),
        limit,
        offset,
        reset,
    }
}

#[tokio::test(start_paused = true)]
async fn background_refresh_is_deduplicated_per_region() {
    let mut upstream = kanto();
    upstream.pokemon_latency = Duration::from_millis(100);
    let store = Arc::new(MemoryRegionStore::new());
    let orch = orchestrator(upstream, store.clone());

    assert!(orch.spawn_refresh("kanto"));
    assert!(!orch.spawn_refresh("kanto"));
    assert!(orch.spawn_refresh("johto"));
    assert_eq!(orch.refreshing(), vec!["johto", "kanto"]);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(orch.refreshing().is_empty());
    assert_eq!(store.count_by_region("kanto").await.unwrap(), 3);

    assert!(orch.spawn_refresh("kanto"));
}

#[tokio::test]
async fn rebuild_replaces_existing_rows() {
    let store = Arc::new(MemoryRegionStore::new());
    store.upsert_entry(row("kanto", 150, "mewtwo")).await.unwrap();
    let orch = orchestrator(kanto(), store.clone());

    let report = orch.rebuild("kanto").await.unwrap();
    assert_eq!(report.upserted, 3);

    let page = store.page("kanto", 10, 0).await.unwrap();
    let ids: Vec<_> = page.results.iter().map(|e| e.dex_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn slow_listing_leaves_cached_count_in_place() {
    let mut upstream = kanto();
    upstream.pokedex_latency = Duration::from_secs(5);
    let store: Arc<dyn RegionStore> = Arc::new(MemoryRegionStore::new());
    store.upsert_entry(row("kanto", 1, "bulbasaur")).await.unwrap();

    let orch = Arc::new(Orchestrator::new(
        Arc::new(upstream),
        store,
        settings(),
        Duration::from_millis(200),
    ));

    assert_eq!(orch.authoritative_total("kanto").await, None);

    let page = orch.serve(&request("kanto", 10, 0, false)).await.unwrap();
    assert_eq!(page.total_count, 1);
    assert!(!page.has_more);
}

#[tokio::test]
async fn authoritative_total_counts_listing_entries() {
    let upstream = kanto();
    let orch = orchestrator(upstream, Arc::new(MemoryRegionStore::new()));
    assert_eq!(orch.authoritative_total("kanto").await, Some(3));
    assert_eq!(orch.authoritative_total("hoenn").await, None);
}

#[tokio::test]
async fn cold_serve_fetches_listing_for_total_and_for_ingestion() {
    let orch_upstream = Arc::new(kanto());
    let store = Arc::new(MemoryRegionStore::new());
    let orch = Arc::new(Orchestrator::new(
        orch_upstream.clone(),
        store,
        settings(),
        Duration::from_secs(1),
    ));

    let page = orch.serve(&request("kanto", 2, 0, false)).await.unwrap();
    assert_eq!(page.results.len(), 2);
    assert_eq!(page.total_count, 3);
    assert!(page.has_more);
    assert_eq!(orch_upstream.pokedex_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_background_refresh_logs_an_error() {
    let recorder = LevelRecorder::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));

    let orch = orchestrator(FakeUpstream::new(), Arc::new(MemoryRegionStore::new()));
    assert!(orch.spawn_refresh("atlantis"));
    for _ in 0..100 {
        if orch.refreshing().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert!(orch.refreshing().is_empty());
    assert!(recorder.0.lock().unwrap().contains(&Level::ERROR));
}
