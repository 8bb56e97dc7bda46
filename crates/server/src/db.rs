use std::sync::Arc;

use tracing::{info, warn};

use dex_core::config::PostgresConfig;
use dex_storage::{MemoryRegionStore, PgRegionStore, RegionStore};

/// Pick the cache backend: PostgreSQL when configured and reachable,
/// otherwise the in-memory store.
pub async fn init_store(config: &PostgresConfig) -> Arc<dyn RegionStore> {
    if !config.is_configured() {
        warn!("PG_USERNAME not configured, region cache is in-memory only");
        return Arc::new(MemoryRegionStore::new());
    }

    match PgRegionStore::connect(config).await {
        Ok(store) => {
            info!("region cache backed by PostgreSQL");
            Arc::new(store)
        }
        Err(e) => {
            warn!("Failed to initialise PostgreSQL: {}; falling back to in-memory cache", e);
            Arc::new(MemoryRegionStore::new())
        }
    }
}
