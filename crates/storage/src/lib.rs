//! Region cache store: upsert-by-natural-key persistence for regional Pokédex rows.
//!
//! Two backends implement [`RegionStore`]:
//! - [`MemoryRegionStore`]: sharded concurrent map, used when PostgreSQL is not configured
//! - [`PgRegionStore`]: `region_entries` table with `ON CONFLICT` upserts
//!
//! Neither backend offers a transaction spanning multiple rows. Reads see
//! whatever rows have landed so far and are never blocked by an ingestion job.

pub mod error;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use dex_core::{RegionEntry, RegionPage};

pub use error::StoreError;
pub use memory::MemoryRegionStore;
pub use postgres::PgRegionStore;

#[async_trait]
pub trait RegionStore: Send + Sync {
    /// Insert the row for `(entry.region, entry.dex_id)`, or replace it in full.
    async fn upsert_entry(&self, entry: RegionEntry) -> Result<(), StoreError>;

    /// Number of cached rows for `region`.
    async fn count_by_region(&self, region: &str) -> Result<u64, StoreError>;

    /// Delete every row of `region`. Returns the number of rows removed.
    async fn clear_region(&self, region: &str) -> Result<u64, StoreError>;

    /// Rows of `region` ordered by ascending dex id, sliced to `[offset, offset + limit)`.
    async fn page(&self, region: &str, limit: u32, offset: u64) -> Result<RegionPage, StoreError>;

    /// Short backend label for health output.
    fn backend_name(&self) -> &'static str;
}
