use dex_storage::StoreError;

use crate::fetch::FetchError;

/// Failure of a region-wide ingestion job. Per-entry failures never surface
/// here; only the listing fetch can fail a whole job.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
