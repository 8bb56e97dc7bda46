//! Regional Pokédex ingestion: upstream fetch client, species/variety
//! expansion, and the batched region job that feeds the cache store.

pub mod error;
pub mod expand;
pub mod fetch;
pub mod job;
pub mod upstream;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::IngestError;
pub use expand::{expand_entry, Expansion};
pub use fetch::{retry_with_backoff, FetchClient, FetchError, RetryPolicy};
pub use job::{ingest_region, IngestReport, IngestSettings};
pub use upstream::{PokeApiClient, Upstream};
