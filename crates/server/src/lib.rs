//! HTTP surface of the regional Pokédex service: orchestration of cache
//! rebuilds, the Axum router, and the CLI.

pub mod api;
pub mod cli;
pub mod db;
pub mod orchestrator;
pub mod router;
pub mod state;

pub use orchestrator::{Orchestrator, PageRequest};
pub use router::build_router;
pub use state::AppState;
