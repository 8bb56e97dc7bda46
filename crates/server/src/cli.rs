//! CLI argument parsing and subcommand dispatch.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use dex_core::{normalize_region, Config};

use crate::db;
use crate::orchestrator::Orchestrator;
use crate::router::build_router;
use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "dex-server", version, about = "Regional Pokédex cache and API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Start the HTTP server (default).
    Serve,
    /// Ingest one region synchronously and print the report.
    Ingest {
        region: String,
        /// Clear the region's cached rows first.
        #[arg(long)]
        reset: bool,
    },
}

/// Run the selected subcommand against `config`.
pub async fn dispatch(config: &Config, command: Command) -> anyhow::Result<()> {
    let store = db::init_store(&config.postgres).await;
    let orchestrator = Arc::new(Orchestrator::from_config(config, store));

    match command {
        Command::Serve => serve(config, orchestrator).await,
        Command::Ingest { region, reset } => {
            let region = normalize_region(&region)?;
            let outcome = if reset {
                orchestrator.rebuild(&region).await
            } else {
                orchestrator.ensure_region(&region).await
            };
            let report = outcome.with_context(|| format!("ingesting region {region}"))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn serve(config: &Config, orchestrator: Arc<Orchestrator>) -> anyhow::Result<()> {
    let app = build_router(Arc::new(AppState::new(orchestrator)));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://localhost:{}", config.server.port);
    axum::serve(listener, app).await?;

    Ok(())
}
