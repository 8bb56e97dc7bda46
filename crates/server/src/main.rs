use clap::Parser;
use tracing_subscriber::EnvFilter;

use dex_server::cli::{self, Cli, Command};

fn load_config() -> dex_core::Config {
    dex_core::config::load_dotenv();
    dex_core::Config::from_env()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let args = Cli::parse();
    let config = load_config();
    config.log_summary();

    cli::dispatch(&config, args.command.unwrap_or(Command::Serve)).await
}
