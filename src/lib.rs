// melopref - Music preference survey with procedurally varied stimuli
// Module declarations

pub mod audio;
pub mod cli;
pub mod commands;
pub mod compose;
pub mod config;
pub mod dataset;
pub mod render;
pub mod session;
pub mod state;
pub mod trial;
pub mod web;

use tracing_subscriber::EnvFilter;

/// Install the log backend; `RUST_LOG` overrides the default `info` level
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub async fn run(cli: cli::Cli) -> Result<(), commands::CommandError> {
    log::info!("Starting melopref v{}", env!("CARGO_PKG_VERSION"));
    commands::execute(cli).await
}
