//! RPC endpoint monitor service
//!
//! Polls configured JSON-RPC endpoints and serves status, history and
//! Prometheus metrics over HTTP.

use rpcwatch::{Config, Monitor};
use std::process::ExitCode;
use tracing::Level;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging system
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> rpcwatch::Result<()> {
    let config = Config::load().await?;
    let monitor = Monitor::new(config).await?;
    monitor.run().await
}
