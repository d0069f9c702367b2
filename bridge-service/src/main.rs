//! SQLite bridge service
//!
//! Exposes a fixed set of SQLite database files over HTTP, read-only:
//! - capability document and liveness check
//! - per-database table, schema and file metadata report
//! - table listing and description
//! - SELECT execution with an automatic row cap

mod cli;
mod handlers;
mod registry;
mod routes;
mod server;
mod service;
mod state;
mod values;

use anyhow::Context;
use clap::Parser;
use common::config::load_dotenv;
use common::logging::init_tracing;
use tracing::info;

use cli::Cli;
use server::{spawn_signal_listener, BridgeServer, ShutdownHandle};
use state::AppState;

const SERVICE_NAME: &str = "sqlite-bridge";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    let config = Cli::parse().into_config(SERVICE_NAME);
    init_tracing(config.log_format)?;

    let address = config.bind_address();
    let databases = config.databases.clone();
    let state = AppState::new(config);

    let shutdown = ShutdownHandle::new();
    let server = BridgeServer::bind(state, shutdown.clone())
        .await
        .with_context(|| format!("failed to bind {}", address))?;

    info!(service = SERVICE_NAME, address = %address, "Starting SQLite bridge on http://{}", address);
    for db in &databases {
        info!(path = %db, "Serving database");
    }

    let server_task = server.spawn();
    spawn_signal_listener(shutdown);

    server_task.await??;
    Ok(())
}
