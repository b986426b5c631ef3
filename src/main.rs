//! coedit - real-time collaborative document synchronization server

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coedit::config::Args;
use coedit::directory::StaticDirectory;
use coedit::hub::{Hub, HubConfig};
use coedit::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("coedit={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  coedit - collaborative editing core");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode {
            "DEVELOPMENT"
        } else {
            "PRODUCTION"
        }
    );
    info!("History limit: {} entries/session", args.history_limit);
    info!("Max connections: {}", args.max_connections);
    info!("======================================");

    // Static display-name directory seeded from configuration
    let directory = match args.directory.as_deref() {
        Some(spec) => {
            let dir = StaticDirectory::from_spec(spec);
            info!("Display-name directory: {} entries", dir.len());
            dir
        }
        None => {
            warn!("No display-name directory configured; account ids will be shown as names");
            StaticDirectory::default()
        }
    };

    // Spawn the hub task that owns all session state
    let hub = Hub::spawn(
        Arc::new(directory),
        HubConfig {
            history_limit: args.history_limit,
        },
    );

    let state = Arc::new(AppState::new(args, hub));
    server::run(state).await?;

    Ok(())
}
