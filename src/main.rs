use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trivia::{
    config::GameConfig,
    delivery::{LogDelivery, MessageDelivery},
    state::{AppState, StateExport},
    workers,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trivia=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting trivia round engine...");

    let config = GameConfig::from_env();
    let snapshot_path = config.snapshot_path.clone();
    let state = Arc::new(AppState::with_config(config));

    if let Some(ref path) = snapshot_path {
        if path.exists() {
            match StateExport::load(path).await {
                Ok(export) => {
                    if let Err(e) = state.import_state(export).await {
                        tracing::error!("Failed to import snapshot {}: {}", path.display(), e);
                    }
                }
                Err(e) => tracing::error!("Failed to read snapshot {}: {}", path.display(), e),
            }
        }
    }

    // No chat backend is wired into this binary; views go to the log
    let delivery: Arc<dyn MessageDelivery> = Arc::new(LogDelivery::new());
    let publisher = workers::spawn_publisher(state.clone(), delivery);
    let reaper = workers::spawn_round_reaper(state.clone());

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
    reaper.abort();
    publisher.abort();

    if let Some(ref path) = snapshot_path {
        match state.export_state().await.save(path).await {
            Ok(()) => tracing::info!("Saved snapshot to {}", path.display()),
            Err(e) => tracing::error!("Failed to save snapshot {}: {}", path.display(), e),
        }
    }
}
