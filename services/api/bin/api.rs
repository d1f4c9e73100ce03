//! Main Entrypoint for the Outlrn API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Opening the file-backed progress store.
//! 3. Initializing the tutor stream client.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use outlrn_api::{config::Config, router::create_router, state::AppState};
use outlrn_core::{
    progress::ProgressStore,
    storage::FileStorage,
    tutor_client::{HttpTutorClient, TutorClient},
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Progress Storage ---
    std::fs::create_dir_all(&config.progress_dir).with_context(|| {
        format!(
            "Failed to create progress directory {}",
            config.progress_dir.display()
        )
    })?;
    let progress = ProgressStore::new(Arc::new(FileStorage::new(config.progress_dir.clone())));
    info!(progress_dir = %config.progress_dir.display(), "Progress store ready.");

    // --- 4. Initialize Shared Services ---
    let tutor_client: Arc<dyn TutorClient> = Arc::new(HttpTutorClient::new(
        config.tutor_stream_url.clone(),
        config.tutor_api_key.clone(),
    ));

    let app_state = Arc::new(AppState {
        progress,
        tutor_client,
        config: Arc::new(config.clone()),
    });

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        tutor_stream_url = %config.tutor_stream_url,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
