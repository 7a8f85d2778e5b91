//! Exoscope Web Server
//!
//! Run with: cargo run -p exoscope-web

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use exoscope_web::config::Config;
use exoscope_web::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Exoscope Web Server...");
    info!("Catalog: {:?} (dataset '{}')", config.catalog.path, config.catalog.dataset);

    let addr = config.server.bind;
    let state = AppState::new(config).context("building application state")?;
    let app = exoscope_web::router::build_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
