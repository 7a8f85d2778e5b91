//! Axum router — maps all URL paths to handlers.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::TraceLayer,
};

use crate::handlers::{
    health::health,
    pages::{explore, index},
    predict::predict,
    upload::upload,
};
use crate::state::SharedState;

/// Build and return the full Axum router.
pub fn build_router(state: SharedState) -> Router {
    let static_dir = state.config.server.static_dir.clone();
    let upload_limit = state.config.server.max_upload_bytes;

    Router::new()
        // Pages
        .route("/",        get(index))
        .route("/explore", get(explore))
        .route("/predict", post(predict))
        .route("/upload",  post(upload))
        .route("/health",  get(health))

        // Static files (catalog JSON lives under data/)
        .nest_service("/static", ServeDir::new(static_dir))

        // Middleware
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(upload_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
