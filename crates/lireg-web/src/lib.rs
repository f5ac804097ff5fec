//! HTTP surface for the register enrichment pipeline.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;

pub mod handlers;
pub mod models;
pub mod state;

pub use state::AppState;

/// Build the application router: `GET /result` and `GET /health`.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/result", get(handlers::result::result))
        .route("/health", get(handlers::health::health))
        .with_state(state)
}
