//! API Routes
//!
//! - `/storage/*` - bucket and object operations
//! - `/storage/health` - health check

pub mod extract;
pub mod health;
pub mod storage;

use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::apply_cors;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let origins = state.config.server.cors_allowed_origins.clone();
    let router = Router::new()
        .merge(storage::router(state.clone()))
        .merge(health::router(state));

    apply_cors(router, &origins).layer(TraceLayer::new_for_http())
}
