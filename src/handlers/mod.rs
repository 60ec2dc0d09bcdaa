mod contact;
mod health;
mod metrics;

use axum::{Router, routing::{get, post}};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use crate::state::AppState;

pub use contact::{client_key, contact_handler, preflight_handler};
pub use health::health_handler;
pub use metrics::metrics_handler;

// creating the router with routes
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/contact", post(contact_handler).options(preflight_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
