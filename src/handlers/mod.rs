//! HTTP endpoint handlers.
//!
//! Every GET path is served by the status page; `/favicon.ico` is a 404.

pub mod status;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub use status::status_handler;

/// Builds the router serving the status page on every path.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(status_handler))
        .route("/{*path}", get(status_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
