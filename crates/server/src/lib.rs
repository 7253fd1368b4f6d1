// crates/server/src/lib.rs
//! halweb server library.
//!
//! Axum HTTP server that starts cancellable background runs over a lab roster,
//! streams their progress over SSE and answers interactive HAL searches.

pub mod config;
pub mod error;
pub mod jobs;
pub mod routes;
pub mod state;

pub use config::{Config, ProcessorKind};
pub use error::*;
pub use routes::api_routes;
pub use state::{AppState, RosterSource};

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - Root processing routes and the `/api` routes
/// - CORS (allows any origin)
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api_routes(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================
