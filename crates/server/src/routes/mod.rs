// crates/server/src/routes/mod.rs
//! HTTP route handlers.

pub mod health;
pub mod jobs;
pub mod labs;
pub mod processing;
pub mod results;
pub mod search;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined router.
///
/// Root:
/// - POST /start_processing[?labo=] - Start a run over the roster
/// - POST /cancel_processing - Cancel every active run
/// - GET  /update - SSE stream of every run's events
///
/// Under /api:
/// - GET  /api/health - Health check
/// - GET  /api/jobs - All runs
/// - GET  /api/jobs/{id} - One run
/// - POST /api/jobs/{id}/cancel - Cancel one run
/// - GET  /api/jobs/{id}/events - SSE stream of one run
/// - GET  /api/search?name= - HAL publications of one researcher
/// - GET  /api/labs - Laboratories in the roster
/// - GET  /api/labs/{labo}/researchers - Researchers of one laboratory
/// - GET  /api/results - Outcomes recorded by the HAL processor
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(processing::router())
        .nest("/api", health::router())
        .nest("/api", jobs::router())
        .nest("/api", search::router())
        .nest("/api", labs::router())
        .nest("/api", results::router())
        .with_state(state)
}
