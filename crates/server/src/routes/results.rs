// crates/server/src/routes/results.rs
//! Outcomes recorded by the HAL row processor.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use halweb_core::SearchOutcome;

use crate::state::AppState;

/// GET /api/results - Outcomes keyed by researcher full name.
///
/// Empty unless the server runs with the HAL processor.
async fn list_results(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, SearchOutcome>> {
    Json(state.results.all())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/results", get(list_results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use clap::Parser;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_results_reflect_store() {
        let state = AppState::new(&Config::parse_from(["halweb"])).unwrap();
        state.results.insert("Marie Curie", SearchOutcome::default());

        let app = Router::new().nest("/api", router()).with_state(state);
        let response = app
            .oneshot(Request::builder().uri("/api/results").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let results: BTreeMap<String, SearchOutcome> = serde_json::from_slice(&body).unwrap();
        assert!(results.contains_key("Marie Curie"));
    }
}
