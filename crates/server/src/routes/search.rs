// crates/server/src/routes/search.rs
//! Interactive HAL lookup for a single researcher.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use halweb_core::SearchOutcome;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub name: String,
}

/// GET /api/search?name= - Publications of one researcher, merged over both name spellings.
async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchOutcome>> {
    let name = params.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest(
            "Query parameter 'name' is required".to_string(),
        ));
    }

    let outcome = state.hal.search_researcher(name).await?;
    Ok(Json(outcome))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/search", get(search))
}
