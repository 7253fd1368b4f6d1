// crates/server/src/routes/labs.rs
//! Laboratories and researchers from the roster.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use halweb_core::Researcher;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct LabsResponse {
    /// Distinct laboratories, in roster order.
    pub labs: Vec<String>,
    pub total_researchers: usize,
}

/// GET /api/labs
async fn list_labs(State(state): State<Arc<AppState>>) -> ApiResult<Json<LabsResponse>> {
    let roster = state.load_roster().await?;
    Ok(Json(LabsResponse {
        labs: roster.labs(),
        total_researchers: roster.len(),
    }))
}

/// GET /api/labs/{labo}/researchers
async fn lab_researchers(
    State(state): State<Arc<AppState>>,
    Path(labo): Path<String>,
) -> ApiResult<Json<Vec<Researcher>>> {
    let rows = state.load_roster().await?.filter_by_lab(&labo);
    if rows.is_empty() {
        return Err(ApiError::LabNotFound(labo));
    }
    Ok(Json(rows.into_rows()))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/labs", get(list_labs))
        .route("/labs/{labo}/researchers", get(lab_researchers))
}
