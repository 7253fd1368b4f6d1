// crates/server/src/routes/processing.rs
//! Root-level processing endpoints used by the browser page.
//!
//! - POST /start_processing[?labo=] - Start a run over the roster
//! - POST /cancel_processing        - Cancel every active run
//! - GET  /update                   - SSE stream of every run's events

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;

use crate::error::{ApiError, ApiResult};
use crate::jobs::JobId;
use crate::routes::jobs::sse_event;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StartParams {
    /// Restrict the run to one laboratory.
    pub labo: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct StartResponse {
    pub status: String,
    pub job_id: JobId,
    pub total: usize,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct CancelResponse {
    pub status: String,
    /// Runs that were still active when the request arrived.
    pub cancelled: usize,
}

/// POST /start_processing - Load the roster and start a run over its rows.
///
/// Fails synchronously, before any run exists, when the roster cannot be read
/// or selects no rows.
async fn start_processing(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StartParams>,
) -> ApiResult<Json<StartResponse>> {
    let roster = state.load_roster().await?;
    let labo = params
        .labo
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty());

    let roster = match labo {
        Some(labo) => roster.filter_by_lab(labo),
        None => roster,
    };
    if roster.is_empty() {
        return Err(ApiError::BadRequest(match labo {
            Some(labo) => format!("No researchers found for laboratory '{labo}'"),
            None => "The roster contains no researchers".to_string(),
        }));
    }

    let total = roster.len();
    let job_id = state.jobs.start(roster.into_rows());

    Ok(Json(StartResponse {
        status: "started".to_string(),
        job_id,
        total,
    }))
}

/// POST /cancel_processing - Cancel every active run. Always succeeds.
async fn cancel_processing(State(state): State<Arc<AppState>>) -> Json<CancelResponse> {
    let cancelled = state.jobs.cancel_all();
    Json(CancelResponse {
        status: "cancelled".to_string(),
        cancelled,
    })
}

/// GET /update - SSE stream of every run's events.
///
/// Runs until the client disconnects or the server shuts down.
async fn update_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.jobs.subscribe();
    let shutdown = state.shutdown_signal();

    let stream = async_stream::stream! {
        tokio::pin!(shutdown);
        loop {
            let received = tokio::select! {
                received = rx.recv() => received,
                _ = &mut shutdown => break,
            };

            match received {
                Ok(event) => yield Ok(sse_event(&event)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "update stream lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Build the root-level processing router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/start_processing", post(start_processing))
        .route("/cancel_processing", post(cancel_processing))
        .route("/update", get(update_stream))
}
