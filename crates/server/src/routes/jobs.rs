// crates/server/src/routes/jobs.rs
//! API routes for background runs.
//!
//! - GET  /jobs              - All known runs
//! - GET  /jobs/{id}         - One run
//! - POST /jobs/{id}/cancel  - Cancel one run
//! - GET  /jobs/{id}/events  - SSE stream of one run's events

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use crate::error::{ApiError, ApiResult};
use crate::jobs::{JobEvent, JobId, JobSnapshot};
use crate::state::AppState;

/// How often a per-job stream re-checks status, for runs that end silently.
const STATUS_POLL: Duration = Duration::from_millis(500);

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct CancelJobResponse {
    pub status: String,
    pub job_id: JobId,
}

/// Convert a job event into an SSE frame named after the event.
pub(crate) fn sse_event(event: &JobEvent) -> Event {
    Event::default()
        .event(event.name())
        .data(event.payload().to_string())
}

/// GET /api/jobs - All known runs, oldest first.
async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<JobSnapshot>> {
    Json(state.jobs.list())
}

/// GET /api/jobs/{id}
async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> ApiResult<Json<JobSnapshot>> {
    state.jobs.get(id).map(Json).ok_or(ApiError::JobNotFound(id))
}

/// POST /api/jobs/{id}/cancel - Request cancellation. Idempotent.
async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> ApiResult<Json<CancelJobResponse>> {
    if !state.jobs.cancel(id) {
        return Err(ApiError::JobNotFound(id));
    }
    Ok(Json(CancelJobResponse {
        status: "cancelled".to_string(),
        job_id: id,
    }))
}

/// GET /api/jobs/{id}/events - SSE stream for one run.
///
/// Opens with a `job_status` snapshot and ends after the run's terminal event,
/// or once the run is terminal without one.
async fn stream_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> ApiResult<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>> {
    // Subscribe before the snapshot so nothing falls between the two.
    let mut sub = state.jobs.subscribe_job(id);
    let snapshot = state.jobs.get(id).ok_or(ApiError::JobNotFound(id))?;
    let runner = Arc::clone(&state.jobs);
    let shutdown = state.shutdown_signal();

    let stream = async_stream::stream! {
        let initial = serde_json::to_string(&snapshot).unwrap_or_default();
        yield Ok(Event::default().event("job_status").data(initial));

        tokio::pin!(shutdown);
        let mut poll = tokio::time::interval(STATUS_POLL);
        loop {
            let received = tokio::select! {
                biased;
                received = sub.recv() => received,
                _ = &mut shutdown => break,
                _ = poll.tick() => {
                    if runner.status(id).is_some_and(|s| !s.is_terminal()) {
                        continue;
                    }
                    // Terminal events are published before the status flips.
                    match sub.try_recv() {
                        Some(event) => Ok(event),
                        None => break,
                    }
                }
            };

            match received {
                Ok(event) => {
                    let terminal = event.is_terminal();
                    yield Ok(sse_event(&event));
                    if terminal {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(job_id = id, skipped, "job event stream lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Build the jobs router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/{id}", get(get_job))
        .route("/jobs/{id}/cancel", post(cancel_job))
        .route("/jobs/{id}/events", get(stream_job))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::state::RosterSource;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use clap::Parser;
    use halweb_core::{Researcher, Roster};
    use tower::ServiceExt;

    fn test_state(delay_ms: &str) -> Arc<AppState> {
        let config = Config::parse_from(["halweb", "--row-delay-ms", delay_ms]);
        let roster = Roster::from_rows(vec![
            Researcher::new("Marie Curie", "LPS"),
            Researcher::new("Pierre Curie", "LPS"),
        ]);
        AppState::with_roster(&config, RosterSource::Fixed(roster)).unwrap()
    }

    fn app(state: Arc<AppState>) -> Router {
        Router::new().nest("/api", router()).with_state(state)
    }

    async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_router_creation() {
        let _router = router();
    }

    #[tokio::test]
    async fn test_list_jobs_empty() {
        let (status, body) = send(app(test_state("0")), "GET", "/api/jobs").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn test_get_unknown_job_returns_404() {
        let (status, body) = send(app(test_state("0")), "GET", "/api/jobs/99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("\"status\":\"error\""));
    }

    #[tokio::test]
    async fn test_cancel_unknown_job_returns_404() {
        let (status, _) = send(app(test_state("0")), "POST", "/api/jobs/99/cancel").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_and_cancel_running_job() {
        let state = test_state("200");
        let rows = state.load_roster().await.unwrap().into_rows();
        let id = state.jobs.start(rows);

        let (status, body) = send(app(Arc::clone(&state)), "GET", &format!("/api/jobs/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        let snap: JobSnapshot = serde_json::from_str(&body).unwrap();
        assert_eq!(snap.job_id, id);
        assert_eq!(snap.total, 2);

        let (status, body) = send(
            app(Arc::clone(&state)),
            "POST",
            &format!("/api/jobs/{id}/cancel"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let resp: CancelJobResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(resp.status, "cancelled");
        assert_eq!(resp.job_id, id);
    }

    #[tokio::test]
    async fn test_job_events_stream_ends_after_completion() {
        let state = test_state("0");
        let rows = state.load_roster().await.unwrap().into_rows();
        let id = state.jobs.start(rows);

        // The router, and the state with it, is dropped once the response head is out.
        let (status, body) = send(app(state), "GET", &format!("/api/jobs/{id}/events")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("event: job_status"));
        // The run may finish before the stream subscribes; the snapshot covers that case.
        assert!(body.contains("task_complete") || body.contains("\"status\":\"completed\""));
    }

    #[tokio::test]
    async fn test_job_events_stream_carries_every_event_of_run() {
        let state = test_state("50");
        let rows = state.load_roster().await.unwrap().into_rows();
        let id = state.jobs.start(rows);

        let (_, body) = send(app(state), "GET", &format!("/api/jobs/{id}/events")).await;
        let progress = body.matches("event: progress_update").count();
        assert_eq!(progress, 2, "body: {body}");
        assert!(body.contains("event: task_complete"), "body: {body}");
    }

    #[tokio::test]
    async fn test_job_events_stream_ends_on_shutdown() {
        let state = test_state("1000");
        let rows = state.load_roster().await.unwrap().into_rows();
        let id = state.jobs.start(rows);

        let shutdown_state = Arc::clone(&state);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            shutdown_state.begin_shutdown();
        });

        let (status, body) = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            send(app(Arc::clone(&state)), "GET", &format!("/api/jobs/{id}/events")),
        )
        .await
        .expect("stream should end on shutdown");
        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("task_complete"));
        state.jobs.cancel(id);
    }
}
