// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use halweb_core::{HalError, RosterError};
use serde::Serialize;
use thiserror::Error;

use crate::jobs::JobId;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    /// Always `"error"`.
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::new(message)
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("Laboratory not found: {0}")]
    LabNotFound(String),

    #[error("Roster error: {0}")]
    Roster(#[from] RosterError),

    #[error("HAL error: {0}")]
    Hal(#[from] HalError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::JobNotFound(id) => {
                tracing::warn!(job_id = id, "Job not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Job not found", format!("Job ID: {id}")),
                )
            }
            ApiError::LabNotFound(labo) => {
                tracing::warn!(labo = %labo, "Laboratory not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Laboratory not found", format!("LABO: {labo}")),
                )
            }
            ApiError::Roster(roster_err) => {
                match roster_err {
                    RosterError::NotFound { path } | RosterError::Empty { path } => {
                        tracing::error!(path = %path.display(), "Roster unavailable")
                    }
                    RosterError::Workbook { path, message } => {
                        tracing::error!(path = %path.display(), message = %message, "Unreadable roster")
                    }
                    RosterError::MissingColumn { column } => {
                        tracing::error!(column = %column, "Roster column missing")
                    }
                }
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new(roster_err.to_string()),
                )
            }
            ApiError::Hal(hal_err) => {
                let status = match hal_err {
                    HalError::InvalidName(name) => {
                        tracing::warn!(name = %name, "Invalid researcher name");
                        StatusCode::BAD_REQUEST
                    }
                    HalError::NoResults(name) => {
                        tracing::info!(name = %name, "No HAL publications");
                        StatusCode::NOT_FOUND
                    }
                    upstream => {
                        tracing::error!(error = %upstream, "HAL request failed");
                        StatusCode::BAD_GATEWAY
                    }
                };
                let response = if hal_err.is_upstream() {
                    ErrorResponse::with_details("HAL request failed", hal_err.to_string())
                } else {
                    ErrorResponse::new(hal_err.to_string())
                };
                (status, response)
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (StatusCode::BAD_REQUEST, ErrorResponse::new(msg.clone()))
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    /// Helper to extract status code and body from a response
    async fn extract_response(response: Response) -> (StatusCode, ErrorResponse) {
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error_response: ErrorResponse = serde_json::from_slice(&body).unwrap();
        (status, error_response)
    }

    #[tokio::test]
    async fn test_job_not_found_returns_404() {
        let (status, body) = extract_response(ApiError::JobNotFound(7).into_response()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.status, "error");
        assert_eq!(body.message, "Job not found");
        assert!(body.details.unwrap().contains('7'));
    }

    #[tokio::test]
    async fn test_missing_column_returns_400() {
        let error: ApiError = RosterError::missing_column("LABO").into();
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.message.contains("LABO"));
    }

    #[tokio::test]
    async fn test_missing_roster_returns_400() {
        let error: ApiError = RosterError::not_found("date.xlsx").into();
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.message.contains("date.xlsx"));
    }

    #[tokio::test]
    async fn test_hal_errors_map_to_status() {
        let (status, _) =
            extract_response(ApiError::Hal(HalError::InvalidName("Cher".into())).into_response())
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = extract_response(
            ApiError::Hal(HalError::NoResults("Marie Curie".into())).into_response(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.message.contains("Marie Curie"));

        let (status, body) = extract_response(
            ApiError::Hal(HalError::Status {
                status: 503,
                query: "docid:\"1\"".into(),
            })
            .into_response(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.message, "HAL request failed");
        assert!(body.details.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_internal_error_returns_500() {
        let error = ApiError::Internal("Something went wrong".to_string());
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "Internal server error");
        // Internal errors should NOT expose details to clients
        assert!(body.details.is_none());
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse::new("Test error");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"error\""));
        assert!(json.contains("\"message\":\"Test error\""));
        assert!(!json.contains("details"));

        let response = ErrorResponse::with_details("Test error", "More info");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"details\":\"More info\""));
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::JobNotFound(3);
        assert_eq!(err.to_string(), "Job not found: 3");

        let err = ApiError::Internal("oops".to_string());
        assert_eq!(err.to_string(), "Internal server error: oops");
    }
}
