// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading the researcher roster
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Roster file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Cannot read workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },

    #[error("Roster has no worksheet or no header row: {path}")]
    Empty { path: PathBuf },

    #[error("Column '{column}' is missing from the roster")]
    MissingColumn { column: String },
}

impl RosterError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }
}

/// Errors that can occur when querying the HAL search API
#[derive(Debug, Error)]
pub enum HalError {
    #[error("Invalid researcher name '{0}': expected a first name and a last name")]
    InvalidName(String),

    #[error("No publications found for '{0}'")]
    NoResults(String),

    #[error("HAL request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HAL returned HTTP {status} for query {query}")]
    Status { status: u16, query: String },

    #[error("Malformed HAL response: {0}")]
    Malformed(String),
}

impl HalError {
    /// Whether the failure came from the remote service rather than the input.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            HalError::Request(_) | HalError::Status { .. } | HalError::Malformed(_)
        )
    }
}
