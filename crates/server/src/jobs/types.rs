// crates/server/src/jobs/types.rs
//! Types for the background job system.

use serde::{Deserialize, Serialize};

/// Unique identifier for a run.
pub type JobId = u64;

/// Status of a background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JobStatus {
    Pending = 0,
    Running = 1,
    Completed = 2,
    Cancelled = 3,
    Failed = 4,
}

impl JobStatus {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Pending,
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Cancelled,
            _ => Self::Failed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// What a run does when the row processor returns an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RowFailurePolicy {
    /// Log the failure, count the row as processed and failed, keep going.
    #[default]
    Skip,
    /// Stop the run and mark it failed.
    Abort,
}

/// Per-runner behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub on_row_failure: RowFailurePolicy,
    /// Publish `task_cancelled` when a run stops on cancellation.
    pub emit_cancel_event: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            on_row_failure: RowFailurePolicy::Skip,
            emit_cancel_event: true,
        }
    }
}

/// Integer completion percentage, floored and clamped to 0..=100.
pub fn percent(processed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    (processed.min(total) * 100 / total) as u8
}

/// Point-in-time view of a job, served by the status endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub status: String,
    pub processed: u64,
    pub failed: u64,
    pub total: u64,
    pub progress: u8,
    pub message: Option<String>,
    pub started_at: String,
}

/// Event pushed to observers of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    ProgressUpdate {
        job_id: JobId,
        processed: u64,
        total: u64,
        progress: u8,
    },
    TaskComplete {
        job_id: JobId,
    },
    TaskCancelled {
        job_id: JobId,
        processed: u64,
    },
    TaskFailed {
        job_id: JobId,
        processed: u64,
        message: String,
    },
}

impl JobEvent {
    /// Event name on the push channel.
    pub fn name(&self) -> &'static str {
        match self {
            JobEvent::ProgressUpdate { .. } => "progress_update",
            JobEvent::TaskComplete { .. } => "task_complete",
            JobEvent::TaskCancelled { .. } => "task_cancelled",
            JobEvent::TaskFailed { .. } => "task_failed",
        }
    }

    pub fn job_id(&self) -> JobId {
        match self {
            JobEvent::ProgressUpdate { job_id, .. }
            | JobEvent::TaskComplete { job_id }
            | JobEvent::TaskCancelled { job_id, .. }
            | JobEvent::TaskFailed { job_id, .. } => *job_id,
        }
    }

    /// Whether no further events follow for this job.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobEvent::ProgressUpdate { .. })
    }

    /// JSON body sent with the event.
    pub fn payload(&self) -> serde_json::Value {
        match self {
            JobEvent::ProgressUpdate {
                job_id,
                processed,
                total,
                progress,
            } => serde_json::json!({
                "job_id": job_id,
                "processed": processed,
                "total": total,
                "progress": progress,
            }),
            JobEvent::TaskComplete { job_id } => serde_json::json!({
                "job_id": job_id,
                "status": "finished",
            }),
            JobEvent::TaskCancelled { job_id, processed } => serde_json::json!({
                "job_id": job_id,
                "processed": processed,
                "status": "cancelled",
            }),
            JobEvent::TaskFailed {
                job_id,
                processed,
                message,
            } => serde_json::json!({
                "job_id": job_id,
                "processed": processed,
                "status": "failed",
                "message": message,
            }),
        }
    }
}
