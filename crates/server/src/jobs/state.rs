// crates/server/src/jobs/state.rs
//! Atomic state tracking for a single run.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::cancel::CancelToken;
use super::types::{percent, JobId, JobSnapshot, JobStatus};

/// Atomic state for a single run.
///
/// Counters are lock-free so the worker never waits on a status reader.
/// Only `message` sits behind a lock.
pub struct JobState {
    id: JobId,
    total: u64,
    status: AtomicU8,
    processed: AtomicU64,
    failed: AtomicU64,
    message: RwLock<Option<String>>,
    started_at: DateTime<Utc>,
    cancel: CancelToken,
}

impl JobState {
    pub fn new(id: JobId, total: u64) -> Self {
        Self {
            id,
            total,
            status: AtomicU8::new(JobStatus::Pending as u8),
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            message: RwLock::new(None),
            started_at: Utc::now(),
            cancel: CancelToken::new(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Token observed by the worker for this run.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn status(&self) -> JobStatus {
        JobStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn set_running(&self) {
        self.status
            .store(JobStatus::Running as u8, Ordering::Release);
    }

    /// Count one finished row. Returns the new processed count, never above `total`.
    pub fn advance(&self) -> u64 {
        let prev = self
            .processed
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.total).then_some(n + 1)
            })
            .unwrap_or(self.total);
        (prev + 1).min(self.total)
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Acquire)
    }

    pub fn progress(&self) -> u8 {
        percent(self.processed(), self.total)
    }

    pub fn complete(&self) {
        self.status
            .store(JobStatus::Completed as u8, Ordering::Release);
    }

    pub fn mark_cancelled(&self) {
        self.status
            .store(JobStatus::Cancelled as u8, Ordering::Release);
    }

    pub fn fail(&self, error: impl Into<String>) {
        match self.message.write() {
            Ok(mut guard) => *guard = Some(error.into()),
            Err(e) => tracing::error!("RwLock poisoned writing error message: {e}"),
        }
        self.status
            .store(JobStatus::Failed as u8, Ordering::Release);
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.id,
            status: self.status().as_str().to_string(),
            processed: self.processed(),
            failed: self.failed.load(Ordering::Relaxed),
            total: self.total,
            progress: self.progress(),
            message: match self.message.read() {
                Ok(g) => g.clone(),
                Err(e) => {
                    tracing::error!("RwLock poisoned reading message: {e}");
                    None
                }
            },
            started_at: self.started_at.to_rfc3339(),
        }
    }
}
