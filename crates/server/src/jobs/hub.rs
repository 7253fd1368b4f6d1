// crates/server/src/jobs/hub.rs
//! Fan-out of job events to SSE observers.

use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};

use super::types::{JobEvent, JobId};

const HUB_CAPACITY: usize = 256;

/// Broadcast channel shared by every run.
///
/// Publishing never blocks the worker. A receiver that falls behind gets
/// `RecvError::Lagged` and skips ahead.
#[derive(Clone)]
pub struct ProgressHub {
    tx: broadcast::Sender<JobEvent>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::with_capacity(HUB_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Send an event to whoever is listening right now.
    pub fn publish(&self, event: JobEvent) {
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }

    /// Every event of every job.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.tx.subscribe()
    }

    /// Only the events of one job.
    pub fn subscribe_job(&self, job_id: JobId) -> JobSubscription {
        JobSubscription {
            job_id,
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver filtered to a single job id.
pub struct JobSubscription {
    job_id: JobId,
    rx: broadcast::Receiver<JobEvent>,
}

impl JobSubscription {
    /// Next event for this job. Errors mirror `broadcast::Receiver::recv`.
    pub async fn recv(&mut self) -> Result<JobEvent, RecvError> {
        loop {
            let event = self.rx.recv().await?;
            if event.job_id() == self.job_id {
                return Ok(event);
            }
        }
    }

    /// Next already-buffered event for this job, skipping over any lag.
    pub fn try_recv(&mut self) -> Option<JobEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.job_id() == self.job_id => return Some(event),
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}
