// crates/server/src/jobs/runner.rs
//! Central job runner that owns every background run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use halweb_core::Researcher;
use tokio::sync::broadcast;

use super::hub::{JobSubscription, ProgressHub};
use super::processor::RowProcessor;
use super::state::JobState;
use super::types::{JobEvent, JobId, JobSnapshot, JobStatus, RowFailurePolicy, RunOptions};

/// Central job runner.
///
/// `start` spawns one tokio task per run and returns its id right away.
/// Observers follow runs through the shared [`ProgressHub`].
pub struct JobRunner {
    next_id: AtomicU64,
    jobs: RwLock<HashMap<JobId, Arc<JobState>>>,
    hub: ProgressHub,
    processor: Arc<dyn RowProcessor>,
    options: RunOptions,
}

impl JobRunner {
    pub fn new(processor: Arc<dyn RowProcessor>, options: RunOptions) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            jobs: RwLock::new(HashMap::new()),
            hub: ProgressHub::new(),
            processor,
            options,
        }
    }

    pub fn processor_name(&self) -> &str {
        self.processor.name()
    }

    /// Register a run over `rows` and spawn it. Must be called inside a tokio runtime.
    pub fn start(&self, rows: Vec<Researcher>) -> JobId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(JobState::new(id, rows.len() as u64));

        match self.jobs.write() {
            Ok(mut jobs) => {
                jobs.insert(id, Arc::clone(&state));
            }
            Err(e) => tracing::error!("RwLock poisoned writing jobs map: {e}"),
        }

        tracing::info!(
            job_id = id,
            total = state.total(),
            processor = self.processor.name(),
            "starting run"
        );

        tokio::spawn(drive(
            state,
            rows,
            Arc::clone(&self.processor),
            self.hub.clone(),
            self.options,
        ));

        id
    }

    /// Every event of every run.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.hub.subscribe()
    }

    pub fn subscribe_job(&self, id: JobId) -> JobSubscription {
        self.hub.subscribe_job(id)
    }

    pub fn get(&self, id: JobId) -> Option<JobSnapshot> {
        self.state(id).map(|s| s.snapshot())
    }

    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.state(id).map(|s| s.status())
    }

    /// All known runs, oldest first.
    pub fn list(&self) -> Vec<JobSnapshot> {
        let mut all: Vec<JobSnapshot> = match self.jobs.read() {
            Ok(jobs) => jobs.values().map(|s| s.snapshot()).collect(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs: {e}");
                Vec::new()
            }
        };
        all.sort_by_key(|s| s.job_id);
        all
    }

    /// Runs that have not reached a terminal status.
    pub fn active(&self) -> Vec<JobSnapshot> {
        self.active_states()
            .iter()
            .map(|s| s.snapshot())
            .collect()
    }

    /// Request cancellation of one run. Returns `false` if the id is unknown.
    pub fn cancel(&self, id: JobId) -> bool {
        match self.state(id) {
            Some(state) => {
                state.cancel_token().request_cancel();
                tracing::info!(job_id = id, "cancel requested");
                true
            }
            None => false,
        }
    }

    /// Request cancellation of every active run. Returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let active = self.active_states();
        for state in &active {
            state.cancel_token().request_cancel();
        }
        if !active.is_empty() {
            tracing::info!(count = active.len(), "cancel requested for all runs");
        }
        active.len()
    }

    fn state(&self, id: JobId) -> Option<Arc<JobState>> {
        match self.jobs.read() {
            Ok(jobs) => jobs.get(&id).cloned(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs map: {e}");
                None
            }
        }
    }

    fn active_states(&self) -> Vec<Arc<JobState>> {
        match self.jobs.read() {
            Ok(jobs) => jobs
                .values()
                .filter(|s| !s.status().is_terminal())
                .cloned()
                .collect(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs: {e}");
                Vec::new()
            }
        }
    }
}

/// Body of one run.
///
/// The token is checked before each row. A row already in flight when the
/// cancel lands still finishes and reports progress, and a run whose last row
/// was in flight completes normally.
///
/// Terminal events are published before the terminal status is stored, so a
/// per-job stream that sees the status has the event buffered already.
async fn drive(
    state: Arc<JobState>,
    rows: Vec<Researcher>,
    processor: Arc<dyn RowProcessor>,
    hub: ProgressHub,
    options: RunOptions,
) -> JobStatus {
    let job_id = state.id();
    state.set_running();

    for row in &rows {
        if state.cancel_token().is_cancelled() {
            return stop_cancelled(&state, &hub, options);
        }

        if let Err(e) = processor.process(row).await {
            match options.on_row_failure {
                RowFailurePolicy::Skip => {
                    tracing::warn!(job_id, name = %row.full_name, error = %e, "row failed, skipping");
                    state.record_failure();
                }
                RowFailurePolicy::Abort => {
                    tracing::error!(job_id, name = %row.full_name, error = %e, "row failed, aborting run");
                    state.record_failure();
                    let message = e.to_string();
                    hub.publish(JobEvent::TaskFailed {
                        job_id,
                        processed: state.processed(),
                        message: message.clone(),
                    });
                    state.fail(message);
                    return JobStatus::Failed;
                }
            }
        }

        let processed = state.advance();
        hub.publish(JobEvent::ProgressUpdate {
            job_id,
            processed,
            total: state.total(),
            progress: state.progress(),
        });
    }

    hub.publish(JobEvent::TaskComplete { job_id });
    state.complete();
    tracing::info!(job_id, processed = state.processed(), "run complete");
    JobStatus::Completed
}

fn stop_cancelled(state: &JobState, hub: &ProgressHub, options: RunOptions) -> JobStatus {
    if options.emit_cancel_event {
        hub.publish(JobEvent::TaskCancelled {
            job_id: state.id(),
            processed: state.processed(),
        });
    }
    state.mark_cancelled();
    tracing::info!(
        job_id = state.id(),
        processed = state.processed(),
        total = state.total(),
        "run cancelled"
    );
    JobStatus::Cancelled
}
