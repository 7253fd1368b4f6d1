// crates/server/src/state.rs
//! Application state for the Axum server.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use halweb_core::{HalClient, HalError, Roster, RosterColumns, RosterError};
use tokio::sync::watch;

use crate::config::{Config, ProcessorKind};
use crate::error::{ApiError, ApiResult};
use crate::jobs::{HalLookup, JobRunner, LookupStore, RowProcessor, SimulatedLookup};

/// Where researcher rows come from.
#[derive(Debug, Clone)]
pub enum RosterSource {
    /// Spreadsheet re-read on every request, so edits are picked up without a restart.
    File { path: PathBuf, columns: RosterColumns },
    /// Rows held in memory.
    Fixed(Roster),
}

impl RosterSource {
    pub fn load(&self) -> Result<Roster, RosterError> {
        match self {
            RosterSource::File { path, columns } => Roster::load(path, columns),
            RosterSource::Fixed(roster) => Ok(roster.clone()),
        }
    }
}

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    pub roster: RosterSource,
    /// Owner of every background run.
    pub jobs: Arc<JobRunner>,
    /// Client for interactive searches.
    pub hal: HalClient,
    /// Outcomes written by the HAL row processor.
    pub results: Arc<LookupStore>,
    /// Flips to `true` when the server is shutting down; SSE streams end on it.
    pub shutdown: watch::Sender<bool>,
}

impl AppState {
    /// Build state from configuration, choosing the row processor it names.
    pub fn new(config: &Config) -> Result<Arc<Self>, HalError> {
        let source = RosterSource::File {
            path: config.roster.clone(),
            columns: config.columns(),
        };
        Self::with_roster(config, source)
    }

    pub fn with_roster(
        config: &Config,
        roster: RosterSource,
    ) -> Result<Arc<Self>, HalError> {
        let hal = HalClient::new(config.hal())?;
        let results = Arc::new(LookupStore::new());

        let processor: Arc<dyn RowProcessor> = match config.processor {
            ProcessorKind::Simulated => Arc::new(SimulatedLookup::new(config.row_delay())),
            ProcessorKind::Hal => Arc::new(HalLookup::new(hal.clone(), Arc::clone(&results))),
        };
        let jobs = Arc::new(JobRunner::new(processor, config.run_options()));
        let (shutdown, _) = watch::channel(false);

        Ok(Arc::new(Self {
            start_time: Instant::now(),
            roster,
            jobs,
            hal,
            results,
            shutdown,
        }))
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Read the roster on the blocking pool; spreadsheet parsing is synchronous.
    pub async fn load_roster(&self) -> ApiResult<Roster> {
        let source = self.roster.clone();
        let roster = tokio::task::spawn_blocking(move || source.load())
            .await
            .map_err(|e| ApiError::Internal(format!("roster loader did not finish: {e}")))??;
        Ok(roster)
    }

    /// Tell open SSE streams to finish.
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Resolves once [`begin_shutdown`](Self::begin_shutdown) has been called.
    ///
    /// Never resolves if the state is dropped without a shutdown, so streams
    /// that outlive their router keep running.
    pub fn shutdown_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.shutdown.subscribe();
        async move {
            let signalled = rx.wait_for(|stopping| *stopping).await.is_ok();
            if !signalled {
                std::future::pending::<()>().await;
            }
        }
    }
}
