// crates/server/src/jobs/mod.rs
//! Background runs over roster rows.
//!
//! Provides:
//! - `JobRunner` owns and spawns runs
//! - `JobState` holds atomic progress for one run
//! - `CancelToken` is the per-run stop flag
//! - `ProgressHub` fans events out to SSE observers
//! - `RowProcessor` is the work done for each row

pub mod cancel;
pub mod hub;
pub mod processor;
pub mod runner;
pub mod state;
pub mod types;

pub use cancel::CancelToken;
pub use hub::{JobSubscription, ProgressHub};
pub use processor::{HalLookup, LookupStore, RowError, RowProcessor, SimulatedLookup};
pub use runner::JobRunner;
pub use state::JobState;
pub use types::{JobEvent, JobId, JobSnapshot, JobStatus, RowFailurePolicy, RunOptions};
