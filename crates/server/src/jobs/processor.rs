// crates/server/src/jobs/processor.rs
//! Per-row work performed by a run.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use halweb_core::{HalClient, HalError, Researcher, SearchOutcome};
use thiserror::Error;

/// Failure of a single row. The runner decides whether it is fatal.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("lookup for '{name}' failed: {source}")]
    Lookup {
        name: String,
        #[source]
        source: HalError,
    },

    #[error("{0}")]
    Other(String),
}

/// Work done once per roster row.
///
/// The runner only cares whether the call succeeded.
#[async_trait]
pub trait RowProcessor: Send + Sync {
    async fn process(&self, row: &Researcher) -> Result<(), RowError>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// Sleeps for a fixed latency and succeeds.
#[derive(Debug, Clone)]
pub struct SimulatedLookup {
    latency: Duration,
}

impl SimulatedLookup {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl RowProcessor for SimulatedLookup {
    async fn process(&self, row: &Researcher) -> Result<(), RowError> {
        tracing::debug!(name = %row.full_name, "simulated lookup");
        tokio::time::sleep(self.latency).await;
        Ok(())
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

/// Outcomes recorded by [`HalLookup`], keyed by full name.
#[derive(Default)]
pub struct LookupStore {
    outcomes: RwLock<BTreeMap<String, SearchOutcome>>,
}

impl LookupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, full_name: impl Into<String>, outcome: SearchOutcome) {
        match self.outcomes.write() {
            Ok(mut map) => {
                map.insert(full_name.into(), outcome);
            }
            Err(e) => tracing::error!("RwLock poisoned writing lookup store: {e}"),
        }
    }

    pub fn all(&self) -> BTreeMap<String, SearchOutcome> {
        match self.outcomes.read() {
            Ok(map) => map.clone(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading lookup store: {e}");
                BTreeMap::new()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.outcomes.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runs the HAL search for each row and keeps the outcome.
pub struct HalLookup {
    client: HalClient,
    store: Arc<LookupStore>,
}

impl HalLookup {
    pub fn new(client: HalClient, store: Arc<LookupStore>) -> Self {
        Self { client, store }
    }
}

#[async_trait]
impl RowProcessor for HalLookup {
    async fn process(&self, row: &Researcher) -> Result<(), RowError> {
        let outcome = match self
            .client
            .search_spellings(&row.full_name, &row.initials_name)
            .await
        {
            Ok(outcome) => outcome,
            // A researcher without publications is a valid answer.
            Err(HalError::NoResults(_)) => SearchOutcome::default(),
            Err(source) => {
                return Err(RowError::Lookup {
                    name: row.full_name.clone(),
                    source,
                })
            }
        };
        self.store.insert(row.full_name.clone(), outcome);
        Ok(())
    }

    fn name(&self) -> &str {
        "hal"
    }
}
