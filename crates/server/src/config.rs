// crates/server/src/config.rs
//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use halweb_core::{HalConfig, RosterColumns, DEFAULT_HAL_URL};

use crate::jobs::{RowFailurePolicy, RunOptions};

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 5000;

/// Which row processor runs behind `/start_processing`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ProcessorKind {
    /// Fixed delay per row, no network.
    #[default]
    Simulated,
    /// Real HAL search per row, outcomes kept in memory.
    Hal,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "halweb")]
#[command(about = "Look up researchers' HAL publications from a lab roster", long_about = None)]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "HALWEB_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(short, long, env = "HALWEB_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Spreadsheet listing researchers and their laboratory
    #[arg(long, env = "HALWEB_ROSTER", default_value = "date.xlsx")]
    pub roster: PathBuf,

    #[arg(long, env = "HALWEB_NAME_COLUMN", default_value = "NOM_COMPLET")]
    pub name_column: String,

    #[arg(long, env = "HALWEB_INITIALS_COLUMN", default_value = "NOM_INITIALES")]
    pub initials_column: String,

    #[arg(long, env = "HALWEB_LAB_COLUMN", default_value = "LABO")]
    pub lab_column: String,

    /// HAL search endpoint
    #[arg(long, env = "HAL_API_URL", default_value = DEFAULT_HAL_URL)]
    pub hal_url: String,

    #[arg(long, env = "HALWEB_HAL_TIMEOUT_SECS", default_value_t = 30)]
    pub hal_timeout_secs: u64,

    #[arg(long, env = "HALWEB_PROCESSOR", value_enum, default_value_t = ProcessorKind::Simulated)]
    pub processor: ProcessorKind,

    /// Per-row delay of the simulated processor
    #[arg(long, env = "HALWEB_ROW_DELAY_MS", default_value_t = 500)]
    pub row_delay_ms: u64,

    #[arg(long, env = "HALWEB_ROW_FAILURE", value_enum, default_value_t = RowFailurePolicy::Skip)]
    pub on_row_failure: RowFailurePolicy,

    /// Publish `task_cancelled` when a run is cancelled
    #[arg(long, env = "HALWEB_EMIT_CANCEL_EVENT", default_value_t = true, action = ArgAction::Set)]
    pub emit_cancel_event: bool,
}

impl Config {
    pub fn addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn columns(&self) -> RosterColumns {
        RosterColumns {
            full_name: self.name_column.clone(),
            initials: self.initials_column.clone(),
            lab: self.lab_column.clone(),
        }
    }

    pub fn hal(&self) -> HalConfig {
        HalConfig {
            base_url: self.hal_url.clone(),
            timeout: Duration::from_secs(self.hal_timeout_secs),
            ..HalConfig::default()
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            on_row_failure: self.on_row_failure,
            emit_cancel_event: self.emit_cancel_event,
        }
    }

    pub fn row_delay(&self) -> Duration {
        Duration::from_millis(self.row_delay_ms)
    }
}
