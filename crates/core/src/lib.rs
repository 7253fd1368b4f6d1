// crates/core/src/lib.rs
//! Domain layer for the HAL researcher lookup tool.
//!
//! - [`roster`] loads the spreadsheet of researchers and laboratories
//! - [`hal`] queries the HAL search API and aggregates publication stats

pub mod error;
pub mod hal;
pub mod roster;

pub use error::*;
pub use hal::{
    aggregate, initials_variant, DocumentDetails, HalClient, HalConfig, Publication, SearchOutcome,
    SearchStats, DEFAULT_HAL_URL,
};
pub use roster::{Researcher, Roster, RosterColumns};
