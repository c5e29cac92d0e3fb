//! Core abstractions for lineage graphs
//!
//! This module defines the data model, configuration, error types and
//! logging setup shared by every engine component.

mod config;
mod error;
pub mod logging;
mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use types::*;
