//! Shared building blocks for the cadence workspace: identifiers, calendar
//! exclusions, configuration and logging setup.

pub mod calendar;
pub mod config;
pub mod error;
pub mod logging;
pub mod types;
