//! Persistent records for events, generators and occurrences, and the
//! storage contract the reconciliation services run against.

pub mod error;
pub mod model;
pub mod store;
