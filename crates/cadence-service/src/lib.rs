//! Generator reconciliation, occurrence generation and windowed occurrence
//! queries on top of a [`cadence_db::store::Store`].

pub mod error;
pub mod event;
pub mod generator;
pub mod occurrence;
pub mod reconcile;
