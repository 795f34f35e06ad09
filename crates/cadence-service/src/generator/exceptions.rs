//! Exception instants. Every change re-saves the generator with generation
//! suppressed; occurrences already stored are kept.

use cadence_core::config::RecurrenceConfig;
use cadence_db::model::Generator;
use cadence_db::store::Store;
use chrono::{DateTime, Utc};

use super::save::{SaveOptions, save_generator};
use crate::error::ServiceResult;

const NO_GENERATION: SaveOptions = SaveOptions { generate: false };

/// ## Summary
/// Marks `instant` as an exception. `generator` is only updated once the
/// save succeeded.
///
/// ## Errors
/// Returns an error if saving the generator fails.
pub fn add_exception<S: Store>(
    store: &mut S,
    config: &RecurrenceConfig,
    generator: &mut Generator,
    instant: DateTime<Utc>,
) -> ServiceResult<()> {
    let mut updated = generator.clone();
    updated.exceptions.insert(instant);
    save_generator(store, config, &updated, NO_GENERATION)?;
    *generator = updated;
    Ok(())
}

/// ## Summary
/// Removes `instant` from the exceptions and reports whether it was there.
///
/// ## Errors
/// Returns an error if saving the generator fails.
pub fn remove_exception<S: Store>(
    store: &mut S,
    config: &RecurrenceConfig,
    generator: &mut Generator,
    instant: DateTime<Utc>,
) -> ServiceResult<bool> {
    let mut updated = generator.clone();
    let removed = updated.exceptions.remove(&instant);
    save_generator(store, config, &updated, NO_GENERATION)?;
    *generator = updated;
    Ok(removed)
}

/// ## Summary
/// Clears all exceptions.
///
/// ## Errors
/// Returns an error if saving the generator fails.
pub fn reset_exceptions<S: Store>(
    store: &mut S,
    config: &RecurrenceConfig,
    generator: &mut Generator,
) -> ServiceResult<()> {
    let mut updated = generator.clone();
    updated.exceptions.clear();
    save_generator(store, config, &updated, NO_GENERATION)?;
    *generator = updated;
    Ok(())
}
