use cadence_db::model::{NewOccurrence, Occurrence};
use cadence_db::store::Store;

use crate::error::{ServiceError, ServiceResult};

/// ## Summary
/// Persists user edits of an occurrence: its current span and cancelled
/// flag.
///
/// A fresh candidate (for example one returned by the reconciler) is
/// inserted first and receives its id. The original span of a stored
/// occurrence can only be changed by its generator.
///
/// ## Errors
/// Returns `ValidationError` when the current span runs backwards or the
/// original span differs from the stored one, and store errors otherwise.
#[tracing::instrument(skip(store, occurrence), fields(
    generator_id = %occurrence.generator_id(),
    original_start = %occurrence.original_start(),
    persisted = occurrence.is_persisted()
))]
pub fn save_occurrence<S: Store>(store: &mut S, occurrence: &mut Occurrence) -> ServiceResult<()> {
    if occurrence.end < occurrence.start {
        return Err(ServiceError::ValidationError(
            "occurrence end must not be before its start".to_string(),
        ));
    }

    let saved = store.transaction(|store| {
        let mut saved = match occurrence.id() {
            Some(id) => {
                let stored = store
                    .get_occurrence(id)?
                    .ok_or_else(|| ServiceError::NotFound(format!("occurrence {id}")))?;
                if stored.original_span() != occurrence.original_span() {
                    return Err(ServiceError::ValidationError(
                        "the original span of an occurrence is owned by its generator".to_string(),
                    ));
                }
                stored
            }
            None => store.insert_occurrence(&NewOccurrence::from(&*occurrence))?,
        };

        saved.move_to(occurrence.start, occurrence.end);
        saved.cancelled = occurrence.cancelled;
        store.update_occurrence(&saved)?;
        Ok(saved)
    })?;

    *occurrence = saved;
    Ok(())
}
