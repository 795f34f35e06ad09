use cadence_core::config::RecurrenceConfig;
use cadence_db::model::{Generator, NewOccurrence, Occurrence, Span};
use cadence_db::store::{OccurrenceScope, Store};
use chrono::{DateTime, Utc};

use crate::error::ServiceResult;

/// ## Summary
/// Materializes every occurrence the generator should own and does not have
/// yet. Running it again creates nothing new.
///
/// A rule-less generator yields its single `event_start`–`event_end` span.
///
/// ## Errors
/// Returns an error if the rule cannot be expanded or a store call fails.
#[tracing::instrument(skip(store, config, generator), fields(
    generator_id = %generator.id,
    event_id = %generator.event_id,
    has_rule = generator.rule.is_some()
))]
pub fn generate<S: Store>(
    store: &mut S,
    config: &RecurrenceConfig,
    generator: &Generator,
) -> ServiceResult<usize> {
    let duration = generator.duration();
    let dates = generator.generate_dates(config)?;

    store.transaction(|store| {
        let mut created = 0;
        for date in dates {
            if create_occurrence(store, config, generator, date, date + duration, true)?.is_some() {
                created += 1;
            }
        }
        tracing::debug!(created, "Generated occurrences");
        Ok(created)
    })
}

/// ## Summary
/// Stores one occurrence spanning `start`–`end` unless it would duplicate an
/// existing one.
///
/// With `allow_clashing_occurrences` only this generator's occurrences count
/// as duplicates; otherwise any occurrence of the same event does. A span
/// matches on either its original or its current value. Returns `None` when
/// nothing was created.
///
/// ## Errors
/// Returns an error if a store call fails.
pub fn create_occurrence<S: Store>(
    store: &mut S,
    config: &RecurrenceConfig,
    generator: &Generator,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    honour_exceptions: bool,
) -> ServiceResult<Option<Occurrence>> {
    if honour_exceptions && generator.is_exception(start) {
        tracing::trace!(%start, "Skipping exception");
        return Ok(None);
    }

    let scope = if config.allow_clashing_occurrences {
        OccurrenceScope::Generator(generator.id)
    } else {
        OccurrenceScope::Event(generator.event_id)
    };
    if store.span_exists(scope, Span::new(start, end))? {
        tracing::trace!(%start, %end, "Span already taken");
        return Ok(None);
    }

    let occurrence =
        store.insert_occurrence(&NewOccurrence::new(generator.id, generator.event_id, start, end))?;
    Ok(Some(occurrence))
}
