use std::collections::BTreeSet;

use cadence_core::config::RecurrenceConfig;
use cadence_core::types::GeneratorId;
use cadence_db::model::{Generator, Occurrence, Span};
use cadence_db::store::{OccurrenceScope, SpanEdge, Store};
use chrono::{DateTime, TimeDelta, Utc};

use super::generate::generate;
use super::validate::validate_generator;
use crate::error::{ServiceError, ServiceResult};

/// Options for [`save_generator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Run generation after the generator row is written.
    pub generate: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self { generate: true }
    }
}

/// ## Summary
/// Validates and stores a generator, bringing its existing occurrences in
/// line with the new definition.
///
/// For a generator that already exists the previous row drives four steps,
/// in order: shift occurrences when the start moved, otherwise shift their
/// ends when the end moved; drop occurrences past a tightened
/// `repeat_until`; drop occurrences the changed rule no longer produces.
/// Exceptions are left alone throughout. Generation runs last unless
/// `options.generate` is false.
///
/// ## Side Effects
/// Everything runs in one store transaction; on error nothing is written.
///
/// ## Errors
/// Returns `ValidationError` (before any write) for an inconsistent
/// generator, and store or rule errors raised while reconciling.
#[tracing::instrument(skip(store, config, generator), fields(
    generator_id = %generator.id,
    event_id = %generator.event_id,
    generate = options.generate
))]
pub fn save_generator<S: Store>(
    store: &mut S,
    config: &RecurrenceConfig,
    generator: &Generator,
    options: SaveOptions,
) -> ServiceResult<()> {
    validate_generator(generator)?;

    store.transaction(|store| {
        match store.get_generator(generator.id)? {
            Some(previous) => {
                if previous.event_id != generator.event_id {
                    return Err(ServiceError::ValidationError(
                        "a generator cannot move to another event".to_string(),
                    ));
                }
                reconcile_saved(store, config, &previous, generator)?;
            }
            None => tracing::debug!("Saving new generator"),
        }

        store.save_generator(generator)?;

        if options.generate {
            generate(store, config, generator)?;
        }
        Ok(())
    })
}

/// ## Summary
/// Deletes a generator and every occurrence it produced.
///
/// ## Errors
/// Returns `GeneratorNotFound` when the generator does not exist.
#[tracing::instrument(skip(store))]
pub fn delete_generator<S: Store>(store: &mut S, id: GeneratorId) -> ServiceResult<usize> {
    let deleted = store.transaction(|store| store.delete_generator(id))?;
    tracing::debug!(deleted, "Deleted generator and its occurrences");
    Ok(deleted)
}

fn reconcile_saved<S: Store>(
    store: &mut S,
    config: &RecurrenceConfig,
    previous: &Generator,
    current: &Generator,
) -> ServiceResult<()> {
    let start_shift = current.event_start - previous.event_start;
    let end_shift = current.event_end - previous.event_end;

    if start_shift != TimeDelta::zero() {
        shift_starts(store, config, previous, current, start_shift)?;
    } else if end_shift != TimeDelta::zero() {
        shift_ends(store, config, previous, current, end_shift)?;
    }

    if let Some(limit) = current.repeat_until
        && previous.repeat_until.is_none_or(|old| limit < old)
    {
        let beyond = store.occurrences_starting_after(current.id, limit)?;
        tracing::debug!(%limit, count = beyond.len(), "Dropping occurrences past repeat_until");
        for occurrence in beyond {
            delete(store, &occurrence)?;
        }
    }

    let rule_changed = match (&previous.rule, &current.rule) {
        (Some(old), Some(new)) => !old.same_expansion(new),
        (None, None) => false,
        _ => true,
    };
    if rule_changed {
        let dates: BTreeSet<DateTime<Utc>> = current.generate_dates(config)?.collect();
        let stale: Vec<Occurrence> = store
            .occurrences(OccurrenceScope::Generator(current.id))?
            .into_iter()
            .filter(|occurrence| {
                !dates.contains(&occurrence.original_start())
                    && !current.is_exception(occurrence.original_start())
            })
            .collect();
        tracing::debug!(count = stale.len(), "Dropping occurrences the new rule does not produce");
        for occurrence in &stale {
            delete(store, occurrence)?;
        }
    }

    Ok(())
}

fn shift_starts<S: Store>(
    store: &mut S,
    config: &RecurrenceConfig,
    previous: &Generator,
    current: &Generator,
    shift: TimeDelta,
) -> ServiceResult<()> {
    let selected = if current.event_start.date_naive() == previous.event_start.date_naive() {
        store.occurrences_at_time_of_day(previous.id, SpanEdge::Start, previous.event_start.time())?
    } else {
        let dates: BTreeSet<DateTime<Utc>> = previous.generate_dates(config)?.collect();
        store.occurrences_starting_in(previous.id, &dates)?
    };
    tracing::debug!(%shift, count = selected.len(), "Shifting occurrence starts");

    let duration = current.duration();
    let mut rebases = Vec::with_capacity(selected.len());
    for occurrence in selected {
        if current.is_exception(occurrence.original_start()) {
            continue;
        }
        let original_start = occurrence.original_start() + shift;
        let start = occurrence.start + shift;
        if current.repeat_until.is_some_and(|limit| original_start > limit) {
            delete(store, &occurrence)?;
            continue;
        }
        let original = Span::new(original_start, original_start + duration);
        let span = Span::new(start, start + duration);
        rebases.push((occurrence, original, span));
    }

    // Later slots move first when shifting forward, earlier ones when
    // shifting back, so no two occurrences hold one original span at once.
    rebases.sort_by_key(|(occurrence, _, _)| occurrence.original_start());
    if shift > TimeDelta::zero() {
        rebases.reverse();
    }
    apply_rebases(store, current.id, rebases)
}

fn shift_ends<S: Store>(
    store: &mut S,
    config: &RecurrenceConfig,
    previous: &Generator,
    current: &Generator,
    shift: TimeDelta,
) -> ServiceResult<()> {
    let selected = if current.event_end.date_naive() == previous.event_end.date_naive() {
        store.occurrences_at_time_of_day(previous.id, SpanEdge::End, previous.event_end.time())?
    } else {
        let dates: BTreeSet<DateTime<Utc>> = current.generate_dates(config)?.collect();
        store.occurrences_starting_in(current.id, &dates)?
    };
    tracing::debug!(%shift, count = selected.len(), "Shifting occurrence ends");

    let duration = current.duration();
    let shifted_end = |start: DateTime<Utc>, end: DateTime<Utc>| {
        let end = end + shift;
        if end < start {
            tracing::warn!(%start, %end, "Shifted end precedes start, resetting to the generator duration");
            start + duration
        } else {
            end
        }
    };

    let mut rebases: Vec<(Occurrence, Span, Span)> = selected
        .into_iter()
        .filter(|occurrence| !current.is_exception(occurrence.original_start()))
        .map(|occurrence| {
            let original = Span::new(
                occurrence.original_start(),
                shifted_end(occurrence.original_start(), occurrence.original_end()),
            );
            let span = Span::new(occurrence.start, shifted_end(occurrence.start, occurrence.end));
            (occurrence, original, span)
        })
        .collect();

    rebases.sort_by_key(|(occurrence, _, _)| occurrence.original_span());
    if shift > TimeDelta::zero() {
        rebases.reverse();
    }
    apply_rebases(store, current.id, rebases)
}

/// Writes rebased occurrences in the given order. An occurrence whose new
/// original span is still held by one that stays put is deleted instead.
fn apply_rebases<S: Store>(
    store: &mut S,
    generator_id: GeneratorId,
    rebases: Vec<(Occurrence, Span, Span)>,
) -> ServiceResult<()> {
    let mut held: BTreeSet<Span> = store
        .occurrences(OccurrenceScope::Generator(generator_id))?
        .iter()
        .map(Occurrence::original_span)
        .collect();

    for (mut occurrence, original, span) in rebases {
        held.remove(&occurrence.original_span());
        if held.contains(&original) {
            tracing::debug!(
                original_start = %original.start,
                "Shifted slot is already taken, dropping occurrence"
            );
            delete(store, &occurrence)?;
            continue;
        }
        held.insert(original);
        occurrence.rebase(original, span);
        store.update_occurrence(&occurrence)?;
    }
    Ok(())
}

fn delete<S: Store>(store: &mut S, occurrence: &Occurrence) -> ServiceResult<()> {
    if let Some(id) = occurrence.id() {
        store.delete_occurrence(id)?;
    }
    Ok(())
}
