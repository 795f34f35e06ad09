//! Event-level views over all generators of an event.

use cadence_core::config::RecurrenceConfig;
use cadence_core::types::EventId;
use cadence_db::model::{Event, Generator, Occurrence};
use cadence_db::store::{OccurrenceScope, Store};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::Serialize;

use crate::error::{ServiceError, ServiceResult};
use crate::reconcile::OccurrenceReconciler;

/// How far ahead [`next_occurrences`] looks for an event without a last day.
const UNBOUNDED_LOOKAHEAD_DAYS: i64 = 28;

/// An occurrence as presented to callers, carrying the owning event's labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventOccurrence {
    #[serde(flatten)]
    pub occurrence: Occurrence,
    pub title: String,
    pub short_title: Option<String>,
    pub description: Option<String>,
}

impl EventOccurrence {
    #[must_use]
    pub fn new(event: &Event, occurrence: Occurrence) -> Self {
        Self {
            occurrence,
            title: event.title.clone(),
            short_title: event.short_title.clone(),
            description: event.description.clone(),
        }
    }
}

/// ## Summary
/// All occurrences of an event within `[window_start, window_end)` in
/// chronological order.
///
/// ## Errors
/// Returns `NotFound` for an unknown event, or the underlying store or rule
/// error.
pub fn event_occurrences<S: Store>(
    store: &S,
    config: &RecurrenceConfig,
    event_id: EventId,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> ServiceResult<Vec<EventOccurrence>> {
    let event = store
        .get_event(event_id)?
        .ok_or_else(|| ServiceError::NotFound(format!("event {event_id}")))?;
    let occurrences = OccurrenceReconciler::new(store, config).get_occurrences(
        OccurrenceScope::Event(event_id),
        window_start,
        window_end,
    )?;
    Ok(occurrences
        .into_iter()
        .map(|occurrence| EventOccurrence::new(&event, occurrence))
        .collect())
}

/// ## Summary
/// The occurrences worth listing for an event.
///
/// From the earliest generator start through the whole of the event's last
/// day when it has one, otherwise the four weeks following `now`.
///
/// ## Errors
/// Returns `NotFound` for an unknown event, or the underlying store or rule
/// error.
pub fn next_occurrences<S: Store>(
    store: &S,
    config: &RecurrenceConfig,
    event_id: EventId,
    now: DateTime<Utc>,
) -> ServiceResult<Vec<EventOccurrence>> {
    let first = primary_generator(store, event_id)?.map(|generator| generator.event_start);
    let (window_start, window_end) = match (first, last_day(store, event_id)?) {
        (Some(first), Some(day)) => {
            let end = day
                .succ_opt()
                .and_then(|next| next.and_hms_opt(0, 0, 0))
                .map_or(DateTime::<Utc>::MAX_UTC, |midnight| midnight.and_utc());
            (first, end)
        }
        _ => {
            let end = now
                .checked_add_signed(TimeDelta::days(UNBOUNDED_LOOKAHEAD_DAYS))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            (now, end)
        }
    };
    tracing::debug!(%window_start, %window_end, "Listing next occurrences");
    event_occurrences(store, config, event_id, window_start, window_end)
}

/// The generator with the earliest start.
///
/// ## Errors
/// Returns the underlying store error.
pub fn primary_generator<S: Store>(store: &S, event_id: EventId) -> ServiceResult<Option<Generator>> {
    Ok(store
        .generators_for_event(event_id)?
        .into_iter()
        .min_by_key(|generator| generator.event_start))
}

/// ## Summary
/// The last day the event touches.
///
/// Rule-less generators contribute their end, repeating ones their
/// `repeat_until`. `None` when the event has no generators or any repeating
/// generator is unbounded.
///
/// ## Errors
/// Returns the underlying store error.
pub fn last_day<S: Store>(store: &S, event_id: EventId) -> ServiceResult<Option<NaiveDate>> {
    let mut last: Option<DateTime<Utc>> = None;
    for generator in store.generators_for_event(event_id)? {
        let until = if generator.rule.is_some() {
            match generator.repeat_until {
                Some(until) => until,
                None => return Ok(None),
            }
        } else {
            generator.event_end
        };
        last = last.max(Some(until));
    }
    Ok(last.map(|instant| instant.date_naive()))
}

/// True when the event has more than one generator or a repeating one.
///
/// ## Errors
/// Returns the underlying store error.
pub fn has_multiple_occurrences<S: Store>(store: &S, event_id: EventId) -> ServiceResult<bool> {
    let generators = store.generators_for_event(event_id)?;
    Ok(generators.len() > 1 || generators.iter().any(|generator| generator.rule.is_some()))
}
