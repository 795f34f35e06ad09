//! Windowed occurrence queries that merge freshly generated candidates with
//! stored, possibly user-edited, occurrences.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use cadence_core::config::RecurrenceConfig;
use cadence_db::model::{Generator, Occurrence, Span};
use cadence_db::store::{OccurrenceScope, Store};
use cadence_rule::Rule;
use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{ServiceError, ServiceResult};

/// Number of nominal rule periods fetched per step by [`OccurrencesAfter`].
const PERIODS_PER_STEP: i32 = 32;

/// ## Summary
/// Answers "which occurrences fall in this window" for a generator or an
/// event.
///
/// Stored occurrences always win over generated candidates: a candidate is
/// replaced by the stored occurrence with the same original span, which is
/// then kept only if its current span is still in the window. Stored
/// occurrences moved into the window from elsewhere are added as well.
#[derive(Debug)]
pub struct OccurrenceReconciler<'a, S> {
    store: &'a S,
    config: &'a RecurrenceConfig,
}

impl<'a, S: Store> OccurrenceReconciler<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S, config: &'a RecurrenceConfig) -> Self {
        Self { store, config }
    }

    /// ## Summary
    /// Occurrences intersecting `[window_start, window_end)`, ordered by start
    /// and then end.
    ///
    /// ## Errors
    /// Returns `NotFound` for an unknown generator, or the underlying store or
    /// rule error.
    #[tracing::instrument(skip(self))]
    pub fn get_occurrences(
        &self,
        scope: OccurrenceScope,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> ServiceResult<Vec<Occurrence>> {
        let generators = match scope {
            OccurrenceScope::Generator(id) => vec![
                self.store
                    .get_generator(id)?
                    .ok_or_else(|| ServiceError::NotFound(format!("generator {id}")))?,
            ],
            OccurrenceScope::Event(id) => self.store.generators_for_event(id)?,
        };

        let mut occurrences = Vec::new();
        for generator in &generators {
            occurrences.extend(self.generator_window(generator, window_start, window_end)?);
        }
        if matches!(scope, OccurrenceScope::Event(_)) && !self.config.allow_clashing_occurrences {
            occurrences = self.drop_clashing_candidates(scope, occurrences)?;
        }
        occurrences.sort_by(Occurrence::chronological);
        tracing::debug!(count = occurrences.len(), "Reconciled occurrences");
        Ok(occurrences)
    }

    /// ## Summary
    /// Lazily walks the generator's occurrences whose end lies after `after`,
    /// in chronological order, up to the generation bound.
    #[must_use]
    pub fn occurrences_after(
        &self,
        generator: &Generator,
        after: DateTime<Utc>,
    ) -> OccurrencesAfter<'a, S> {
        let step = generator
            .rule
            .as_ref()
            .map_or(TimeDelta::days(1), Rule::nominal_period)
            * PERIODS_PER_STEP;
        let last = generator.generation_bound(self.config);
        let bound = last
            .checked_add_signed(TimeDelta::nanoseconds(1))
            .unwrap_or(last);
        OccurrencesAfter {
            store: self.store,
            config: self.config,
            generator: generator.clone(),
            after,
            window_start: after,
            bound,
            step,
            pending: VecDeque::new(),
            first: true,
            done: after >= bound,
        }
    }

    /// ## Summary
    /// The occurrence generated at exactly `at`: the stored one when it
    /// exists, a fresh candidate otherwise.
    ///
    /// `None` when the rule does not produce `at`, or when `at` is an
    /// exception that was never stored.
    ///
    /// ## Errors
    /// Returns the underlying store or rule error.
    pub fn get_occurrence(
        &self,
        generator: &Generator,
        at: DateTime<Utc>,
    ) -> ServiceResult<Option<Occurrence>> {
        let mut dates = generator.dates_between(at, at, self.config)?;
        if dates.next() != Some(at) {
            return Ok(None);
        }

        let stored = self
            .store
            .occurrences_starting_in(generator.id, &BTreeSet::from([at]))?
            .into_iter()
            .next();
        if stored.is_some() {
            return Ok(stored);
        }
        if generator.is_exception(at) {
            return Ok(None);
        }
        let span = generator.span_at(at);
        Ok(Some(Occurrence::unsaved(
            generator.id,
            generator.event_id,
            span.start,
            span.end,
        )))
    }

    /// Removes unsaved candidates whose span is already taken in `scope`,
    /// either by a stored occurrence (original or current span) or by an
    /// earlier candidate. Generation would refuse to store them.
    fn drop_clashing_candidates(
        &self,
        scope: OccurrenceScope,
        occurrences: Vec<Occurrence>,
    ) -> ServiceResult<Vec<Occurrence>> {
        let mut taken: BTreeSet<Span> = BTreeSet::new();
        for occurrence in self.store.occurrences(scope)? {
            taken.insert(occurrence.original_span());
            taken.insert(occurrence.span());
        }

        let before = occurrences.len();
        let kept: Vec<_> = occurrences
            .into_iter()
            .filter(|occurrence| occurrence.is_persisted() || taken.insert(occurrence.span()))
            .collect();
        if kept.len() < before {
            tracing::debug!(dropped = before - kept.len(), "Dropped clashing candidates");
        }
        Ok(kept)
    }

    fn generator_window(
        &self,
        generator: &Generator,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> ServiceResult<Vec<Occurrence>> {
        reconcile_window(self.store, self.config, generator, window_start, window_end)
    }
}

fn reconcile_window<S: Store>(
    store: &S,
    config: &RecurrenceConfig,
    generator: &Generator,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> ServiceResult<Vec<Occurrence>> {
    let mut stored: BTreeMap<Span, Occurrence> = store
        .occurrences(OccurrenceScope::Generator(generator.id))?
        .into_iter()
        .map(|occurrence| (occurrence.original_span(), occurrence))
        .collect();

    // Candidates that started up to one duration before the window still
    // overlap it.
    let from = window_start
        .checked_sub_signed(generator.duration())
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let candidates = generator
        .dates_between(from, window_end, config)?
        .take_while(|date| *date < window_end)
        .filter(|date| !generator.is_exception(*date));

    let mut occurrences = Vec::new();
    for date in candidates {
        let span = generator.span_at(date);
        match stored.remove(&span) {
            Some(occurrence) => {
                if occurrence.intersects(window_start, window_end) {
                    occurrences.push(occurrence);
                }
            }
            None => occurrences.push(Occurrence::unsaved(
                generator.id,
                generator.event_id,
                span.start,
                span.end,
            )),
        }
    }

    occurrences.extend(
        stored
            .into_values()
            .filter(|occurrence| occurrence.intersects(window_start, window_end)),
    );
    occurrences.sort_by(Occurrence::chronological);
    Ok(occurrences)
}

/// Iterator returned by [`OccurrenceReconciler::occurrences_after`].
///
/// Each step reconciles one window; a failed step yields the error and ends
/// the iteration.
#[derive(Debug)]
pub struct OccurrencesAfter<'a, S> {
    store: &'a S,
    config: &'a RecurrenceConfig,
    generator: Generator,
    after: DateTime<Utc>,
    window_start: DateTime<Utc>,
    /// Exclusive.
    bound: DateTime<Utc>,
    step: TimeDelta,
    pending: VecDeque<Occurrence>,
    first: bool,
    done: bool,
}

impl<S: Store> OccurrencesAfter<'_, S> {
    fn fill(&mut self) -> ServiceResult<()> {
        let window_end = self
            .window_start
            .checked_add_signed(self.step)
            .map_or(self.bound, |end| end.min(self.bound));

        let occurrences = reconcile_window(
            self.store,
            self.config,
            &self.generator,
            self.window_start,
            window_end,
        )?;
        // Later windows only take what starts inside them, so an occurrence
        // spanning a window edge is yielded once.
        let first = self.first;
        let window_start = self.window_start;
        let after = self.after;
        self.pending.extend(occurrences.into_iter().filter(|occurrence| {
            occurrence.end > after && (first || occurrence.start >= window_start)
        }));

        self.first = false;
        self.window_start = window_end;
        if window_end >= self.bound {
            self.done = true;
        }
        Ok(())
    }
}

impl<S: Store> Iterator for OccurrencesAfter<'_, S> {
    type Item = ServiceResult<Occurrence>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(occurrence) = self.pending.pop_front() {
                return Some(Ok(occurrence));
            }
            if self.done {
                return None;
            }
            if let Err(err) = self.fill() {
                self.done = true;
                return Some(Err(err));
            }
        }
    }
}
