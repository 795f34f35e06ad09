//! The storage contract for events, generators and occurrences.
//!
//! Occurrence lookups that take a generator id select by the occurrence's
//! *original* span unless stated otherwise, since that is what identifies an
//! occurrence within its generator. Lists come back in chronological order.

mod memory;

use std::collections::BTreeSet;

use cadence_core::types::{EventId, GeneratorId, OccurrenceId};
use chrono::{DateTime, NaiveTime, Utc};

use crate::error::DbResult;
use crate::model::{Event, Generator, NewOccurrence, Occurrence, Span};

pub use memory::MemoryStore;

/// Which occurrences a lookup covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceScope {
    Generator(GeneratorId),
    Event(EventId),
}

/// Which end of the original span a time-of-day lookup inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanEdge {
    Start,
    End,
}

pub trait Store {
    /// ## Summary
    /// Runs `callback` atomically: when it returns `Err`, every write it made
    /// is undone before the error is handed back.
    ///
    /// Nested calls behave like savepoints.
    ///
    /// ## Errors
    /// Returns whatever error the callback produced.
    fn transaction<T, E, F>(&mut self, callback: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>;

    /// ## Errors
    /// Returns a storage error if the lookup fails.
    fn get_event(&self, id: EventId) -> DbResult<Option<Event>>;

    /// ## Errors
    /// Returns a storage error if the write fails.
    fn save_event(&mut self, event: &Event) -> DbResult<()>;

    /// ## Errors
    /// Returns a storage error if the lookup fails.
    fn get_generator(&self, id: GeneratorId) -> DbResult<Option<Generator>>;

    /// ## Errors
    /// Returns a storage error if the lookup fails.
    fn generators_for_event(&self, event_id: EventId) -> DbResult<Vec<Generator>>;

    /// ## Summary
    /// Inserts or replaces a generator.
    ///
    /// ## Errors
    /// Returns `EventNotFound` when the owning event does not exist.
    fn save_generator(&mut self, generator: &Generator) -> DbResult<()>;

    /// ## Summary
    /// Deletes a generator together with all of its occurrences and returns
    /// how many occurrences went with it.
    ///
    /// ## Errors
    /// Returns `GeneratorNotFound` when there is nothing to delete.
    fn delete_generator(&mut self, id: GeneratorId) -> DbResult<usize>;

    /// ## Errors
    /// Returns a storage error if the lookup fails.
    fn get_occurrence(&self, id: OccurrenceId) -> DbResult<Option<Occurrence>>;

    /// ## Errors
    /// Returns a storage error if the lookup fails.
    fn occurrences(&self, scope: OccurrenceScope) -> DbResult<Vec<Occurrence>>;

    /// ## Summary
    /// Occurrences of a generator whose original start is one of `starts`.
    ///
    /// ## Errors
    /// Returns a storage error if the lookup fails.
    fn occurrences_starting_in(
        &self,
        generator_id: GeneratorId,
        starts: &BTreeSet<DateTime<Utc>>,
    ) -> DbResult<Vec<Occurrence>>;

    /// ## Summary
    /// Occurrences of a generator whose original start (or end) falls at
    /// `time` on whatever day.
    ///
    /// ## Errors
    /// Returns a storage error if the lookup fails.
    fn occurrences_at_time_of_day(
        &self,
        generator_id: GeneratorId,
        edge: SpanEdge,
        time: NaiveTime,
    ) -> DbResult<Vec<Occurrence>>;

    /// ## Summary
    /// Occurrences of a generator whose original start is strictly after
    /// `instant`.
    ///
    /// ## Errors
    /// Returns a storage error if the lookup fails.
    fn occurrences_starting_after(
        &self,
        generator_id: GeneratorId,
        instant: DateTime<Utc>,
    ) -> DbResult<Vec<Occurrence>>;

    /// ## Summary
    /// True when an occurrence in `scope` has `span` as either its original
    /// or its current span.
    ///
    /// ## Errors
    /// Returns a storage error if the lookup fails.
    fn span_exists(&self, scope: OccurrenceScope, span: Span) -> DbResult<bool>;

    /// ## Summary
    /// Stores a fresh occurrence whose original and current spans are both
    /// the span of `new`.
    ///
    /// ## Errors
    /// Returns `GeneratorNotFound` for a missing generator and
    /// `UniqueViolation` when the generator already owns that original span.
    fn insert_occurrence(&mut self, new: &NewOccurrence) -> DbResult<Occurrence>;

    /// ## Summary
    /// Writes back spans and the cancelled flag of a stored occurrence.
    ///
    /// ## Errors
    /// Returns `NotPersisted` for an unsaved occurrence, `OccurrenceNotFound`
    /// for an unknown one and `OwnershipMismatch` when the generator or event
    /// differs from the stored one. `UniqueViolation` is returned when the
    /// new original span is already taken within the generator.
    fn update_occurrence(&mut self, occurrence: &Occurrence) -> DbResult<()>;

    /// ## Errors
    /// Returns `OccurrenceNotFound` when there is nothing to delete.
    fn delete_occurrence(&mut self, id: OccurrenceId) -> DbResult<()>;
}
