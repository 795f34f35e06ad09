//! Occurrence records: one concrete time span produced by a generator.

use std::cmp::Ordering;

use cadence_core::types::{EventId, GeneratorId, OccurrenceId};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A time span; `end` may equal `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Span {
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// ## Summary
    /// Window intersection as used for occurrence lookups.
    ///
    /// The window end is exclusive and the window start inclusive, so a
    /// zero-length span sitting exactly on `window_start` matches.
    #[must_use]
    pub fn intersects(&self, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> bool {
        self.start < window_end && self.end >= window_start
    }
}

/// An occurrence of an event.
///
/// The original span is the one the generator produced; it never changes
/// through user edits and identifies the occurrence within its generator.
/// `start`/`end` are the current, possibly moved, span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    id: Option<OccurrenceId>,
    generator_id: GeneratorId,
    event_id: EventId,
    original_start: DateTime<Utc>,
    original_end: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub cancelled: bool,
}

impl Occurrence {
    /// An occurrence that exists only in memory, with current span equal to
    /// the original one.
    #[must_use]
    pub const fn unsaved(
        generator_id: GeneratorId,
        event_id: EventId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            generator_id,
            event_id,
            original_start: start,
            original_end: end,
            start,
            end,
            cancelled: false,
        }
    }

    /// ## Summary
    /// Rebuilds a stored occurrence from its columns.
    ///
    /// Intended for storage backends; everything else should obtain
    /// occurrences from a store or through [`Occurrence::unsaved`].
    #[must_use]
    pub const fn from_record(
        id: OccurrenceId,
        generator_id: GeneratorId,
        event_id: EventId,
        original: Span,
        current: Span,
        cancelled: bool,
    ) -> Self {
        Self {
            id: Some(id),
            generator_id,
            event_id,
            original_start: original.start,
            original_end: original.end,
            start: current.start,
            end: current.end,
            cancelled,
        }
    }

    #[must_use]
    pub const fn id(&self) -> Option<OccurrenceId> {
        self.id
    }

    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    #[must_use]
    pub const fn generator_id(&self) -> GeneratorId {
        self.generator_id
    }

    #[must_use]
    pub const fn event_id(&self) -> EventId {
        self.event_id
    }

    #[must_use]
    pub const fn original_start(&self) -> DateTime<Utc> {
        self.original_start
    }

    #[must_use]
    pub const fn original_end(&self) -> DateTime<Utc> {
        self.original_end
    }

    #[must_use]
    pub const fn original_span(&self) -> Span {
        Span::new(self.original_start, self.original_end)
    }

    #[must_use]
    pub const fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.span().duration()
    }

    /// True once the current span differs from the original one.
    #[must_use]
    pub fn is_moved(&self) -> bool {
        self.span() != self.original_span()
    }

    /// Whether both occurrences stem from the same generated slot.
    #[must_use]
    pub fn same_origin(&self, other: &Self) -> bool {
        self.generator_id == other.generator_id && self.original_span() == other.original_span()
    }

    #[must_use]
    pub fn intersects(&self, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> bool {
        self.span().intersects(window_start, window_end)
    }

    /// Moves the current span; the original span is kept.
    pub fn move_to(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.start = start;
        self.end = end;
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn uncancel(&mut self) {
        self.cancelled = false;
    }

    /// ## Summary
    /// Replaces both spans.
    ///
    /// Only the owning generator's reconciliation should call this: it is how
    /// a change to the generator's start or end carries over to the slots it
    /// already produced.
    pub fn rebase(&mut self, original: Span, current: Span) {
        self.original_start = original.start;
        self.original_end = original.end;
        self.start = current.start;
        self.end = current.end;
    }

    /// Chronological order: by current start, then current end.
    #[must_use]
    pub fn chronological(a: &Self, b: &Self) -> Ordering {
        a.start.cmp(&b.start).then(a.end.cmp(&b.end))
    }

    pub(crate) fn persisted(id: OccurrenceId, new: &NewOccurrence) -> Self {
        Self {
            id: Some(id),
            ..Self::unsaved(new.generator_id, new.event_id, new.start, new.end)
        }
    }
}

/// New occurrence for insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOccurrence {
    pub generator_id: GeneratorId,
    pub event_id: EventId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl NewOccurrence {
    #[must_use]
    pub const fn new(
        generator_id: GeneratorId,
        event_id: EventId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            generator_id,
            event_id,
            start,
            end,
        }
    }

    #[must_use]
    pub const fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }
}

impl From<&Occurrence> for NewOccurrence {
    fn from(occurrence: &Occurrence) -> Self {
        Self::new(
            occurrence.generator_id,
            occurrence.event_id,
            occurrence.original_start,
            occurrence.original_end,
        )
    }
}
