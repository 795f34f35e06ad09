//! Bounded, lazily expanded sequences of start instants.

use std::collections::VecDeque;

use cadence_core::calendar::Exclusion;
use chrono::{DateTime, TimeDelta, Utc};
use rrule::{RRuleSet, Tz};

use crate::error::RuleResult;
use crate::rule::{Rule, RuleSource};

/// Dates pulled from the rule expansion per refill.
const BATCH_SIZE: u16 = 128;

enum Source {
    Single(Option<DateTime<Utc>>),
    Rule(Box<RRuleSet>),
}

/// Strictly increasing start instants in `[from, bound]`.
///
/// The sequence pulls dates from the expansion in batches, so an unbounded
/// rule costs nothing beyond what is consumed. Every sequence carries an
/// explicit upper bound which guarantees termination. To restart, build a
/// new sequence from the same inputs.
pub struct DateSequence {
    source: Source,
    from: DateTime<Utc>,
    bound: DateTime<Utc>,
    /// Last instant taken from the expansion; later batches start after it.
    cursor: Option<DateTime<Utc>>,
    pending: VecDeque<DateTime<Utc>>,
    exclusions: Vec<Exclusion>,
    exhausted: bool,
}

impl DateSequence {
    /// ## Summary
    /// Expands `rule` seeded at `event_start`, yielding instants in
    /// `[from, bound]` that do not fall on an exclusion.
    ///
    /// Without a rule the sequence holds `event_start` alone (when it lies in
    /// range). Exclusions only apply to rules expanded from their frequency
    /// and params; a complex rule is taken as written.
    ///
    /// ## Errors
    /// Returns an error if the rule's structured params are invalid.
    pub fn for_rule(
        rule: Option<&Rule>,
        event_start: DateTime<Utc>,
        from: DateTime<Utc>,
        bound: DateTime<Utc>,
        exclusions: &[Exclusion],
    ) -> RuleResult<Self> {
        let (source, exclusions) = match rule {
            None => (
                Source::Single((from <= event_start && event_start <= bound).then_some(event_start)),
                Vec::new(),
            ),
            Some(rule) => {
                let (set, origin) = rule.expand(event_start)?;
                let exclusions = match origin {
                    RuleSource::Structured => exclusions.to_vec(),
                    RuleSource::Complex => Vec::new(),
                };
                (Source::Rule(Box::new(set)), exclusions)
            }
        };
        Ok(Self {
            source,
            from,
            bound,
            cursor: None,
            pending: VecDeque::new(),
            exclusions,
            exhausted: false,
        })
    }

    #[must_use]
    pub fn bound(&self) -> DateTime<Utc> {
        self.bound
    }

    fn is_excluded(&self, date: DateTime<Utc>) -> bool {
        let day = date.date_naive();
        self.exclusions.iter().any(|exclusion| exclusion.matches(day))
    }

    fn refill(&mut self) {
        let set = match &mut self.source {
            Source::Single(instant) => {
                self.pending.extend(instant.take());
                self.exhausted = true;
                return;
            }
            Source::Rule(set) => set.as_ref().clone(),
        };

        // `after`/`before` may or may not be inclusive, so widen them where
        // the range allows and filter precisely below.
        let after = self.cursor.unwrap_or_else(|| {
            self.from
                .checked_sub_signed(TimeDelta::nanoseconds(1))
                .unwrap_or(self.from)
        });
        let before = self
            .bound
            .checked_add_signed(TimeDelta::seconds(1))
            .unwrap_or(self.bound);
        let result = set
            .after(after.with_timezone(&Tz::UTC))
            .before(before.with_timezone(&Tz::UTC))
            .all(BATCH_SIZE);
        let fetched = result.dates.len();

        let mut advanced = false;
        for date in result.dates {
            let date = date.with_timezone(&Utc);
            let seen = self.cursor.is_some_and(|cursor| date <= cursor);
            if seen || date < self.from || date > self.bound {
                continue;
            }
            self.cursor = Some(date);
            advanced = true;
            if self.is_excluded(date) {
                tracing::trace!(%date, "Skipping excluded calendar date");
            } else {
                self.pending.push_back(date);
            }
        }

        if !advanced || fetched < usize::from(BATCH_SIZE) {
            self.exhausted = true;
        }
    }
}

impl Iterator for DateSequence {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(date) = self.pending.pop_front() {
                return Some(date);
            }
            if self.exhausted {
                return None;
            }
            self.refill();
        }
    }
}

impl std::fmt::Debug for DateSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DateSequence")
            .field("from", &self.from)
            .field("bound", &self.bound)
            .field("cursor", &self.cursor)
            .field("pending", &self.pending.len())
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}
