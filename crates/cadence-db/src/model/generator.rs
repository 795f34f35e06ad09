//! Generators: a start/end pair plus an optional rule that together produce
//! an event's occurrences.

use std::collections::BTreeSet;

use cadence_core::config::RecurrenceConfig;
use cadence_core::types::{EventId, GeneratorId};
use cadence_rule::{DateSequence, Rule, RuleResult};
use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::occurrence::Span;

/// A recurrence definition attached to an event.
///
/// Without a rule the generator produces exactly one occurrence at
/// `event_start`. `exceptions` holds original start instants whose
/// occurrences must not be (re)created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generator {
    pub id: GeneratorId,
    pub event_id: EventId,
    pub event_start: DateTime<Utc>,
    pub event_end: DateTime<Utc>,
    pub rule: Option<Rule>,
    pub repeat_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exceptions: BTreeSet<DateTime<Utc>>,
}

impl Generator {
    /// A rule-less generator whose end equals its start.
    #[must_use]
    pub fn new(event_id: EventId, event_start: DateTime<Utc>) -> Self {
        Self {
            id: GeneratorId::new(),
            event_id,
            event_start,
            event_end: event_start,
            rule: None,
            repeat_until: None,
            exceptions: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_end(mut self, event_end: DateTime<Utc>) -> Self {
        self.event_end = event_end;
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rule = Some(rule);
        self
    }

    #[must_use]
    pub fn with_repeat_until(mut self, repeat_until: DateTime<Utc>) -> Self {
        self.repeat_until = Some(repeat_until);
        self
    }

    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.event_end - self.event_start
    }

    /// The span of the occurrence generated at `start`.
    #[must_use]
    pub fn span_at(&self, start: DateTime<Utc>) -> Span {
        Span::new(start, start + self.duration())
    }

    /// ## Summary
    /// True when the generator covers whole days: it starts at midnight and
    /// ends on the last microsecond of a day.
    #[must_use]
    pub fn is_all_day(&self) -> bool {
        let last_instant = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999);
        self.event_start.time() == NaiveTime::MIN && Some(self.event_end.time()) == last_instant
    }

    #[must_use]
    pub fn is_exception(&self, original_start: DateTime<Utc>) -> bool {
        self.exceptions.contains(&original_start)
    }

    /// ## Summary
    /// Inclusive upper bound for generated start instants.
    ///
    /// `repeat_until` when set, otherwise the configured horizon past
    /// `event_start`.
    #[must_use]
    pub fn generation_bound(&self, config: &RecurrenceConfig) -> DateTime<Utc> {
        self.repeat_until.unwrap_or_else(|| {
            self.event_start
                .checked_add_signed(config.default_horizon())
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        })
    }

    /// ## Summary
    /// Start instants of every occurrence this generator should own.
    ///
    /// ## Errors
    /// Returns an error if the rule's params cannot be expanded.
    pub fn generate_dates(&self, config: &RecurrenceConfig) -> RuleResult<DateSequence> {
        self.dates_between(self.event_start, self.generation_bound(config), config)
    }

    /// ## Summary
    /// Start instants in `[from, until]`, never past `repeat_until`.
    ///
    /// ## Errors
    /// Returns an error if the rule's params cannot be expanded.
    pub fn dates_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        config: &RecurrenceConfig,
    ) -> RuleResult<DateSequence> {
        let bound = self.repeat_until.map_or(until, |limit| limit.min(until));
        DateSequence::for_rule(
            self.rule.as_ref(),
            self.event_start,
            from,
            bound,
            &config.exclusions,
        )
    }
}
