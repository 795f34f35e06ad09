//! Repetition rules and their translation into `rrule` expansions.

use chrono::{DateTime, Month, TimeDelta, Utc, Weekday};
use rrule::{NWeekday, RRule, RRuleSet, Tz, Unvalidated};
use serde::{Deserialize, Serialize};

use crate::error::{RuleError, RuleResult};
use crate::frequency::Frequency;
use crate::params::{ParamKey, RuleParams};

const MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

/// Weekday numbering follows the params text form: 0 is Monday.
const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Which half of a [`Rule`] an expansion was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSource {
    Complex,
    Structured,
}

/// A rule by which an event recurs.
///
/// `complex_rule` holds a raw RRULE body (e.g. `FREQ=WEEKLY;BYDAY=TU,TH`)
/// and overrides `frequency`/`params` whenever it parses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub params: RuleParams,
    pub complex_rule: Option<String>,
}

impl Rule {
    #[must_use]
    pub fn new(name: impl Into<String>, frequency: Frequency) -> Self {
        Self {
            name: name.into(),
            description: None,
            frequency,
            params: RuleParams::new(),
            complex_rule: None,
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: RuleParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_complex_rule(mut self, complex_rule: impl Into<String>) -> Self {
        self.complex_rule = Some(complex_rule.into());
        self
    }

    #[must_use]
    pub fn nominal_period(&self) -> TimeDelta {
        self.frequency.nominal_period()
    }

    /// True when both rules expand to the same dates; labels are ignored.
    #[must_use]
    pub fn same_expansion(&self, other: &Self) -> bool {
        self.frequency == other.frequency
            && self.params == other.params
            && self.complex_rule == other.complex_rule
    }

    /// ## Summary
    /// Builds the expansion seeded at `dtstart`.
    ///
    /// ## Errors
    /// Returns an error if the structured params cannot form a valid rule.
    pub fn build_set(&self, dtstart: DateTime<Utc>) -> RuleResult<RRuleSet> {
        self.expand(dtstart).map(|(set, _)| set)
    }

    /// ## Summary
    /// Builds the expansion seeded at `dtstart` and reports which half of the
    /// rule it came from.
    ///
    /// A complex rule that fails to parse is logged and ignored; the
    /// structured frequency and params are used instead.
    ///
    /// ## Errors
    /// Returns an error if the structured params cannot form a valid rule.
    pub fn expand(&self, dtstart: DateTime<Utc>) -> RuleResult<(RRuleSet, RuleSource)> {
        let dtstart = dtstart.with_timezone(&Tz::UTC);

        if let Some(complex) = self
            .complex_rule
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
        {
            match parse_complex(complex, dtstart) {
                Ok(set) => {
                    tracing::trace!(rule = %self.name, complex_rule = %complex, "Using complex rule");
                    return Ok((set, RuleSource::Complex));
                }
                Err(err) => {
                    tracing::warn!(
                        rule = %self.name,
                        complex_rule = %complex,
                        error = %err,
                        "Complex rule did not parse, falling back to frequency and params"
                    );
                }
            }
        }

        let set = self
            .structured()?
            .build(dtstart)
            .map_err(|err| RuleError::RRuleValidationError(err.to_string()))?;
        Ok((set, RuleSource::Structured))
    }

    fn structured(&self) -> RuleResult<RRule<Unvalidated>> {
        let mut rrule = RRule::new(self.frequency.to_rrule());
        for (key, value) in self.params.iter() {
            let values = value.values();
            rrule = match key {
                ParamKey::Count => rrule.count(narrow(key, single(key, values)?)?),
                ParamKey::Interval => rrule.interval(narrow(key, single(key, values)?)?),
                ParamKey::BySetPos => rrule.by_set_pos(narrow_all(key, values)?),
                ParamKey::ByMonth => rrule.by_month(&lookup_all(key, values, &MONTHS, 1)?),
                ParamKey::ByMonthDay => rrule.by_month_day(narrow_all(key, values)?),
                ParamKey::ByYearDay => rrule.by_year_day(narrow_all(key, values)?),
                ParamKey::ByWeekNo => rrule.by_week_no(narrow_all(key, values)?),
                ParamKey::ByWeekday => rrule.by_weekday(
                    lookup_all(key, values, &WEEKDAYS, 0)?
                        .into_iter()
                        .map(NWeekday::Every)
                        .collect(),
                ),
                ParamKey::ByHour => rrule.by_hour(narrow_all(key, values)?),
                ParamKey::ByMinute => rrule.by_minute(narrow_all(key, values)?),
                ParamKey::BySecond => rrule.by_second(narrow_all(key, values)?),
                ParamKey::ByEaster => rrule.by_easter(narrow(key, single(key, values)?)?),
            };
        }
        Ok(rrule)
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

fn parse_complex(text: &str, dtstart: DateTime<Tz>) -> Result<RRuleSet, String> {
    let body = text.strip_prefix("RRULE:").unwrap_or(text);
    let rrule = body
        .parse::<RRule<Unvalidated>>()
        .map_err(|err| err.to_string())?;
    rrule.build(dtstart).map_err(|err| err.to_string())
}

fn invalid(key: ParamKey, value: impl ToString) -> RuleError {
    RuleError::InvalidParamValue {
        param: key.to_string(),
        value: value.to_string(),
    }
}

fn single(key: ParamKey, values: &[i64]) -> RuleResult<i64> {
    match values {
        [value] => Ok(*value),
        _ => Err(invalid(
            key,
            values
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
        )),
    }
}

fn narrow<T: TryFrom<i64>>(key: ParamKey, value: i64) -> RuleResult<T> {
    T::try_from(value).map_err(|_| invalid(key, value))
}

fn narrow_all<T: TryFrom<i64>>(key: ParamKey, values: &[i64]) -> RuleResult<Vec<T>> {
    values.iter().map(|value| narrow(key, *value)).collect()
}

fn lookup_all<T: Copy>(key: ParamKey, values: &[i64], table: &[T], base: i64) -> RuleResult<Vec<T>> {
    values
        .iter()
        .map(|value| {
            usize::try_from(value - base)
                .ok()
                .and_then(|index| table.get(index).copied())
                .ok_or_else(|| invalid(key, value))
        })
        .collect()
}
