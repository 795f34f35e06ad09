//! Structured rule parameters and their compact text form.
//!
//! The text form is `name:value[,value…]` segments joined with `;`, for
//! example `count:1;bysecond:1;byminute:1,2,4,5`. A single value is stored as
//! a scalar, several values as a list. Segments that are not exactly one
//! `name:value` pair are ignored.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RuleError, RuleResult};

/// Name of an inclusion parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKey {
    Count,
    Interval,
    BySetPos,
    ByMonth,
    ByMonthDay,
    ByYearDay,
    ByWeekNo,
    ByWeekday,
    ByHour,
    ByMinute,
    BySecond,
    ByEaster,
}

impl ParamKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Interval => "interval",
            Self::BySetPos => "bysetpos",
            Self::ByMonth => "bymonth",
            Self::ByMonthDay => "bymonthday",
            Self::ByYearDay => "byyearday",
            Self::ByWeekNo => "byweekno",
            Self::ByWeekday => "byweekday",
            Self::ByHour => "byhour",
            Self::ByMinute => "byminute",
            Self::BySecond => "bysecond",
            Self::ByEaster => "byeaster",
        }
    }
}

impl FromStr for ParamKey {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept "by-month-day" and "by_month_day" as well as "bymonthday".
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "count" => Ok(Self::Count),
            "interval" => Ok(Self::Interval),
            "bysetpos" | "bysetposition" => Ok(Self::BySetPos),
            "bymonth" => Ok(Self::ByMonth),
            "bymonthday" => Ok(Self::ByMonthDay),
            "byyearday" => Ok(Self::ByYearDay),
            "byweekno" | "byweeknumber" => Ok(Self::ByWeekNo),
            "byweekday" | "byday" => Ok(Self::ByWeekday),
            "byhour" => Ok(Self::ByHour),
            "byminute" => Ok(Self::ByMinute),
            "bysecond" => Ok(Self::BySecond),
            "byeaster" | "byeasteroffset" => Ok(Self::ByEaster),
            _ => Err(RuleError::UnknownParam(s.trim().to_string())),
        }
    }
}

impl std::fmt::Display for ParamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parameter value: one integer, or an ordered list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(i64),
    List(Vec<i64>),
}

impl ParamValue {
    /// Collapses a single-element list to a scalar.
    #[must_use]
    pub fn from_values(mut values: Vec<i64>) -> Self {
        if values.len() == 1 {
            Self::Scalar(values.remove(0))
        } else {
            Self::List(values)
        }
    }

    #[must_use]
    pub fn values(&self) -> &[i64] {
        match self {
            Self::Scalar(value) => std::slice::from_ref(value),
            Self::List(values) => values,
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .values()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&joined)
    }
}

/// Parsed inclusion parameters of a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleParams(BTreeMap<ParamKey, ParamValue>);

impl RuleParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ## Summary
    /// Parses the compact `name:v[,v…];…` form.
    ///
    /// ## Errors
    /// Returns `UnknownParam` for an unrecognised name and `InvalidParamValue`
    /// when a value is not an integer.
    pub fn parse(text: &str) -> RuleResult<Self> {
        let mut params = BTreeMap::new();
        for segment in text.split(';') {
            let parts: Vec<&str> = segment.split(':').collect();
            let [name, raw_values] = parts.as_slice() else {
                continue;
            };
            let key = name.parse::<ParamKey>()?;
            let values = raw_values
                .split(',')
                .map(|raw| {
                    raw.trim()
                        .parse::<i64>()
                        .map_err(|_| RuleError::InvalidParamValue {
                            param: key.to_string(),
                            value: raw.trim().to_string(),
                        })
                })
                .collect::<RuleResult<Vec<_>>>()?;
            params.insert(key, ParamValue::from_values(values));
        }
        Ok(Self(params))
    }

    #[must_use]
    pub fn with(mut self, key: ParamKey, value: ParamValue) -> Self {
        self.0.insert(key, value);
        self
    }

    #[must_use]
    pub fn get(&self, key: ParamKey) -> Option<&ParamValue> {
        self.0.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamKey, &ParamValue)> {
        self.0.iter().map(|(key, value)| (*key, value))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for RuleParams {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for RuleParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .iter()
            .map(|(key, value)| format!("{key}:{value}"))
            .collect::<Vec<_>>()
            .join(";");
        f.write_str(&joined)
    }
}
