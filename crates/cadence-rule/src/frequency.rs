use std::str::FromStr;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::RuleError;

/// Base repetition period of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Yearly,
    Monthly,
    Weekly,
    Daily,
    Hourly,
}

impl Frequency {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yearly => "YEARLY",
            Self::Monthly => "MONTHLY",
            Self::Weekly => "WEEKLY",
            Self::Daily => "DAILY",
            Self::Hourly => "HOURLY",
        }
    }

    /// ## Summary
    /// Longest span a single occurrence may cover under this frequency.
    ///
    /// Months and years use their longest calendar length so that a span of
    /// "one whole month" is always accepted.
    #[must_use]
    pub fn nominal_period(self) -> TimeDelta {
        match self {
            Self::Yearly => TimeDelta::days(366),
            Self::Monthly => TimeDelta::days(31),
            Self::Weekly => TimeDelta::weeks(1),
            Self::Daily => TimeDelta::days(1),
            Self::Hourly => TimeDelta::hours(1),
        }
    }

    pub(crate) const fn to_rrule(self) -> rrule::Frequency {
        match self {
            Self::Yearly => rrule::Frequency::Yearly,
            Self::Monthly => rrule::Frequency::Monthly,
            Self::Weekly => rrule::Frequency::Weekly,
            Self::Daily => rrule::Frequency::Daily,
            Self::Hourly => rrule::Frequency::Hourly,
        }
    }
}

impl FromStr for Frequency {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "YEARLY" => Ok(Self::Yearly),
            "MONTHLY" => Ok(Self::Monthly),
            "WEEKLY" => Ok(Self::Weekly),
            "DAILY" => Ok(Self::Daily),
            "HOURLY" => Ok(Self::Hourly),
            _ => Err(RuleError::UnknownFrequency(s.to_string())),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
