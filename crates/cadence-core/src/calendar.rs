//! Fixed calendar exclusions applied on top of recurrence expansion.
//!
//! An exclusion is a predicate over calendar dates. Expansion drops every
//! candidate instant whose date matches one of the configured exclusions.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// A calendar date that recurrence expansion must skip every year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Exclusion {
    /// A day relative to Western Easter Sunday (`-2` is Good Friday).
    EasterOffset { days: i16 },
    /// A fixed month and day, e.g. 25 December.
    MonthDay { month: u32, day: u32 },
}

impl Exclusion {
    #[must_use]
    pub const fn good_friday() -> Self {
        Self::EasterOffset { days: -2 }
    }

    #[must_use]
    pub const fn christmas_day() -> Self {
        Self::MonthDay { month: 12, day: 25 }
    }

    /// ## Summary
    /// Returns true when `date` falls on this exclusion.
    #[must_use]
    pub fn matches(&self, date: NaiveDate) -> bool {
        match *self {
            Self::EasterOffset { days } => {
                easter_sunday(date.year()).and_then(|easter| offset_date(easter, days))
                    == Some(date)
            }
            Self::MonthDay { month, day } => date.month() == month && date.day() == day,
        }
    }
}

fn offset_date(date: NaiveDate, days: i16) -> Option<NaiveDate> {
    let magnitude = Days::new(u64::from(days.unsigned_abs()));
    if days < 0 {
        date.checked_sub_days(magnitude)
    } else {
        date.checked_add_days(magnitude)
    }
}

/// ## Summary
/// Computes Western (Gregorian) Easter Sunday for `year`.
///
/// Uses the anonymous Gregorian algorithm. Returns `None` for years before
/// the Gregorian reform or outside chrono's range.
#[must_use]
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    if year < 1583 {
        return None;
    }
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = u32::try_from((h + l - 7 * m + 114) / 31).ok()?;
    let day = u32::try_from((h + l - 7 * m + 114) % 31 + 1).ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
