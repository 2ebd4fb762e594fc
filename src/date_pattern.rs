//! Recurring calendar date patterns.
//!
//! A [`DatePattern`] is built from three independent parts (year, month, day),
//! each either a concrete number or a wildcard:
//!
//! ```text
//! 2024-03-15   one specific day
//! *-12-31      every New Year's Eve
//! *-*--1       last day of every month (28, 29, 30 or 31)
//! *-2--2       second-to-last day of every February
//! *-*-*        every day
//! ```
//!
//! A negative day counts back from the end of the month under test, so it is
//! resolved against that month's real length, leap years included. Invalid
//! parts are rejected by [`DatePattern::new`]; matching itself never fails.

use chrono::{Datelike, NaiveDate};
use std::fmt;
use thiserror::Error;

/// One part of a date pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DatePart {
    /// `*`: matches any value.
    #[default]
    Any,
    /// A concrete year, month or day. Negative days count from month end.
    Exact(i32),
}

/// Reasons a date pattern part is rejected at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatePatternError {
    #[error("year {0} must not be negative")]
    NegativeYear(i32),

    #[error("month {0} is out of range 1..=12")]
    MonthOutOfRange(i32),

    #[error("day {0} is out of range (1..=31, or -31..=-1 counting back from the end of the month)")]
    DayOutOfRange(i32),
}

/// A predicate over calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatePattern {
    matcher: Matcher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Matcher {
    Parts { year: DatePart, month: DatePart, day: DatePart },
    Never,
}

impl DatePattern {
    /// Build a pattern, validating every concrete part.
    pub fn new(year: DatePart, month: DatePart, day: DatePart) -> Result<Self, DatePatternError> {
        if let DatePart::Exact(y) = year {
            if y < 0 {
                return Err(DatePatternError::NegativeYear(y));
            }
        }
        if let DatePart::Exact(m) = month {
            if !(1..=12).contains(&m) {
                return Err(DatePatternError::MonthOutOfRange(m));
            }
        }
        if let DatePart::Exact(d) = day {
            if d == 0 || !(-31..=31).contains(&d) {
                return Err(DatePatternError::DayOutOfRange(d));
            }
        }
        Ok(DatePattern { matcher: Matcher::Parts { year, month, day } })
    }

    /// Pattern matching every date (`*-*-*`).
    pub fn any() -> Self {
        DatePattern { matcher: Matcher::Parts { year: DatePart::Any, month: DatePart::Any, day: DatePart::Any } }
    }

    /// Pattern matching no date at all. Stands in for unresolvable references.
    pub fn never() -> Self {
        DatePattern { matcher: Matcher::Never }
    }

    /// Does `date` satisfy every concrete part of this pattern?
    pub fn matches(&self, date: NaiveDate) -> bool {
        let Matcher::Parts { year, month, day } = self.matcher else {
            return false;
        };
        if let DatePart::Exact(y) = year {
            if date.year() != y {
                return false;
            }
        }
        if let DatePart::Exact(m) = month {
            if date.month() as i32 != m {
                return false;
            }
        }
        match day {
            DatePart::Any => true,
            DatePart::Exact(d) if d > 0 => date.day() as i32 == d,
            DatePart::Exact(d) => {
                let from_end = date.day() as i32 - days_in_month(date.year(), date.month()) as i32 - 1;
                from_end == d
            }
        }
    }
}

impl fmt::Display for DatePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn part(p: DatePart) -> String {
            match p {
                DatePart::Any => "*".to_string(),
                DatePart::Exact(v) => v.to_string(),
            }
        }
        match self.matcher {
            Matcher::Parts { year, month, day } => write!(f, "{}-{}-{}", part(year), part(month), part(day)),
            Matcher::Never => write!(f, "<never>"),
        }
    }
}

/// Number of days in `month` (1-12) of `year`.
pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).and_then(|d| d.pred_opt()).map_or(31, |d| d.day())
}
