//! Fiscal calendar: July-to-June fiscal years and comparable prior-year dates.
//!
//! Two weekday-alignment rules live here. [`same_weekday_prior_year`] scans a
//! ±3 day window around the naive one-year-back date and is used for the
//! single-date daily comparison and the fiscal-year-to-date anchor.
//! [`month_comparable_prior_year_date`] computes the weekday offset directly and
//! is used row by row in monthly tables. Both pick the unique matching weekday
//! inside the same seven-day window, so they always agree.

use crate::error::{RevenueDashboardError, Result};
use crate::schema::RevenueRecord;
use crate::utils::{days_inclusive, saturating_ymd, validate_month};
use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Calendar month in which every fiscal year starts.
pub const FISCAL_YEAR_START_MONTH: u32 = 7;

/// A fiscal year running from July 1 of `start_year` to June 30 of the next year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FiscalYear {
    start_year: i32,
}

impl FiscalYear {
    pub fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    pub fn containing(date: NaiveDate) -> Self {
        if date.month() >= FISCAL_YEAR_START_MONTH {
            Self::new(date.year())
        } else {
            Self::new(date.year() - 1)
        }
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.start_year, self.start_year + 1)
    }

    pub fn start(&self) -> NaiveDate {
        saturating_ymd(self.start_year, FISCAL_YEAR_START_MONTH, 1)
    }

    pub fn end(&self) -> NaiveDate {
        saturating_ymd(self.start_year + 1, FISCAL_YEAR_START_MONTH - 1, 30)
    }

    pub fn previous(&self) -> Self {
        Self::new(self.start_year - 1)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start() && date <= self.end()
    }

    /// 365, or 366 when the fiscal year holds a February 29.
    pub fn length_days(&self) -> i64 {
        days_inclusive(self.start(), self.end())
    }

    /// Bounds capped at `reference`, for a fiscal year that is still open.
    pub fn bounds_as_of(&self, reference: NaiveDate) -> (NaiveDate, NaiveDate) {
        (self.start(), self.end().min(reference))
    }

    /// Calendar year holding `month` inside this fiscal year.
    pub fn calendar_year_of_month(&self, month: u32) -> Result<i32> {
        validate_month(month)?;
        if month >= FISCAL_YEAR_START_MONTH {
            Ok(self.start_year)
        } else {
            Ok(self.start_year + 1)
        }
    }
}

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start_year, self.start_year + 1)
    }
}

impl FromStr for FiscalYear {
    type Err = RevenueDashboardError;

    fn from_str(label: &str) -> Result<Self> {
        let invalid = || RevenueDashboardError::InvalidFiscalYearLabel(label.to_string());

        let (first, second) = label.trim().split_once('/').ok_or_else(invalid)?;
        let first: i32 = first.trim().parse().map_err(|_| invalid())?;
        let second: i32 = second.trim().parse().map_err(|_| invalid())?;

        if second != first + 1 {
            return Err(invalid());
        }
        Ok(Self::new(first))
    }
}

impl TryFrom<String> for FiscalYear {
    type Error = RevenueDashboardError;

    fn try_from(label: String) -> Result<Self> {
        label.parse()
    }
}

impl From<FiscalYear> for String {
    fn from(fiscal_year: FiscalYear) -> Self {
        fiscal_year.label()
    }
}

pub fn fiscal_year_label(date: NaiveDate) -> String {
    FiscalYear::containing(date).label()
}

/// `(July 1 of the first year, June 30 of the second year)` for a `"Y/Y+1"` label.
pub fn fiscal_year_bounds(label: &str) -> Result<(NaiveDate, NaiveDate)> {
    let fiscal_year: FiscalYear = label.parse()?;
    Ok((fiscal_year.start(), fiscal_year.end()))
}

/// Same as [`fiscal_year_bounds`], with the end capped at `reference`.
pub fn fiscal_year_bounds_as_of(label: &str, reference: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let fiscal_year: FiscalYear = label.parse()?;
    Ok(fiscal_year.bounds_as_of(reference))
}

/// 0-based position of a calendar month in the fiscal year (July = 0, June = 11).
pub fn fiscal_month_index(calendar_month: u32) -> usize {
    let month = calendar_month.clamp(1, 12);
    ((month + 12 - FISCAL_YEAR_START_MONTH) % 12) as usize
}

/// Resolves a fiscal year label and a calendar month to `(calendar_year, month)`.
pub fn fiscal_month_calendar(label: &str, month: u32) -> Result<(i32, u32)> {
    let fiscal_year: FiscalYear = label.parse()?;
    Ok((fiscal_year.calendar_year_of_month(month)?, month))
}

/// The same calendar date one year earlier; February 29 falls back to February 28.
pub fn naive_prior_year(date: NaiveDate) -> NaiveDate {
    saturating_ymd(date.year() - 1, date.month(), date.day())
}

fn shift_days(date: NaiveDate, delta: i64) -> Option<NaiveDate> {
    if delta >= 0 {
        date.checked_add_days(Days::new(delta.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(delta.unsigned_abs()))
    }
}

/// Date one year earlier falling on the same weekday, searched within ±3 days of
/// the naive prior-year date. Falls back to the naive date if nothing matches.
pub fn same_weekday_prior_year(date: NaiveDate) -> NaiveDate {
    let naive = naive_prior_year(date);

    (-3..=3)
        .filter_map(|delta| shift_days(naive, delta))
        .find(|candidate| candidate.weekday() == date.weekday())
        .unwrap_or(naive)
}

/// Per-day alignment used by monthly tables.
///
/// With `diff = (current_weekday - reference_weekday) mod 7`, the reference date
/// moves forward by `diff` days when `diff <= 3` and backward by `7 - diff` days
/// otherwise. A forward shift of 3 always wins over a backward shift of 4.
pub fn aligned_prior_year_date(current: NaiveDate) -> NaiveDate {
    let reference = naive_prior_year(current);
    let shift = weekday_shift(current.weekday(), reference.weekday());
    shift_days(reference, shift).unwrap_or(reference)
}

/// Signed day shift moving a `reference` weekday onto the `current` weekday.
pub fn weekday_shift(current: Weekday, reference: Weekday) -> i64 {
    let current = current.num_days_from_monday() as i64;
    let reference = reference.num_days_from_monday() as i64;
    let diff = (current - reference).rem_euclid(7);

    if diff <= 3 {
        diff
    } else {
        diff - 7
    }
}

pub fn month_comparable_prior_year_date(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    let current = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or(RevenueDashboardError::InvalidDate { year, month, day })?;
    Ok(aligned_prior_year_date(current))
}

/// Fiscal years with at least one record, oldest first.
pub fn available_fiscal_years(records: &[RevenueRecord]) -> Vec<FiscalYear> {
    records
        .iter()
        .map(|record| FiscalYear::containing(record.date))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
