//! Turns loosely-typed store rows into [`RevenueRecord`]s.
//!
//! Every field fails closed on its own: a row with an unreadable date is
//! dropped, an unreadable amount or headcount becomes zero. Nothing here
//! returns an error.

use crate::schema::{DashboardConfig, RevenueRecord};
use chrono::{Days, NaiveDate, NaiveDateTime};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// Two-digit years first: `%Y` would also accept "24" as the year 24.
const DAY_FIRST_FORMATS: [&str; 5] = ["%d/%m/%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d %m %Y"];
const ISO_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
const ISO_DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const FREE_TEXT_FORMATS: [&str; 4] = ["%d %B %Y", "%d %b %Y", "%B %d, %Y", "%b %d, %Y"];

/// Spreadsheet serial day numbers are counted from this date.
const SPREADSHEET_EPOCH: (i32, u32, u32) = (1899, 12, 30);
/// Serial numbers accepted as dates (1950-01-01 to 2099-12-31).
const SPREADSHEET_SERIAL_RANGE: std::ops::RangeInclusive<u64> = 18_264..=73_050;

const DATE_ALIASES: [&str; 2] = ["date", "day"];
const AMOUNT_ALIASES: [&str; 6] = ["amount", "valeur", "montant", "value", "revenue", "ca"];
const HEADCOUNT_ALIASES: [&str; 5] = ["headcount", "nb_collaborateurs", "nb_collab", "staff", "collaborateurs"];

/// A row as read from the store, before any typing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    pub date: Option<String>,
    pub amount: Option<String>,
    pub headcount: Option<String>,
}

impl RawRow {
    pub fn new(date: &str, amount: &str, headcount: &str) -> Self {
        Self {
            date: Some(date.to_string()),
            amount: Some(amount.to_string()),
            headcount: Some(headcount.to_string()),
        }
    }
}

/// Column positions of the three fields inside a store row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub date: usize,
    pub amount: usize,
    pub headcount: Option<usize>,
}

impl Default for ColumnLayout {
    /// Positional layout of the revenue sheet:
    /// `key, year, date, weekday, month, amount, headcount`.
    fn default() -> Self {
        Self {
            date: 2,
            amount: 5,
            headcount: Some(6),
        }
    }
}

impl ColumnLayout {
    /// Locates columns by header name. `None` when date or amount is missing.
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Option<Self> {
        let position = |aliases: &[&str]| {
            headers.iter().position(|header| {
                let header = header.as_ref().trim().to_lowercase();
                aliases.iter().any(|alias| header == *alias)
            })
        };

        Some(Self {
            date: position(&DATE_ALIASES)?,
            amount: position(&AMOUNT_ALIASES)?,
            headcount: position(&HEADCOUNT_ALIASES),
        })
    }

    /// Header names when they can be recognized, positional defaults otherwise.
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Self {
        Self::from_headers(headers).unwrap_or_else(|| {
            debug!("No recognizable headers, falling back to positional columns");
            Self::default()
        })
    }

    pub fn extract<S: AsRef<str>>(&self, cells: &[S]) -> RawRow {
        let cell = |idx: usize| {
            cells
                .get(idx)
                .map(|c| c.as_ref().trim())
                .filter(|c| !c.is_empty())
                .map(str::to_string)
        };

        RawRow {
            date: cell(self.date),
            amount: cell(self.amount),
            headcount: self.headcount.and_then(cell),
        }
    }
}

/// Diagnostics for one normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationReport {
    pub rows_read: usize,
    pub invalid_dates: usize,
    pub zero_amounts: usize,
    pub rows_retained: usize,
    pub amount_parse_failures: usize,
    pub duplicate_dates: usize,
    pub currency_corrected: bool,
}

#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    pub records: Vec<RevenueRecord>,
    pub report: NormalizationReport,
}

/// Parses a date written day-first, in ISO form, as free text, or as a
/// spreadsheet serial number.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DAY_FIRST_FORMATS
        .iter()
        .chain(ISO_FORMATS.iter())
        .chain(FREE_TEXT_FORMATS.iter())
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            ISO_DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| parse_spreadsheet_serial(raw))
}

fn parse_spreadsheet_serial(raw: &str) -> Option<NaiveDate> {
    let serial: f64 = raw.parse().ok()?;
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }

    let days = serial.trunc() as u64;
    if !SPREADSHEET_SERIAL_RANGE.contains(&days) {
        return None;
    }

    let (y, m, d) = SPREADSHEET_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_days(Days::new(days))
}

/// Parses a monetary amount, or `None` when nothing usable remains.
///
/// Only digits, `,`, `.` and `-` are kept. When both separators appear the last
/// one is the decimal point; a lone comma is a decimal comma.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replace(',', "."),
        _ => cleaned,
    };

    let value: f64 = normalized.parse().ok()?;
    if value.is_finite() && value >= 0.0 {
        Some(value)
    } else {
        None
    }
}

/// Parses a staff count; integral decimals such as `"2.0"` are accepted.
pub fn parse_headcount(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    raw.parse::<u32>().ok().or_else(|| {
        let value: f64 = raw.replace(',', ".").parse().ok()?;
        if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
            Some(value as u32)
        } else {
            None
        }
    })
}

/// Divides every amount by `divisor` when the mean of positive amounts exceeds
/// `threshold`. Returns whether the correction was applied.
pub fn apply_currency_correction(records: &mut [RevenueRecord], threshold: f64, divisor: f64) -> bool {
    let positives: Vec<f64> = records
        .iter()
        .map(|r| r.amount)
        .filter(|amount| *amount > 0.0)
        .collect();

    if positives.is_empty() {
        return false;
    }

    let mean = positives.iter().sum::<f64>() / positives.len() as f64;
    if mean <= threshold {
        return false;
    }

    warn!(
        "Mean positive amount {:.2} exceeds {:.2}; dividing all amounts by {}",
        mean, threshold, divisor
    );
    for record in records.iter_mut() {
        record.amount /= divisor;
    }
    true
}

pub struct Normalizer {
    correction_threshold: f64,
    correction_divisor: f64,
}

impl Normalizer {
    pub fn new(correction_threshold: f64, correction_divisor: f64) -> Self {
        Self {
            correction_threshold,
            correction_divisor,
        }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(
            config.currency_correction_threshold,
            config.currency_correction_divisor,
        )
    }

    pub fn normalize(&self, rows: &[RawRow]) -> NormalizedBatch {
        let mut report = NormalizationReport {
            rows_read: rows.len(),
            ..Default::default()
        };
        let mut records = Vec::with_capacity(rows.len());
        let mut seen = HashSet::new();

        for row in rows {
            let Some(date) = row.date.as_deref().and_then(parse_date) else {
                debug!("Dropping row with unreadable date: {:?}", row.date);
                report.invalid_dates += 1;
                continue;
            };

            let amount = match row.amount.as_deref() {
                Some(raw) => parse_amount(raw).unwrap_or_else(|| {
                    report.amount_parse_failures += 1;
                    0.0
                }),
                None => 0.0,
            };

            let headcount = row
                .headcount
                .as_deref()
                .and_then(parse_headcount)
                .unwrap_or(0);

            if !seen.insert(date) {
                report.duplicate_dates += 1;
            }
            records.push(RevenueRecord::new(date, amount, headcount));
        }

        report.currency_corrected =
            apply_currency_correction(&mut records, self.correction_threshold, self.correction_divisor);
        report.zero_amounts = records.iter().filter(|r| r.amount == 0.0).count();
        report.rows_retained = records.len();

        info!(
            "Normalized {} rows: {} retained, {} invalid dates, {} zero amounts",
            report.rows_read, report.rows_retained, report.invalid_dates, report.zero_amounts
        );
        if report.duplicate_dates > 0 {
            warn!("{} rows share a date with an earlier row", report.duplicate_dates);
        }

        NormalizedBatch { records, report }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::from_config(&DashboardConfig::default())
    }
}
