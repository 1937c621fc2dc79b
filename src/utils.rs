use crate::error::{RevenueDashboardError, Result};
use chrono::{Datelike, NaiveDate, Weekday};

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` of `year`. Months outside 1..=12 are clamped.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month.clamp(1, 12) {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Builds a date, clamping the day to the month's length.
/// Returns `None` only when the year is outside chrono's supported range.
pub fn clamped_ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let month = month.clamp(1, 12);
    let day = day.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Like [`clamped_ymd`] but saturates to the representable range instead of failing.
pub fn saturating_ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    clamped_ymd(year, month, day).unwrap_or(if year < 0 {
        NaiveDate::MIN
    } else {
        NaiveDate::MAX
    })
}

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    saturating_ymd(year, month, days_in_month(year, month))
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    saturating_ymd(date.year(), date.month(), 1)
}

/// Inclusive day count between two dates; zero when `end` precedes `start`.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    if end < start {
        0
    } else {
        (end - start).num_days() + 1
    }
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    WEEKDAY_NAMES[weekday.num_days_from_monday() as usize]
}

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES[(month.clamp(1, 12) - 1) as usize]
}

pub fn validate_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(RevenueDashboardError::InvalidMonth(month));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(
            last_day_of_month(2023, 2),
            NaiveDate::from_ymd_opt(2023, 2, 28).unwrap()
        );
        assert_eq!(
            last_day_of_month(2024, 2),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            last_day_of_month(2023, 4),
            NaiveDate::from_ymd_opt(2023, 4, 30).unwrap()
        );
        assert_eq!(
            last_day_of_month(2023, 12),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_leap_years() {
        assert!(is_leap_year(2024));
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert!(!is_leap_year(2023));
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
    }

    #[test]
    fn test_clamped_ymd() {
        assert_eq!(
            clamped_ymd(2023, 2, 29),
            NaiveDate::from_ymd_opt(2023, 2, 28)
        );
        assert_eq!(clamped_ymd(2023, 4, 31), NaiveDate::from_ymd_opt(2023, 4, 30));
        assert_eq!(clamped_ymd(2024, 2, 29), NaiveDate::from_ymd_opt(2024, 2, 29));
    }

    #[test]
    fn test_days_inclusive() {
        let start = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 7, 31).unwrap();
        assert_eq!(days_inclusive(start, end), 31);
        assert_eq!(days_inclusive(start, start), 1);
        assert_eq!(days_inclusive(end, start), 0);
    }

    #[test]
    fn test_names() {
        assert_eq!(weekday_name(Weekday::Mon), "Monday");
        assert_eq!(weekday_name(Weekday::Sun), "Sunday");
        assert_eq!(month_name(7), "July");
        assert!(validate_month(13).is_err());
        assert!(validate_month(0).is_err());
        assert!(validate_month(6).is_ok());
    }
}
