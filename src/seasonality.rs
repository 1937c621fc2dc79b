//! Observed seasonality: how a fiscal year's revenue spreads over its twelve
//! months (July first) and how revenue spreads over the week.

use crate::aggregate::{weekday_from_index, Aggregator};
use crate::fiscal::{fiscal_month_index, FiscalYear};
use crate::schema::RevenueRecord;
use crate::utils::weekday_name;
use chrono::Datelike;
use serde::{Deserialize, Serialize};

pub const MONTHS_PER_FISCAL_YEAR: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiscalYearProfile {
    pub fiscal_year: FiscalYear,
    pub total: f64,
    /// Month totals, index 0 is July.
    pub monthly_totals: Vec<f64>,
    /// `monthly_totals` as fractions of `total`. All zero for an empty year.
    pub shares: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayStat {
    pub weekday: String,
    pub total: f64,
    pub records: usize,
    pub mean: f64,
}

/// Month totals of one fiscal year, in fiscal order.
pub fn fiscal_month_totals(records: &[RevenueRecord], fiscal_year: FiscalYear) -> Vec<f64> {
    let mut totals = vec![0.0; MONTHS_PER_FISCAL_YEAR];
    let in_year = Aggregator::new(records)
        .group_by(|r| fiscal_year.contains(r.date).then(|| fiscal_month_index(r.date.month())));

    for (index, aggregate) in in_year {
        if let Some(index) = index {
            totals[index] = aggregate.sum_amount;
        }
    }
    totals
}

pub fn normalize_weights(weights: &[f64]) -> Vec<f64> {
    let sum: f64 = weights.iter().sum();
    if sum == 0.0 {
        return vec![0.0; weights.len()];
    }
    weights.iter().map(|w| w / sum).collect()
}

pub fn fiscal_year_profile(records: &[RevenueRecord], fiscal_year: FiscalYear) -> FiscalYearProfile {
    let monthly_totals = fiscal_month_totals(records, fiscal_year);
    FiscalYearProfile {
        fiscal_year,
        total: monthly_totals.iter().sum(),
        shares: normalize_weights(&monthly_totals),
        monthly_totals,
    }
}

/// Mean monthly share over every fiscal year with revenue, renormalized.
/// All zero when no year has revenue.
pub fn average_profile(records: &[RevenueRecord]) -> Vec<f64> {
    let profiles: Vec<FiscalYearProfile> = Aggregator::new(records)
        .by_fiscal_year()
        .into_keys()
        .map(|fy| fiscal_year_profile(records, fy))
        .filter(|p| p.total > 0.0)
        .collect();

    let mut summed = vec![0.0; MONTHS_PER_FISCAL_YEAR];
    for profile in &profiles {
        for (acc, share) in summed.iter_mut().zip(&profile.shares) {
            *acc += share;
        }
    }
    normalize_weights(&summed)
}

/// Totals and per-record means for each weekday present, Monday first.
pub fn weekday_profile(records: &[RevenueRecord]) -> Vec<WeekdayStat> {
    Aggregator::new(records)
        .by_weekday()
        .into_iter()
        .map(|(index, aggregate)| WeekdayStat {
            weekday: weekday_name(weekday_from_index(index)).to_string(),
            total: aggregate.sum_amount,
            records: aggregate.count,
            mean: aggregate.mean(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> Vec<RevenueRecord> {
        vec![
            RevenueRecord::new(date(2023, 7, 3), 100.0, 2),
            RevenueRecord::new(date(2023, 12, 4), 100.0, 2),
            RevenueRecord::new(date(2024, 6, 3), 200.0, 2),
            RevenueRecord::new(date(2024, 7, 1), 300.0, 2),
            RevenueRecord::new(date(2024, 7, 2), 100.0, 2),
        ]
    }

    #[test]
    fn test_fiscal_month_totals_start_in_july() {
        let totals = fiscal_month_totals(&sample(), FiscalYear::new(2023));
        assert_eq!(totals.len(), 12);
        assert_eq!(totals[0], 100.0);
        assert_eq!(totals[5], 100.0);
        assert_eq!(totals[11], 200.0);
        assert_eq!(totals.iter().sum::<f64>(), 400.0);
    }

    #[test]
    fn test_profile_shares_sum_to_one() {
        let profile = fiscal_year_profile(&sample(), FiscalYear::new(2023));
        assert_eq!(profile.total, 400.0);
        let sum: f64 = profile.shares.iter().sum();
        assert!((sum - 1.0).abs() < 1e-10);
        assert!((profile.shares[11] - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_empty_year_has_zero_shares() {
        let profile = fiscal_year_profile(&sample(), FiscalYear::new(2019));
        assert_eq!(profile.total, 0.0);
        assert!(profile.shares.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_average_profile() {
        // 2023/2024: July 0.25, December 0.25, June 0.5. 2024/2025: July 1.0.
        let average = average_profile(&sample());
        assert!((average[0] - 0.625).abs() < 1e-10);
        assert!((average[5] - 0.125).abs() < 1e-10);
        assert!((average[11] - 0.25).abs() < 1e-10);
        assert!(average_profile(&[]).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_weekday_profile() {
        let stats = weekday_profile(&sample());
        assert_eq!(stats[0].weekday, "Monday");
        assert_eq!(stats[0].records, 4);
        assert_eq!(stats[0].total, 700.0);
        assert_eq!(stats[0].mean, 175.0);
        assert_eq!(stats[1].weekday, "Tuesday");
        assert_eq!(stats[1].total, 100.0);
    }
}
