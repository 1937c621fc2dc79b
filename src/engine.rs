use crate::aggregate::Aggregator;
use crate::error::{RevenueDashboardError, Result};
use crate::fiscal::{aligned_prior_year_date, same_weekday_prior_year, FiscalYear};
use crate::schema::RevenueRecord;
use crate::utils::{
    days_in_month, days_inclusive, first_of_month, saturating_ymd, validate_month, weekday_name,
};
use chrono::{Datelike, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};

/// Current value against its comparable prior value.
///
/// `evolution_percent` is `0` whenever `prior` is `0`. A period with nothing to
/// compare against reports no relative change rather than an infinite one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub current: f64,
    pub prior: f64,
    pub evolution_absolute: f64,
    pub evolution_percent: f64,
}

impl ComparisonResult {
    pub fn new(current: f64, prior: f64) -> Self {
        let evolution_absolute = current - prior;
        Self {
            current,
            prior,
            evolution_absolute,
            evolution_percent: evolution_percent(evolution_absolute, prior),
        }
    }
}

pub fn evolution_percent(evolution_absolute: f64, prior: f64) -> f64 {
    if prior == 0.0 {
        0.0
    } else {
        evolution_absolute / prior * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyComparison {
    pub current_date: NaiveDate,
    pub prior_date: NaiveDate,
    pub weekday: String,
    pub current_headcount: u32,
    pub prior_headcount: u32,
    pub result: ComparisonResult,
}

/// A cumulative comparison between two inclusive date ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub current_start: NaiveDate,
    pub current_end: NaiveDate,
    pub prior_start: NaiveDate,
    pub prior_end: NaiveDate,
    /// Calendar days covered by the current range.
    pub current_days: i64,
    /// Calendar days covered by the prior range.
    pub prior_days: i64,
    pub result: ComparisonResult,
}

/// One day of a month-over-prior-year grid. Days without revenue carry `0`;
/// rendering them as a placeholder is left to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTableRow {
    pub weekday: String,
    pub prior_date: NaiveDate,
    pub current_date: NaiveDate,
    pub prior_amount: f64,
    pub prior_headcount: u32,
    pub current_amount: f64,
    pub current_headcount: u32,
}

impl MonthlyTableRow {
    pub fn prior_has_revenue(&self) -> bool {
        self.prior_amount > 0.0
    }

    pub fn current_has_revenue(&self) -> bool {
        self.current_amount > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTable {
    pub year: i32,
    pub month: u32,
    pub rows: Vec<MonthlyTableRow>,
    pub totals: ComparisonResult,
}

impl MonthlyTable {
    pub fn prior_year(&self) -> i32 {
        self.year - 1
    }
}

/// Day, month and fiscal-year comparisons over one snapshot.
pub struct ComparisonEngine<'a> {
    aggregator: Aggregator<'a>,
}

impl<'a> ComparisonEngine<'a> {
    pub fn new(records: &'a [RevenueRecord]) -> Self {
        Self {
            aggregator: Aggregator::new(records),
        }
    }

    pub fn aggregator(&self) -> &Aggregator<'a> {
        &self.aggregator
    }

    /// The latest day with revenue (or the latest day at all when none has
    /// any) against its prior-year weekday. `None` for an empty snapshot.
    pub fn latest_daily(&self) -> Option<DailyComparison> {
        self.aggregator
            .latest_reference_date()
            .map(|latest| self.daily(latest))
    }

    /// `reference` against the same weekday one year earlier.
    pub fn daily(&self, reference: NaiveDate) -> DailyComparison {
        let prior_date = same_weekday_prior_year(reference);
        let current = self.aggregator.on(reference);
        let prior = self.aggregator.on(prior_date);

        debug!(
            "Daily comparison {} vs {}: {:.2} vs {:.2}",
            reference, prior_date, current.sum_amount, prior.sum_amount
        );

        DailyComparison {
            current_date: reference,
            prior_date,
            weekday: weekday_name(reference.weekday()).to_string(),
            current_headcount: current.max_headcount,
            prior_headcount: prior.max_headcount,
            result: ComparisonResult::new(current.sum_amount, prior.sum_amount),
        }
    }

    /// Month-to-date against the same days of the same month one year earlier.
    /// The prior range stops at the prior month's own last day.
    pub fn month_to_date(&self, reference: NaiveDate) -> PeriodComparison {
        let current_start = first_of_month(reference);
        let prior_year = reference.year() - 1;
        let prior_start = saturating_ymd(prior_year, reference.month(), 1);
        let prior_last_day = reference.day().min(days_in_month(prior_year, reference.month()));
        let prior_end = saturating_ymd(prior_year, reference.month(), prior_last_day);

        self.compare_ranges(current_start, reference, prior_start, prior_end)
    }

    /// Fiscal-year-to-date. The prior range ends on the weekday-aligned date
    /// used by [`ComparisonEngine::daily`], not on the calendar anniversary.
    pub fn fiscal_year_to_date(&self, reference: NaiveDate) -> PeriodComparison {
        let fiscal_year = FiscalYear::containing(reference);
        let prior_end = same_weekday_prior_year(reference);

        self.compare_ranges(
            fiscal_year.start(),
            reference,
            fiscal_year.previous().start(),
            prior_end,
        )
    }

    /// Whole-month total against the same month one year earlier, capped at
    /// the prior month's length.
    pub fn full_month(&self, year: i32, month: u32) -> Result<PeriodComparison> {
        validate_month(month)?;
        let last_day = saturating_ymd(year, month, days_in_month(year, month));
        Ok(self.month_to_date(last_day))
    }

    /// Day-by-day grid for one month, each day aligned on its prior-year weekday.
    pub fn monthly_table(&self, year: i32, month: u32) -> Result<MonthlyTable> {
        validate_month(month)?;

        let rows = (1..=days_in_month(year, month))
            .map(|day| {
                let current_date = NaiveDate::from_ymd_opt(year, month, day)
                    .ok_or(RevenueDashboardError::InvalidDate { year, month, day })?;
                let prior_date = aligned_prior_year_date(current_date);

                let current = self.aggregator.on(current_date);
                let prior = self.aggregator.on(prior_date);

                Ok(MonthlyTableRow {
                    weekday: weekday_name(current_date.weekday()).to_string(),
                    prior_date,
                    current_date,
                    prior_amount: prior.sum_amount,
                    prior_headcount: prior.max_headcount,
                    current_amount: current.sum_amount,
                    current_headcount: current.max_headcount,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let totals = self.full_month(year, month)?.result;

        Ok(MonthlyTable {
            year,
            month,
            rows,
            totals,
        })
    }

    fn compare_ranges(
        &self,
        current_start: NaiveDate,
        current_end: NaiveDate,
        prior_start: NaiveDate,
        prior_end: NaiveDate,
    ) -> PeriodComparison {
        let current = self.aggregator.range(current_start, current_end);
        let prior = self.aggregator.range(prior_start, prior_end);

        PeriodComparison {
            current_start,
            current_end,
            prior_start,
            prior_end,
            current_days: days_inclusive(current_start, current_end),
            prior_days: days_inclusive(prior_start, prior_end),
            result: ComparisonResult::new(current.sum_amount, prior.sum_amount),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_evolution_percent_zero_prior() {
        let result = ComparisonResult::new(100.0, 0.0);
        assert_eq!(result.evolution_absolute, 100.0);
        assert_eq!(result.evolution_percent, 0.0);
        assert!(result.evolution_percent.is_finite());

        let result = ComparisonResult::new(0.0, 0.0);
        assert_eq!(result, ComparisonResult::default());
    }

    #[test]
    fn test_evolution_percent() {
        let result = ComparisonResult::new(100.0, 80.0);
        assert_eq!(result.evolution_absolute, 20.0);
        assert!((result.evolution_percent - 25.0).abs() < 1e-9);

        let result = ComparisonResult::new(50.0, 100.0);
        assert!((result.evolution_percent + 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_fiscal_year_to_date_scenario() {
        let records = vec![
            RevenueRecord::new(date(2024, 7, 1), 100.0, 2),
            RevenueRecord::new(date(2023, 7, 1), 80.0, 2),
        ];
        let engine = ComparisonEngine::new(&records);
        let fytd = engine.fiscal_year_to_date(date(2024, 7, 1));

        assert_eq!(fytd.current_start, date(2024, 7, 1));
        assert_eq!(fytd.prior_start, date(2023, 7, 1));
        assert_eq!(fytd.prior_end, same_weekday_prior_year(date(2024, 7, 1)));
        assert_eq!(fytd.result.current, 100.0);
        assert_eq!(fytd.result.prior, 80.0);
        assert_eq!(fytd.result.evolution_absolute, 20.0);
        assert!((fytd.result.evolution_percent - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_daily_uses_weekday_aligned_date() {
        // 2024-03-01 (Fri) compares with 2023-03-03 (Fri).
        let records = vec![
            RevenueRecord::new(date(2024, 3, 1), 120.0, 2),
            RevenueRecord::new(date(2023, 3, 1), 999.0, 2),
            RevenueRecord::new(date(2023, 3, 3), 100.0, 3),
        ];
        let daily = ComparisonEngine::new(&records).daily(date(2024, 3, 1));
        assert_eq!(daily.prior_date, date(2023, 3, 3));
        assert_eq!(daily.weekday, "Friday");
        assert_eq!(daily.result.current, 120.0);
        assert_eq!(daily.result.prior, 100.0);
        assert_eq!(daily.prior_headcount, 3);
        assert!((daily.result.evolution_percent - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_latest_daily_picks_last_day_with_revenue() {
        // 2024-07-12 (Fri) compares with 2023-07-14 (Fri); the later idle day is skipped.
        let records = vec![
            RevenueRecord::new(date(2024, 7, 12), 100.0, 2),
            RevenueRecord::new(date(2024, 7, 13), 0.0, 0),
            RevenueRecord::new(date(2023, 7, 14), 80.0, 1),
        ];
        let daily = ComparisonEngine::new(&records).latest_daily().unwrap();
        assert_eq!(daily.current_date, date(2024, 7, 12));
        assert_eq!(daily.prior_date, date(2023, 7, 14));
        assert_eq!(daily.result.current, 100.0);
        assert_eq!(daily.result.prior, 80.0);

        assert!(ComparisonEngine::new(&[]).latest_daily().is_none());
    }

    #[test]
    fn test_month_to_date_caps_prior_month() {
        // Reference 2024-02-29: the prior range must stop at 2023-02-28.
        let records = vec![
            RevenueRecord::new(date(2024, 2, 1), 10.0, 1),
            RevenueRecord::new(date(2024, 2, 29), 30.0, 1),
            RevenueRecord::new(date(2023, 2, 28), 20.0, 1),
            RevenueRecord::new(date(2023, 3, 1), 500.0, 1),
        ];
        let mtd = ComparisonEngine::new(&records).month_to_date(date(2024, 2, 29));
        assert_eq!(mtd.prior_start, date(2023, 2, 1));
        assert_eq!(mtd.prior_end, date(2023, 2, 28));
        assert_eq!(mtd.current_days, 29);
        assert_eq!(mtd.prior_days, 28);
        assert_eq!(mtd.result.current, 40.0);
        assert_eq!(mtd.result.prior, 20.0);
    }

    #[test]
    fn test_month_to_date_partial_month() {
        let records = vec![
            RevenueRecord::new(date(2024, 10, 3), 100.0, 2),
            RevenueRecord::new(date(2024, 10, 20), 100.0, 2),
            RevenueRecord::new(date(2023, 10, 10), 50.0, 2),
            RevenueRecord::new(date(2023, 10, 16), 70.0, 2),
        ];
        let mtd = ComparisonEngine::new(&records).month_to_date(date(2024, 10, 15));
        assert_eq!(mtd.result.current, 100.0);
        assert_eq!(mtd.result.prior, 50.0);
        assert_eq!(mtd.current_days, 15);
    }

    #[test]
    fn test_empty_snapshot_yields_zeroes() {
        let engine = ComparisonEngine::new(&[]);
        let reference = date(2024, 10, 15);
        assert_eq!(engine.daily(reference).result, ComparisonResult::default());
        assert_eq!(engine.month_to_date(reference).result, ComparisonResult::default());
        assert_eq!(engine.fiscal_year_to_date(reference).result, ComparisonResult::default());

        let table = engine.monthly_table(2024, 10).unwrap();
        assert_eq!(table.rows.len(), 31);
        assert!(table.rows.iter().all(|r| !r.current_has_revenue() && !r.prior_has_revenue()));
        assert_eq!(table.totals, ComparisonResult::default());
    }

    #[test]
    fn test_monthly_table_rows() {
        let records = vec![
            RevenueRecord::new(date(2024, 2, 29), 300.0, 2),
            RevenueRecord::new(date(2023, 3, 2), 250.0, 3),
            RevenueRecord::new(date(2024, 2, 1), 100.0, 2),
            RevenueRecord::new(date(2023, 2, 2), 80.0, 1),
        ];
        let table = ComparisonEngine::new(&records).monthly_table(2024, 2).unwrap();
        assert_eq!(table.rows.len(), 29);
        assert_eq!(table.prior_year(), 2023);

        for row in &table.rows {
            assert_eq!(row.prior_date.weekday(), row.current_date.weekday());
        }

        // 2024-02-01 (Thu) aligns with 2023-02-02 (Thu).
        let first = &table.rows[0];
        assert_eq!(first.weekday, "Thursday");
        assert_eq!(first.prior_date, date(2023, 2, 2));
        assert_eq!(first.current_amount, 100.0);
        assert_eq!(first.prior_amount, 80.0);
        assert_eq!(first.prior_headcount, 1);

        // The leap day aligns with 2023-03-02, outside the prior month.
        let leap = &table.rows[28];
        assert_eq!(leap.current_date.weekday(), Weekday::Thu);
        assert_eq!(leap.prior_date, date(2023, 3, 2));
        assert_eq!(leap.prior_amount, 250.0);
        assert_eq!(leap.current_headcount, 2);

        // Totals compare whole calendar months.
        assert_eq!(table.totals.current, 400.0);
        assert_eq!(table.totals.prior, 80.0);
    }

    #[test]
    fn test_monthly_table_rejects_bad_month() {
        let engine = ComparisonEngine::new(&[]);
        assert!(engine.monthly_table(2024, 13).is_err());
        assert!(engine.full_month(2024, 0).is_err());
    }
}
