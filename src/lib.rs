//! # Revenue Dashboard
//!
//! The computation core of a small-business revenue dashboard: daily revenue
//! entries go in, like-for-like comparisons, fiscal-year projections and
//! export-ready tables come out.
//!
//! ## Core Concepts
//!
//! - **Fiscal year**: July 1 to June 30, labeled `"2024/2025"`
//! - **Comparable prior-year date**: the date one year earlier on the same weekday
//! - **Snapshot**: the normalized records read from a store at one point in time
//! - **Worked day**: a date with positive revenue, the unit of the run-rate projection
//! - **Reference date**: every computation takes it explicitly, nothing reads the clock
//!
//! ## Example
//!
//! ```rust,ignore
//! use revenue_dashboard::*;
//! use chrono::NaiveDate;
//! use std::time::Instant;
//!
//! let store = CsvFileStore::new("revenue.csv");
//! let mut dashboard = RevenueDashboard::new(store, DashboardConfig::default())?;
//!
//! let today = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
//! dashboard.record(today, 1250.0, 2)?;
//!
//! // Anchored on the latest day with revenue.
//! let summary = dashboard.summary(Instant::now(), today);
//! println!(
//!     "{}: {} ({})",
//!     summary.fiscal_year,
//!     format_amount(summary.fiscal_year_to_date.result.current),
//!     format_percent(summary.fiscal_year_to_date.result.evolution_percent),
//! );
//! ```

pub mod aggregate;
pub mod engine;
pub mod error;
pub mod export;
pub mod fiscal;
pub mod ingestion;
pub mod projection;
pub mod schema;
pub mod seasonality;
pub mod store;
pub mod utils;

pub use aggregate::{Aggregate, Aggregator};
pub use engine::{
    ComparisonEngine, ComparisonResult, DailyComparison, MonthlyTable, MonthlyTableRow,
    PeriodComparison,
};
pub use error::{Result, RevenueDashboardError};
pub use export::{
    format_amount, format_percent, render_monthly_report, write_monthly_table_csv,
    write_records_csv,
};
pub use fiscal::*;
pub use ingestion::{ColumnLayout, NormalizationReport, Normalizer, RawRow};
pub use projection::{
    MonthGap, ProratedObjective, Projection, ProjectionEngine, TargetComparison,
};
pub use schema::*;
pub use seasonality::{fiscal_year_profile, weekday_profile, FiscalYearProfile, WeekdayStat};
pub use store::{
    load_snapshot, CsvFileStore, MemoryStore, RecordStore, Snapshot, SnapshotCache, UpsertOutcome,
};

use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Everything the home view shows for one reference date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub reference_date: NaiveDate,
    pub fiscal_year: FiscalYear,
    /// `false` when the store could not be read and every figure is zero.
    pub available: bool,
    pub daily: DailyComparison,
    pub month_to_date: PeriodComparison,
    pub fiscal_year_to_date: PeriodComparison,
    pub month_gap: MonthGap,
    pub objective: ProratedObjective,
    pub projection: Projection,
    pub target: TargetComparison,
}

impl DashboardSummary {
    pub fn compute(snapshot: &Snapshot, config: &DashboardConfig, reference: NaiveDate) -> Self {
        let comparisons = ComparisonEngine::new(&snapshot.records);
        let projections = ProjectionEngine::new(&snapshot.records);

        Self {
            reference_date: reference,
            fiscal_year: FiscalYear::containing(reference),
            available: snapshot.available,
            daily: comparisons.daily(reference),
            month_to_date: comparisons.month_to_date(reference),
            fiscal_year_to_date: comparisons.fiscal_year_to_date(reference),
            month_gap: projections.month_gap(reference),
            objective: projections.monthly_objective(reference, config.monthly_growth_factor),
            projection: projections.fiscal_year(reference),
            target: projections.target(reference, config),
        }
    }
}

/// Latest date with revenue in the snapshot, or `today` when there is none.
pub fn default_reference_date(records: &[RevenueRecord], today: NaiveDate) -> NaiveDate {
    Aggregator::new(records)
        .latest_reference_date()
        .unwrap_or(today)
}

/// A store, its normalizer and a snapshot cache wired together. The caller
/// supplies the current instant and the date on every call.
pub struct RevenueDashboard<S: RecordStore> {
    store: S,
    config: DashboardConfig,
    normalizer: Normalizer,
    cache: SnapshotCache,
}

impl<S: RecordStore> RevenueDashboard<S> {
    pub fn new(store: S, config: DashboardConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "Revenue dashboard ready (cache TTL {}s, currency correction above {})",
            config.cache_ttl_secs, config.currency_correction_threshold
        );

        Ok(Self {
            store,
            normalizer: Normalizer::from_config(&config),
            cache: SnapshotCache::new(config.cache_ttl()),
            config,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn snapshot(&mut self, now: Instant) -> &Snapshot {
        let store = &self.store;
        let normalizer = &self.normalizer;
        self.cache.get_or_load(now, || load_snapshot(store, normalizer))
    }

    /// Writes through the store's upsert contract and drops the cached snapshot.
    pub fn record(&mut self, date: NaiveDate, amount: f64, headcount: u32) -> Result<UpsertOutcome> {
        let outcome = self.store.upsert_or_delete(date, amount, headcount)?;
        self.cache.invalidate();
        info!("Recorded {:.2} for {} ({:?})", amount, date, outcome);
        Ok(outcome)
    }

    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    /// Summary anchored on the latest day with revenue, or on `today` when the
    /// snapshot is empty.
    pub fn summary(&mut self, now: Instant, today: NaiveDate) -> DashboardSummary {
        let reference = default_reference_date(&self.snapshot(now).records, today);
        self.summary_at(now, reference)
    }

    /// Summary for an explicit reference date.
    pub fn summary_at(&mut self, now: Instant, reference: NaiveDate) -> DashboardSummary {
        let store = &self.store;
        let normalizer = &self.normalizer;
        let snapshot = self.cache.get_or_load(now, || load_snapshot(store, normalizer));
        DashboardSummary::compute(snapshot, &self.config, reference)
    }

    /// Day-by-day table for `month` of the fiscal year `label`.
    pub fn monthly_table(&mut self, now: Instant, label: &str, month: u32) -> Result<MonthlyTable> {
        let (year, month) = fiscal_month_calendar(label, month)?;
        let snapshot = self.snapshot(now);
        ComparisonEngine::new(&snapshot.records).monthly_table(year, month)
    }

    pub fn monthly_report(&mut self, now: Instant, label: &str, month: u32) -> Result<String> {
        let table = self.monthly_table(now, label, month)?;
        Ok(render_monthly_report(&table, &self.config))
    }

    pub fn available_fiscal_years(&mut self, now: Instant) -> Vec<FiscalYear> {
        available_fiscal_years(&self.snapshot(now).records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dashboard() -> RevenueDashboard<MemoryStore> {
        let store = MemoryStore::new(vec![
            RevenueRecord::new(date(2024, 7, 1), 100.0, 2),
            RevenueRecord::new(date(2023, 7, 1), 80.0, 2),
        ]);
        RevenueDashboard::new(store, DashboardConfig::default()).unwrap()
    }

    #[test]
    fn test_summary_fiscal_year_to_date() {
        let mut dashboard = dashboard();
        let summary = dashboard.summary(Instant::now(), date(2024, 7, 1));

        assert!(summary.available);
        assert_eq!(summary.fiscal_year.label(), "2024/2025");
        let fytd = summary.fiscal_year_to_date.result;
        assert_eq!(fytd.current, 100.0);
        assert_eq!(fytd.prior, 80.0);
        assert_eq!(fytd.evolution_absolute, 20.0);
        assert!((fytd.evolution_percent - 25.0).abs() < 1e-10);
        assert_eq!(format_percent(fytd.evolution_percent), "+25.0%");
    }

    #[test]
    fn test_summary_anchors_on_latest_revenue_day() {
        let store = MemoryStore::new(vec![
            RevenueRecord::new(date(2024, 7, 12), 100.0, 2),
            RevenueRecord::new(date(2023, 7, 14), 80.0, 2),
        ]);
        let mut dashboard = RevenueDashboard::new(store, DashboardConfig::default()).unwrap();
        let now = Instant::now();

        // Nothing was recorded on 2024-07-15.
        let summary = dashboard.summary(now, date(2024, 7, 15));
        assert_eq!(summary.reference_date, date(2024, 7, 12));
        assert_eq!(summary.daily.current_date, date(2024, 7, 12));
        assert_eq!(summary.daily.prior_date, date(2023, 7, 14));
        assert_eq!(summary.daily.result.current, 100.0);
        assert_eq!(summary.daily.result.prior, 80.0);
        assert_eq!(summary.fiscal_year_to_date.result.current, 100.0);
        assert_eq!(summary.fiscal_year_to_date.result.prior, 80.0);

        let explicit = dashboard.summary_at(now, date(2024, 7, 15));
        assert_eq!(explicit.daily.current_date, date(2024, 7, 15));
        assert_eq!(explicit.daily.result.current, 0.0);
    }

    #[test]
    fn test_empty_snapshot_summary_falls_back_to_today() {
        let mut dashboard =
            RevenueDashboard::new(MemoryStore::default(), DashboardConfig::default()).unwrap();
        let summary = dashboard.summary(Instant::now(), date(2024, 7, 15));
        assert_eq!(summary.reference_date, date(2024, 7, 15));
        assert_eq!(summary.daily.result, ComparisonResult::default());
    }

    #[test]
    fn test_record_invalidates_cache() {
        let mut dashboard = dashboard();
        let now = Instant::now();
        assert_eq!(dashboard.snapshot(now).records.len(), 2);

        let outcome = dashboard.record(date(2024, 7, 2), 50.0, 1).unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);
        assert_eq!(dashboard.snapshot(now + Duration::from_secs(1)).records.len(), 3);

        let outcome = dashboard.record(date(2024, 7, 2), 0.0, 0).unwrap();
        assert_eq!(outcome, UpsertOutcome::Deleted);
        assert_eq!(dashboard.snapshot(now + Duration::from_secs(2)).records.len(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DashboardConfig {
            rows_per_page: 0,
            ..Default::default()
        };
        assert!(RevenueDashboard::new(MemoryStore::default(), config).is_err());
    }

    #[test]
    fn test_monthly_table_by_fiscal_label() {
        let mut dashboard = dashboard();
        let table = dashboard.monthly_table(Instant::now(), "2024/2025", 7).unwrap();
        assert_eq!(table.year, 2024);
        assert_eq!(table.rows.len(), 31);
        assert_eq!(table.totals.current, 100.0);
        assert_eq!(table.totals.prior, 80.0);

        let january = dashboard.monthly_table(Instant::now(), "2024/2025", 1).unwrap();
        assert_eq!(january.year, 2025);

        assert!(dashboard.monthly_table(Instant::now(), "2024-2025", 7).is_err());
        assert!(dashboard.monthly_table(Instant::now(), "2024/2025", 13).is_err());
    }

    #[test]
    fn test_default_reference_date() {
        let records = vec![
            RevenueRecord::new(date(2024, 7, 1), 100.0, 2),
            RevenueRecord::new(date(2024, 7, 5), 0.0, 0),
        ];
        let today = date(2024, 7, 10);
        assert_eq!(default_reference_date(&records, today), date(2024, 7, 1));
        assert_eq!(default_reference_date(&[], today), today);
    }
}
