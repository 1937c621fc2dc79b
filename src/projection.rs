//! Year-end run-rate projection and objective tracking.
//!
//! The projection is linear: revenue per worked day so far, times the number of
//! worked days the rest of the fiscal year should hold at the current working
//! rhythm.

use crate::aggregate::Aggregator;
use crate::fiscal::FiscalYear;
use crate::schema::{DashboardConfig, RevenueRecord};
use crate::utils::{days_in_month, days_inclusive, first_of_month, last_day_of_month, saturating_ymd};
use chrono::{Datelike, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub ytd_revenue: f64,
    pub worked_days_elapsed: usize,
    pub calendar_days_elapsed: i64,
    pub fiscal_year_total_days: i64,
    pub run_rate: f64,
    pub worked_day_ratio: f64,
    pub remaining_calendar_days: i64,
    pub estimated_remaining_worked_days: i64,
    pub projected_total: f64,
}

pub fn project_year_end(
    ytd_revenue: f64,
    worked_days_elapsed: usize,
    calendar_days_elapsed: i64,
    fiscal_year_total_days: i64,
) -> Projection {
    let run_rate = if worked_days_elapsed == 0 {
        0.0
    } else {
        ytd_revenue / worked_days_elapsed as f64
    };

    let worked_day_ratio = if calendar_days_elapsed <= 0 {
        0.0
    } else {
        worked_days_elapsed as f64 / calendar_days_elapsed as f64
    };

    let remaining_calendar_days = (fiscal_year_total_days - calendar_days_elapsed).max(0);
    let estimated_remaining_worked_days =
        (remaining_calendar_days as f64 * worked_day_ratio).floor() as i64;

    Projection {
        ytd_revenue,
        worked_days_elapsed,
        calendar_days_elapsed,
        fiscal_year_total_days,
        run_rate,
        worked_day_ratio,
        remaining_calendar_days,
        estimated_remaining_worked_days,
        projected_total: ytd_revenue + run_rate * estimated_remaining_worked_days as f64,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetComparison {
    pub target: f64,
    pub projected_total: f64,
    /// Positive when the projection beats the target, negative for a deficit.
    pub surplus: f64,
    /// Projection as a percentage of the target; zero for a zero target.
    pub percent_of_target: f64,
}

pub fn compare_to_target(projected_total: f64, target: f64) -> TargetComparison {
    TargetComparison {
        target,
        projected_total,
        surplus: projected_total - target,
        percent_of_target: if target == 0.0 {
            0.0
        } else {
            projected_total / target * 100.0
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProratedObjective {
    pub prior_month_total: f64,
    pub growth_factor: f64,
    pub monthly_objective: f64,
    pub elapsed_days: u32,
    pub days_in_month: u32,
    pub prorated_objective: f64,
    pub month_to_date: f64,
    pub progress_percent: f64,
}

/// Prior-year month total grown by `growth_factor`, scaled to the elapsed part
/// of the month.
pub fn prorated_monthly_objective(
    prior_month_total: f64,
    growth_factor: f64,
    elapsed_days: u32,
    days_in_month: u32,
    month_to_date: f64,
) -> ProratedObjective {
    let monthly_objective = prior_month_total * (1.0 + growth_factor);
    let prorated_objective = if days_in_month == 0 {
        0.0
    } else {
        monthly_objective * elapsed_days as f64 / days_in_month as f64
    };
    let progress_percent = if prorated_objective == 0.0 {
        0.0
    } else {
        month_to_date / prorated_objective * 100.0
    };

    ProratedObjective {
        prior_month_total,
        growth_factor,
        monthly_objective,
        elapsed_days,
        days_in_month,
        prorated_objective,
        month_to_date,
        progress_percent,
    }
}

/// How far month-to-date revenue is from the whole prior-year month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthGap {
    pub prior_month_total: f64,
    pub month_to_date: f64,
    /// Still needed to match the prior-year month; zero once it is beaten.
    pub remaining: f64,
    /// Amount by which the prior-year month is already beaten.
    pub surplus: f64,
}

impl MonthGap {
    pub fn new(prior_month_total: f64, month_to_date: f64) -> Self {
        let gap = prior_month_total - month_to_date;
        Self {
            prior_month_total,
            month_to_date,
            remaining: gap.max(0.0),
            surplus: (-gap).max(0.0),
        }
    }

    pub fn is_reached(&self) -> bool {
        self.remaining <= 0.0
    }
}

pub struct ProjectionEngine<'a> {
    aggregator: Aggregator<'a>,
}

impl<'a> ProjectionEngine<'a> {
    pub fn new(records: &'a [RevenueRecord]) -> Self {
        Self {
            aggregator: Aggregator::new(records),
        }
    }

    /// Year-end projection for the fiscal year containing `reference`.
    pub fn fiscal_year(&self, reference: NaiveDate) -> Projection {
        let fiscal_year = FiscalYear::containing(reference);
        let start = fiscal_year.start();

        let ytd = self.aggregator.range(start, reference);
        let worked = self.aggregator.worked_days(start, reference);
        let elapsed = days_inclusive(start, reference);

        let projection = project_year_end(ytd.sum_amount, worked, elapsed, fiscal_year.length_days());
        debug!(
            "Projection for {}: run rate {:.2} over {} worked days, projected {:.2}",
            fiscal_year, projection.run_rate, worked, projection.projected_total
        );
        projection
    }

    /// The fixed target when configured, otherwise the prior fiscal year's total
    /// grown by `annual_growth_factor`.
    pub fn annual_target(&self, reference: NaiveDate, config: &DashboardConfig) -> f64 {
        config.annual_target.unwrap_or_else(|| {
            let prior = FiscalYear::containing(reference).previous();
            let prior_total = self.aggregator.range(prior.start(), prior.end()).sum_amount;
            prior_total * (1.0 + config.annual_growth_factor)
        })
    }

    pub fn target(&self, reference: NaiveDate, config: &DashboardConfig) -> TargetComparison {
        let projection = self.fiscal_year(reference);
        compare_to_target(projection.projected_total, self.annual_target(reference, config))
    }

    fn prior_year_month_total(&self, reference: NaiveDate) -> f64 {
        let prior_year = reference.year() - 1;
        let start = saturating_ymd(prior_year, reference.month(), 1);
        let end = last_day_of_month(prior_year, reference.month());
        self.aggregator.range(start, end).sum_amount
    }

    fn month_to_date(&self, reference: NaiveDate) -> f64 {
        self.aggregator.range(first_of_month(reference), reference).sum_amount
    }

    pub fn monthly_objective(&self, reference: NaiveDate, growth_factor: f64) -> ProratedObjective {
        prorated_monthly_objective(
            self.prior_year_month_total(reference),
            growth_factor,
            reference.day(),
            days_in_month(reference.year(), reference.month()),
            self.month_to_date(reference),
        )
    }

    pub fn month_gap(&self, reference: NaiveDate) -> MonthGap {
        MonthGap::new(
            self.prior_year_month_total(reference),
            self.month_to_date(reference),
        )
    }
}
