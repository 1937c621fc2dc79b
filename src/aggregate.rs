use crate::fiscal::FiscalYear;
use crate::schema::RevenueRecord;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Totals over the records matching one predicate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub sum_amount: f64,
    pub count: usize,
    pub max_headcount: u32,
}

impl Aggregate {
    fn add(&mut self, record: &RevenueRecord) {
        self.sum_amount += record.amount;
        self.count += 1;
        self.max_headcount = self.max_headcount.max(record.headcount);
    }

    /// Mean amount per matching record; zero for an empty match.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum_amount / self.count as f64
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl<'a> FromIterator<&'a RevenueRecord> for Aggregate {
    fn from_iter<I: IntoIterator<Item = &'a RevenueRecord>>(iter: I) -> Self {
        let mut aggregate = Aggregate::default();
        for record in iter {
            aggregate.add(record);
        }
        aggregate
    }
}

/// Read-only rollups over a record snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    records: &'a [RevenueRecord],
}

impl<'a> Aggregator<'a> {
    pub fn new(records: &'a [RevenueRecord]) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &'a [RevenueRecord] {
        self.records
    }

    pub fn filter<P>(&self, predicate: P) -> Aggregate
    where
        P: Fn(&RevenueRecord) -> bool,
    {
        self.records.iter().filter(|r| predicate(r)).collect()
    }

    /// Records dated within `[start, end]`, both ends inclusive.
    pub fn range(&self, start: NaiveDate, end: NaiveDate) -> Aggregate {
        self.filter(|r| r.date >= start && r.date <= end)
    }

    /// Records for a single date. Duplicate dates are summed and the highest
    /// headcount is kept.
    pub fn on(&self, date: NaiveDate) -> Aggregate {
        self.filter(|r| r.date == date)
    }

    pub fn group_by<K, F>(&self, key: F) -> BTreeMap<K, Aggregate>
    where
        K: Ord,
        F: Fn(&RevenueRecord) -> K,
    {
        let mut groups: BTreeMap<K, Aggregate> = BTreeMap::new();
        for record in self.records {
            groups.entry(key(record)).or_default().add(record);
        }
        groups
    }

    pub fn by_weekday(&self) -> BTreeMap<u32, Aggregate> {
        self.group_by(|r| r.date.weekday().num_days_from_monday())
    }

    pub fn by_fiscal_year(&self) -> BTreeMap<FiscalYear, Aggregate> {
        self.group_by(|r| FiscalYear::containing(r.date))
    }

    /// Grouped by `(year, month)`.
    pub fn by_month(&self) -> BTreeMap<(i32, u32), Aggregate> {
        self.group_by(|r| (r.date.year(), r.date.month()))
    }

    /// Distinct dates in `[start, end]` whose total amount is positive.
    pub fn worked_days(&self, start: NaiveDate, end: NaiveDate) -> usize {
        let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for record in self.records.iter().filter(|r| r.date >= start && r.date <= end) {
            *totals.entry(record.date).or_default() += record.amount;
        }
        totals.values().filter(|total| **total > 0.0).count()
    }

    /// Latest date with a positive amount, or the latest date at all when no
    /// day has revenue. `None` for an empty snapshot.
    pub fn latest_reference_date(&self) -> Option<NaiveDate> {
        self.records
            .iter()
            .filter(|r| r.is_worked())
            .map(|r| r.date)
            .max()
            .or_else(|| self.records.iter().map(|r| r.date).max())
    }

    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.records.iter().map(|r| r.date).collect()
    }
}

pub fn weekday_from_index(index: u32) -> Weekday {
    match index % 7 {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}
