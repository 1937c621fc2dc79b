//! Record store boundary: the read/upsert contract, two reference stores, and
//! the snapshot cache that sits in front of them.

use crate::error::{RevenueDashboardError, Result};
use crate::ingestion::{parse_date, ColumnLayout, NormalizationReport, Normalizer, RawRow};
use crate::schema::RevenueRecord;
use crate::utils::{month_name, weekday_name};
use chrono::{Datelike, NaiveDate};
use csv::{ReaderBuilder, WriterBuilder};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Header written to new CSV stores, mirroring the revenue sheet.
pub const STORE_HEADERS: [&str; 7] = ["key", "year", "date", "weekday", "month", "amount", "headcount"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Deleted,
    /// Zero amount for a date with no record: nothing to delete.
    Unchanged,
}

pub trait RecordStore {
    fn read_rows(&self) -> Result<Vec<RawRow>>;

    /// Sole mutation path. An existing record is deleted when `amount` is zero
    /// and updated in place otherwise; a missing record is appended unless
    /// `amount` is zero, which is a no-op.
    fn upsert_or_delete(&mut self, date: NaiveDate, amount: f64, headcount: u32) -> Result<UpsertOutcome>;
}

fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(RevenueDashboardError::InvalidAmount(amount));
    }
    Ok(())
}

/// Decides the upsert outcome from whether the date exists and the amount.
fn plan_upsert(exists: bool, amount: f64) -> UpsertOutcome {
    match (exists, amount == 0.0) {
        (true, true) => UpsertOutcome::Deleted,
        (true, false) => UpsertOutcome::Updated,
        (false, true) => UpsertOutcome::Unchanged,
        (false, false) => UpsertOutcome::Inserted,
    }
}

/// In-process store, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<RevenueRecord>,
}

impl MemoryStore {
    pub fn new(records: Vec<RevenueRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[RevenueRecord] {
        &self.records
    }
}

impl RecordStore for MemoryStore {
    fn read_rows(&self) -> Result<Vec<RawRow>> {
        Ok(self
            .records
            .iter()
            .map(|r| RawRow {
                date: Some(r.date.format("%Y-%m-%d").to_string()),
                amount: Some(r.amount.to_string()),
                headcount: Some(r.headcount.to_string()),
            })
            .collect())
    }

    fn upsert_or_delete(&mut self, date: NaiveDate, amount: f64, headcount: u32) -> Result<UpsertOutcome> {
        validate_amount(amount)?;
        let position = self.records.iter().position(|r| r.date == date);
        let outcome = plan_upsert(position.is_some(), amount);

        match (outcome, position) {
            (UpsertOutcome::Deleted, Some(idx)) => {
                self.records.remove(idx);
            }
            (UpsertOutcome::Updated, Some(idx)) => {
                self.records[idx].amount = amount;
                self.records[idx].headcount = headcount;
            }
            (UpsertOutcome::Inserted, _) => {
                self.records.push(RevenueRecord::new(date, amount, headcount));
            }
            _ => {}
        }

        Ok(outcome)
    }
}

/// Spreadsheet-shaped CSV file. Columns are found by header name and fall
/// back to the sheet positions; a sheet without a header line is read
/// positionally from its first line.
#[derive(Debug, Clone)]
pub struct CsvFileStore {
    path: PathBuf,
}

/// Cells of a sheet. `headers` is `None` for a headerless sheet.
struct SheetTable {
    headers: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
}

impl SheetTable {
    fn empty() -> Self {
        Self {
            headers: Some(STORE_HEADERS.iter().map(|h| h.to_string()).collect()),
            rows: Vec::new(),
        }
    }

    fn layout(&self) -> ColumnLayout {
        match &self.headers {
            Some(headers) => ColumnLayout::resolve(headers),
            None => ColumnLayout::default(),
        }
    }

    /// Header names used to derive the informational cells of a new row.
    fn column_names(&self) -> Vec<String> {
        match &self.headers {
            Some(headers) => headers.clone(),
            None => STORE_HEADERS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

/// A first line with no recognizable header but a readable date in the
/// positional date column is data, not a header.
fn is_data_line(cells: &[String]) -> bool {
    ColumnLayout::from_headers(cells).is_none()
        && ColumnLayout::default()
            .extract(cells)
            .date
            .as_deref()
            .and_then(parse_date)
            .is_some()
}

impl CsvFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> Result<SheetTable> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;

        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }

        let headers = match rows.first() {
            None => return Ok(SheetTable::empty()),
            Some(first) if is_data_line(first) => {
                debug!("{} has no header line, reading positionally", self.path.display());
                None
            }
            Some(_) => Some(rows.remove(0)),
        };
        Ok(SheetTable { headers, rows })
    }

    fn write_table(&self, table: &SheetTable) -> Result<()> {
        let mut writer = WriterBuilder::new().flexible(true).from_path(&self.path)?;
        if let Some(headers) = &table.headers {
            writer.write_record(headers)?;
        }
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn new_row(names: &[String], layout: &ColumnLayout, date: NaiveDate) -> Vec<String> {
        let mut row: Vec<String> = names
            .iter()
            .map(|name| derived_cell(name, date).unwrap_or_default())
            .collect();
        set_cell(&mut row, layout.date, date.format("%Y-%m-%d").to_string());
        row
    }
}

/// Values of the informational sheet columns, recomputed from the date.
fn derived_cell(header: &str, date: NaiveDate) -> Option<String> {
    match header.trim().to_lowercase().as_str() {
        "key" | "clé" | "cle" => Some(format!("{}|{}", date.year(), date.format("%Y-%m-%d"))),
        "year" | "année" | "annee" => Some(date.year().to_string()),
        "weekday" | "jour" => Some(weekday_name(date.weekday()).to_string()),
        "month" | "mois" => Some(month_name(date.month()).to_string()),
        _ => None,
    }
}

fn set_cell(row: &mut Vec<String>, idx: usize, value: String) {
    if row.len() <= idx {
        row.resize(idx + 1, String::new());
    }
    row[idx] = value;
}

impl RecordStore for CsvFileStore {
    fn read_rows(&self) -> Result<Vec<RawRow>> {
        let table = self.read_table()?;
        let layout = table.layout();
        debug!("Reading {} with layout {:?}", self.path.display(), layout);
        Ok(table.rows.iter().map(|row| layout.extract(row)).collect())
    }

    fn upsert_or_delete(&mut self, date: NaiveDate, amount: f64, headcount: u32) -> Result<UpsertOutcome> {
        validate_amount(amount)?;

        let mut table = if self.path.exists() {
            self.read_table()?
        } else {
            SheetTable::empty()
        };
        let layout = table.layout();

        let position = table.rows.iter().position(|row| {
            row.get(layout.date)
                .and_then(|cell| parse_date(cell))
                .is_some_and(|d| d == date)
        });
        let outcome = plan_upsert(position.is_some(), amount);

        match (outcome, position) {
            (UpsertOutcome::Unchanged, _) => return Ok(outcome),
            (UpsertOutcome::Deleted, Some(idx)) => {
                table.rows.remove(idx);
            }
            (UpsertOutcome::Updated, Some(idx)) => {
                let row = &mut table.rows[idx];
                set_cell(row, layout.amount, amount.to_string());
                if let Some(col) = layout.headcount {
                    set_cell(row, col, headcount.to_string());
                }
            }
            _ => {
                let mut row = Self::new_row(&table.column_names(), &layout, date);
                set_cell(&mut row, layout.amount, amount.to_string());
                if let Some(col) = layout.headcount {
                    set_cell(&mut row, col, headcount.to_string());
                }
                table.rows.push(row);
            }
        }

        self.write_table(&table)?;
        info!("{:?} record for {} in {}", outcome, date, self.path.display());
        Ok(outcome)
    }
}

/// Normalized records read from a store at one point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub records: Vec<RevenueRecord>,
    pub report: NormalizationReport,
    /// `false` when the store could not be read; `records` is then empty.
    pub available: bool,
}

impl Snapshot {
    pub fn unavailable() -> Self {
        Self::default()
    }
}

/// Reads and normalizes the store. A store failure is logged and turned into
/// an empty, unavailable snapshot.
pub fn load_snapshot<S: RecordStore + ?Sized>(store: &S, normalizer: &Normalizer) -> Snapshot {
    match store.read_rows() {
        Ok(rows) => {
            let batch = normalizer.normalize(&rows);
            Snapshot {
                records: batch.records,
                report: batch.report,
                available: true,
            }
        }
        Err(e) => {
            warn!("Record store unavailable, continuing without data: {}", e);
            Snapshot::unavailable()
        }
    }
}

struct CachedSnapshot {
    loaded_at: Instant,
    snapshot: Snapshot,
}

/// Holds the last snapshot for `ttl`. Callers pass the current instant and
/// call [`SnapshotCache::invalidate`] after every write.
pub struct SnapshotCache {
    ttl: Duration,
    entry: Option<CachedSnapshot>,
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Unavailable snapshots are never fresh, so the next call retries the store.
    pub fn is_fresh(&self, now: Instant) -> bool {
        self.entry.as_ref().is_some_and(|entry| {
            entry.snapshot.available && now.saturating_duration_since(entry.loaded_at) < self.ttl
        })
    }

    pub fn get_or_load<F>(&mut self, now: Instant, load: F) -> &Snapshot
    where
        F: FnOnce() -> Snapshot,
    {
        if !self.is_fresh(now) {
            debug!("Snapshot cache miss, reloading");
            self.entry = None;
        }

        &self
            .entry
            .get_or_insert_with(|| CachedSnapshot {
                loaded_at: now,
                snapshot: load(),
            })
            .snapshot
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
