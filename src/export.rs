//! Presentation-ready output: French-style amounts, monthly tables as CSV or
//! as a paginated plain-text report, and raw record dumps.

use crate::engine::{MonthlyTable, MonthlyTableRow};
use crate::error::Result;
use crate::fiscal::fiscal_year_label;
use crate::schema::{DashboardConfig, RevenueRecord};
use crate::utils::{month_name, weekday_name};
use chrono::{Datelike, NaiveDate};
use csv::Writer;
use log::debug;
use num_format::{CustomFormat, Grouping, ToFormattedString};
use std::io::Write;

pub const TABLE_HEADERS: [&str; 7] = [
    "Weekday",
    "Prior date",
    "Date",
    "Prior amount",
    "Prior headcount",
    "Amount",
    "Headcount",
];

pub const RECORD_HEADERS: [&str; 5] = ["date", "weekday", "fiscal_year", "amount", "headcount"];

pub const PAGE_BREAK: char = '\x0c';

/// `1234.56` → `"1 234,56 €"`. Rounded to cents.
pub fn format_amount(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{},{:02} €", sign, group_thousands(cents / 100), cents % 100)
}

fn group_thousands(value: u64) -> String {
    CustomFormat::builder()
        .grouping(Grouping::Standard)
        .separator(" ")
        .build()
        .map(|format| value.to_formatted_string(&format))
        .unwrap_or_else(|_| value.to_string())
}

/// Signed, one decimal: `"+25.0%"`, `"-3.5%"`.
pub fn format_percent(percent: f64) -> String {
    // Avoids "-0.0%".
    let percent = if percent == 0.0 { 0.0 } else { percent };
    format!("{:+.1}%", percent)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Display cells of one table row. Days without revenue show `placeholder`
/// for both the amount and the headcount.
pub fn table_row_cells(row: &MonthlyTableRow, placeholder: &str) -> Vec<String> {
    let amount = |has_revenue: bool, amount: f64| {
        if has_revenue {
            format_amount(amount)
        } else {
            placeholder.to_string()
        }
    };
    let headcount = |has_revenue: bool, headcount: u32| {
        if has_revenue {
            headcount.to_string()
        } else {
            placeholder.to_string()
        }
    };

    vec![
        row.weekday.clone(),
        format_date(row.prior_date),
        format_date(row.current_date),
        amount(row.prior_has_revenue(), row.prior_amount),
        headcount(row.prior_has_revenue(), row.prior_headcount),
        amount(row.current_has_revenue(), row.current_amount),
        headcount(row.current_has_revenue(), row.current_headcount),
    ]
}

pub fn table_title(table: &MonthlyTable) -> String {
    let month = month_name(table.month);
    format!("{} {} vs {} {}", month, table.year, month, table.prior_year())
}

/// Machine-readable table: ISO dates, plain two-decimal amounts, the
/// placeholder on days without revenue, and a closing total row.
pub fn write_monthly_table_csv<W: Write>(table: &MonthlyTable, placeholder: &str, writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(TABLE_HEADERS)?;

    let amount = |has_revenue: bool, value: f64| {
        if has_revenue {
            format!("{:.2}", value)
        } else {
            placeholder.to_string()
        }
    };
    let headcount = |has_revenue: bool, value: u32| {
        if has_revenue {
            value.to_string()
        } else {
            placeholder.to_string()
        }
    };

    for row in &table.rows {
        wtr.write_record([
            row.weekday.clone(),
            row.prior_date.to_string(),
            row.current_date.to_string(),
            amount(row.prior_has_revenue(), row.prior_amount),
            headcount(row.prior_has_revenue(), row.prior_headcount),
            amount(row.current_has_revenue(), row.current_amount),
            headcount(row.current_has_revenue(), row.current_headcount),
        ])?;
    }

    wtr.write_record([
        "Total".to_string(),
        String::new(),
        String::new(),
        format!("{:.2}", table.totals.prior),
        String::new(),
        format!("{:.2}", table.totals.current),
        String::new(),
    ])?;
    wtr.flush()?;
    Ok(())
}

/// Records dated within the optional bounds, sorted by date. Returns the
/// number of records written.
pub fn write_records_csv<W: Write>(
    records: &[RevenueRecord],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    writer: W,
) -> Result<usize> {
    let mut selected: Vec<&RevenueRecord> = records
        .iter()
        .filter(|r| start.map_or(true, |s| r.date >= s) && end.map_or(true, |e| r.date <= e))
        .collect();
    selected.sort_by_key(|r| r.date);

    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(RECORD_HEADERS)?;
    for record in &selected {
        wtr.write_record([
            record.date.to_string(),
            weekday_name(record.date.weekday()).to_string(),
            fiscal_year_label(record.date),
            record.amount.to_string(),
            record.headcount.to_string(),
        ])?;
    }
    wtr.flush()?;

    debug!("Exported {} of {} records", selected.len(), records.len());
    Ok(selected.len())
}

fn render_line(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

/// Plain-text report of a monthly table. Pages hold `rows_per_page` rows,
/// each starts with the column header, and pages are separated by a form feed.
/// Totals follow the last page.
pub fn render_monthly_report(table: &MonthlyTable, config: &DashboardConfig) -> String {
    let headers: Vec<String> = TABLE_HEADERS.iter().map(|h| h.to_string()).collect();
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| table_row_cells(row, &config.missing_value_placeholder))
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header_line = render_line(&headers, &widths);
    let rule = "-".repeat(header_line.chars().count());

    let mut pages: Vec<String> = rows
        .chunks(config.rows_per_page.max(1))
        .map(|chunk| {
            let mut page = vec![header_line.clone(), rule.clone()];
            page.extend(chunk.iter().map(|row| render_line(row, &widths)));
            page.join("\n")
        })
        .collect();
    if pages.is_empty() {
        pages.push(format!("{}\n{}", header_line, rule));
    }

    let month = month_name(table.month);
    let totals = &table.totals;
    let summary = [
        rule.clone(),
        format!("Total {} {}: {}", month, table.prior_year(), format_amount(totals.prior)),
        format!("Total {} {}: {}", month, table.year, format_amount(totals.current)),
        format!(
            "Evolution: {} ({})",
            format_amount(totals.evolution_absolute),
            format_percent(totals.evolution_percent)
        ),
    ]
    .join("\n");

    format!(
        "{}\n\n{}\n{}\n",
        table_title(table),
        pages.join(format!("\n{}\n", PAGE_BREAK).as_str()),
        summary
    )
}
