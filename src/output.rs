use crate::layout::CONFIRMATION_MARK;
use crate::sections::classify_trip;
use crate::types::{
    CsvTable, DailyAggregate, DailySummaryRow, ReportHeader, TripRow, DATE_COLUMN, ENTRY_IC_COLUMN,
    EXIT_IC_COLUMN, FEE_COLUMN, TIME_COLUMN,
};
use crate::util::format_number;
use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    write_bytes(path, s.as_bytes())
}

/// Markdown table of the first `max_rows` CSV rows, columns in file order.
pub fn preview_csv(table: &CsvTable, max_rows: usize) -> String {
    if table.rows.is_empty() {
        return "(no rows)".to_string();
    }
    let mut builder = Builder::default();
    builder.push_record(table.headers.iter().cloned());
    for row in table.rows.iter().take(max_rows) {
        builder.push_record(table.headers.iter().map(|h| row.get(h).cloned().unwrap_or_default()));
    }
    builder.build().with(Style::markdown()).to_string()
}

pub fn daily_summary_rows(aggregates: &[DailyAggregate]) -> Vec<DailySummaryRow> {
    let mark = |present: bool| if present { CONFIRMATION_MARK.to_string() } else { String::new() };
    let amount = |present: bool, total: f64| if present { format_number(total, 0) } else { String::new() };
    aggregates
        .iter()
        .filter(|a| a.has_travel())
        .map(|a| DailySummaryRow {
            day: a.day,
            morning_mark: mark(a.morning_present),
            morning_total: amount(a.morning_present, a.morning_total),
            afternoon_mark: mark(a.afternoon_present),
            afternoon_total: amount(a.afternoon_present, a.afternoon_total),
        })
        .collect()
}

/// Every trip with its direction on the declared route.
pub fn trip_rows(table: &CsvTable, header: &ReportHeader) -> Vec<TripRow> {
    table
        .rows
        .iter()
        .map(|r| {
            let field = |c: &str| r.get(c).cloned().unwrap_or_default();
            TripRow {
                date: field(DATE_COLUMN),
                time: field(TIME_COLUMN),
                entry: field(ENTRY_IC_COLUMN),
                exit: field(EXIT_IC_COLUMN),
                fee: field(FEE_COLUMN),
                direction: classify_trip(r, &header.from_section, &header.to_section).label().to_string(),
            }
        })
        .collect()
}

pub fn render_rows<T>(rows: &[T]) -> String
where
    T: Tabled + Clone,
{
    if rows.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(rows.to_vec()).with(Style::markdown()).to_string()
}
