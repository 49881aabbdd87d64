use crate::types::{ReportingPeriod, TripRecord, DATE_COLUMN};
use crate::util::parse_year_month;

/// Pick the reporting month: the latest (year, month) among all rows whose
/// usage date parses. Rows without a usable date are skipped; when none is
/// usable the result is [`ReportingPeriod::UNRESOLVED`].
pub fn resolve(rows: &[TripRecord]) -> ReportingPeriod {
    rows.iter()
        .filter_map(|row| row.get(DATE_COLUMN))
        .filter_map(|date| parse_year_month(date))
        .map(|(year, month)| ReportingPeriod { year, month })
        .max()
        .unwrap_or(ReportingPeriod::UNRESOLVED)
}
