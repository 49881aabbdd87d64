use crate::aggregate::aggregate;
use crate::error::ReportError;
use crate::layout::map_to_cells;
use crate::period::resolve;
use crate::sections::{classify_trip, validate_header};
use crate::template::TemplateBook;
use crate::types::{
    CellAssignment, CsvTable, DailyAggregate, ReportHeader, ReportingPeriod, UsageStats, FEE_COLUMN,
};
use crate::util::parse_f64_safe;

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub period: ReportingPeriod,
    pub aggregates: Vec<DailyAggregate>,
    pub cells: Vec<CellAssignment>,
    pub workbook: Vec<u8>,
    pub file_name: String,
}

/// Resolve the period, aggregate the month and lay it out. Pure: the same
/// table and header always give the same cells.
pub fn build_cells(
    table: &CsvTable,
    header: &ReportHeader,
) -> Result<(ReportingPeriod, Vec<DailyAggregate>, Vec<CellAssignment>), ReportError> {
    if table.rows.is_empty() {
        return Err(ReportError::InputAbsent("no parsed rows available".to_string()));
    }
    validate_header(header)?;

    let period = resolve(&table.rows);
    if !period.is_resolved() {
        return Err(ReportError::PeriodUnresolvable);
    }
    log::info!("Reporting period: {}-{:02}", period.year, period.month);

    let aggregates = aggregate(&table.rows, period);
    let travel_days = aggregates.iter().filter(|a| a.has_travel()).count();
    log::info!("{} of {} days have travel", travel_days, aggregates.len());

    let cells = map_to_cells(header, period, &aggregates);
    Ok((period, aggregates, cells))
}

/// Full run: cells computed, written into `template`, workbook serialised.
pub fn generate(
    table: &CsvTable,
    header: &ReportHeader,
    mut template: TemplateBook,
) -> Result<GeneratedReport, ReportError> {
    let (period, aggregates, cells) = build_cells(table, header)?;
    template.apply(&cells)?;
    log::info!("Wrote {} cells into {}", cells.len(), template.sheet_path());
    let workbook = template.to_bytes()?;
    Ok(GeneratedReport {
        period,
        aggregates,
        cells,
        workbook,
        file_name: output_file_name(period, &header.name),
    })
}

/// `{year}_{month}_高速道路利用実績簿（{name}）.xlsx`, with characters that
/// are not allowed in file names replaced.
pub fn output_file_name(period: ReportingPeriod, name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') { '_' } else { c })
        .collect();
    format!("{}_{}_高速道路利用実績簿（{}）.xlsx", period.year, period.month, safe.trim())
}

/// Totals for the month. Certified trips are the rows that ran the declared
/// route in either direction.
pub fn usage_stats(
    table: &CsvTable,
    aggregates: &[DailyAggregate],
    header: &ReportHeader,
    monthly_allowance: f64,
) -> UsageStats {
    let one_way_fee = header.one_way_fee;
    let total_fee = table
        .rows
        .iter()
        .filter_map(|r| parse_f64_safe(r.get(FEE_COLUMN).map(String::as_str)))
        .sum();
    let expected_trips = if one_way_fee > 0.0 && monthly_allowance > 0.0 {
        (monthly_allowance / one_way_fee).floor() as u64
    } else {
        0
    };
    let certified_trips = table
        .rows
        .iter()
        .filter(|r| classify_trip(r, &header.from_section, &header.to_section).is_certified())
        .count();
    UsageStats {
        total_trips: table.rows.len(),
        certified_trips,
        total_fee,
        travel_days: aggregates.iter().filter(|a| a.has_travel()).count(),
        expected_trips,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blank::blank_template;
    use crate::loader::parse_table;
    use crate::types::CellValue;
    use calamine::{open_workbook_auto, Data, Reader};
    use std::fs;
    use tempfile::tempdir;

    const CSV: &str = "利用年月日（自）,時分（自）,利用ＩＣ（自）,利用ＩＣ（至）,後納料金\n\
                       24/03/05,09:15,大分米良,日田,620\n\
                       24/03/05,14:30,日田,大分米良,300\n\
                       24/03/16,07:50,大分米良,日田,1280\n\
                       24/03/31,18:10,日田,大分米良,\n\
                       24/02/29,08:00,大分米良,日田,999\n\
                       ???,08:00,大分米良,日田,999\n";

    fn header() -> ReportHeader {
        ReportHeader {
            organization: "総務課".to_string(),
            position: "主任".to_string(),
            name: "山田 太郎".to_string(),
            from_section: "大分米良".to_string(),
            to_section: "日田".to_string(),
            one_way_fee: 2680.0,
        }
    }

    fn value_at<'a>(cells: &'a [CellAssignment], address: &str) -> Option<&'a CellValue> {
        cells.iter().find(|c| c.address == address).map(|c| &c.value)
    }

    #[test]
    fn cells_for_a_sample_month() {
        let table = parse_table(CSV).unwrap();
        let (period, days, cells) = build_cells(&table, &header()).unwrap();
        assert_eq!(period, ReportingPeriod { year: 2024, month: 3 });
        assert_eq!(days.len(), 31);
        assert_eq!(value_at(&cells, "E18"), Some(&CellValue::Number(620.0)));
        assert_eq!(value_at(&cells, "H18"), Some(&CellValue::Number(300.0)));
        assert_eq!(value_at(&cells, "M14"), Some(&CellValue::Number(1280.0)));
        // Day 31, afternoon, blank fee: marked with a zero amount.
        assert_eq!(value_at(&cells, "O29"), Some(&CellValue::Text("○".to_string())));
        assert_eq!(value_at(&cells, "P29"), Some(&CellValue::Number(0.0)));
        assert_eq!(cells.len(), 10 + 4 * 2);
    }

    #[test]
    fn running_twice_gives_identical_cells() {
        let table = parse_table(CSV).unwrap();
        let first = build_cells(&table, &header()).unwrap();
        let second = build_cells(&table, &header()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn no_dates_stops_before_aggregation() {
        let table = parse_table("利用年月日（自）,後納料金\nunknown,100\n").unwrap();
        assert_eq!(build_cells(&table, &header()).unwrap_err(), ReportError::PeriodUnresolvable);
    }

    #[test]
    fn far_future_year_keeps_the_full_header() {
        let table = parse_table("利用年月日（自）,時分（自）,後納料金\n300000/03/05,09:15,620\n24/03/05,09:15,620\n").unwrap();
        let (period, days, cells) = build_cells(&table, &header()).unwrap();
        assert_eq!(period, ReportingPeriod { year: 2024, month: 3 });
        assert_eq!(days.len(), 31);
        assert!(value_at(&cells, "E56").is_some());
        assert!(value_at(&cells, "E57").is_some());
        assert_eq!(cells.len(), 10 + 2);
    }

    #[test]
    fn empty_table_is_input_absent() {
        let err = build_cells(&CsvTable::default(), &header()).unwrap_err();
        assert!(matches!(err, ReportError::InputAbsent(_)));
    }

    #[test]
    fn unknown_section_is_rejected() {
        let table = parse_table(CSV).unwrap();
        let mut h = header();
        h.to_section = "東京".to_string();
        assert!(matches!(build_cells(&table, &h), Err(ReportError::InvalidHeader(_))));
    }

    #[test]
    fn file_name_embeds_period_and_person() {
        let p = ReportingPeriod { year: 2024, month: 3 };
        assert_eq!(output_file_name(p, "山田 太郎"), "2024_3_高速道路利用実績簿（山田 太郎）.xlsx");
        assert_eq!(output_file_name(p, "a/b"), "2024_3_高速道路利用実績簿（a_b）.xlsx");
    }

    #[test]
    fn stats_follow_the_allowance() {
        let table = parse_table(CSV).unwrap();
        let (_, days, _) = build_cells(&table, &header()).unwrap();
        let stats = usage_stats(&table, &days, &header(), 112560.0);
        assert_eq!(stats.total_trips, 6);
        // Every row runs the declared route, dated or not.
        assert_eq!(stats.certified_trips, 6);
        assert_eq!(stats.total_fee, 620.0 + 300.0 + 1280.0 + 999.0 + 999.0);
        assert_eq!(stats.travel_days, 3);
        assert_eq!(stats.expected_trips, 42);
        let free = ReportHeader { one_way_fee: 0.0, ..header() };
        assert_eq!(usage_stats(&table, &days, &free, 112560.0).expected_trips, 0);
        let elsewhere = ReportHeader { from_section: "別府".to_string(), ..header() };
        assert_eq!(usage_stats(&table, &days, &elsewhere, 112560.0).certified_trips, 0);
    }

    #[test]
    fn workbook_round_trip_through_the_blank_form() {
        let table = parse_table(CSV).unwrap();
        let template = TemplateBook::from_bytes(blank_template().unwrap()).unwrap();
        let report = generate(&table, &header(), template).unwrap();
        assert_eq!(report.file_name, "2024_3_高速道路利用実績簿（山田 太郎）.xlsx");

        let dir = tempdir().unwrap();
        let path = dir.path().join(&report.file_name);
        fs::write(&path, &report.workbook).unwrap();

        let mut wb = open_workbook_auto(&path).unwrap();
        let sheet = wb.sheet_names()[0].clone();
        let range = wb.worksheet_range(&sheet).unwrap();
        let at = |addr: &str| {
            let (col, row) = crate::template::parse_cell_ref(addr).unwrap();
            range.get_value((row - 1, col - 1)).cloned().unwrap_or(Data::Empty)
        };
        let number = |addr: &str| match at(addr) {
            Data::Float(f) => Some(f),
            Data::Int(i) => Some(i as f64),
            Data::DateTime(dt) => Some(dt.as_f64()),
            _ => None,
        };

        assert_eq!(at("C3"), Data::String("総務課".to_string()));
        assert_eq!(at("N3"), Data::String("山田 太郎".to_string()));
        assert_eq!(at("P5"), Data::String("日田".to_string()));
        assert_eq!(number("B5"), Some(6.0));
        assert_eq!(number("D5"), Some(3.0));
        assert_eq!(number("M6"), Some(2680.0));
        assert_eq!(number("E56"), Some(45352.0));
        assert_eq!(number("E57"), Some(45382.0));
        assert_eq!(at("D18"), Data::String("○".to_string()));
        assert_eq!(number("E18"), Some(620.0));
        assert_eq!(number("M14"), Some(1280.0));
        // Template labels are untouched.
        assert_eq!(at("B13"), Data::String("日".to_string()));
        assert_eq!(number("J29"), Some(31.0));
        // Quiet days stay blank.
        assert_eq!(at("D14"), Data::Empty);
    }
}
