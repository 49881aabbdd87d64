// Placement of the report onto the fixed template grid.
//
// The grid belongs to the printed form: days 1-15 fill rows 14-28 of the
// left band (D/E morning, G/H afternoon), days 16-30 reuse rows 14-28 in
// the right band (L/M, O/P), and day 31 sits alone on row 29 of the right
// band. Days without travel are left untouched so the template's blank
// cells read as "no travel".
use crate::types::{CellAssignment, DailyAggregate, ReportHeader, ReportingPeriod};
use crate::util::last_day_of_month;
use chrono::NaiveDate;

/// Confirmation mark the form expects in a travelled half-day. The form
/// convention is the open circle `○` (U+25CB), not `●`.
pub const CONFIRMATION_MARK: &str = "○";

/// Era offset: 令和 year = Gregorian year - 2018.
const ERA_BASE_YEAR: i32 = 2018;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySlot {
    pub row: u32,
    pub morning_mark: &'static str,
    pub morning_amount: &'static str,
    pub afternoon_mark: &'static str,
    pub afternoon_amount: &'static str,
}

const LEFT_BAND: [&str; 4] = ["D", "E", "G", "H"];
const RIGHT_BAND: [&str; 4] = ["L", "M", "O", "P"];

fn slot(row: u32, band: [&'static str; 4]) -> DaySlot {
    DaySlot {
        row,
        morning_mark: band[0],
        morning_amount: band[1],
        afternoon_mark: band[2],
        afternoon_amount: band[3],
    }
}

/// Where a day of the month lands on the form; `None` outside 1..=31.
pub fn day_slot(day: u32) -> Option<DaySlot> {
    match day {
        1..=15 => Some(slot(day + 13, LEFT_BAND)),
        16..=30 => Some(slot(day - 15 + 13, RIGHT_BAND)),
        31 => Some(slot(29, RIGHT_BAND)),
        _ => None,
    }
}

/// Header cells, in the order they are written. Always present.
fn header_cells(header: &ReportHeader, period: ReportingPeriod) -> Vec<CellAssignment> {
    let mut cells = vec![
        CellAssignment::text("C3", &header.organization),
        CellAssignment::text("K3", &header.position),
        CellAssignment::text("N3", &header.name),
        CellAssignment::number("B5", f64::from(period.year - ERA_BASE_YEAR)),
        CellAssignment::number("D5", f64::from(period.month)),
        CellAssignment::text("M5", &header.from_section),
        CellAssignment::text("P5", &header.to_section),
        CellAssignment::number("M6", header.one_way_fee),
    ];
    let first = NaiveDate::from_ymd_opt(period.year, period.month, 1);
    let last = last_day_of_month(period.year, period.month)
        .and_then(|d| NaiveDate::from_ymd_opt(period.year, period.month, d));
    if let (Some(first), Some(last)) = (first, last) {
        cells.push(CellAssignment::date("E56", first));
        cells.push(CellAssignment::date("E57", last));
    }
    cells
}

/// Turn the header and daily summaries into the cell writes for the form.
pub fn map_to_cells(
    header: &ReportHeader,
    period: ReportingPeriod,
    aggregates: &[DailyAggregate],
) -> Vec<CellAssignment> {
    let mut cells = header_cells(header, period);

    for agg in aggregates.iter().filter(|a| a.has_travel()) {
        let Some(slot) = day_slot(agg.day) else {
            log::warn!("Day {} has no place on the form; skipped", agg.day);
            continue;
        };
        if agg.morning_present {
            cells.push(CellAssignment::text(&format!("{}{}", slot.morning_mark, slot.row), CONFIRMATION_MARK));
            cells.push(CellAssignment::number(&format!("{}{}", slot.morning_amount, slot.row), agg.morning_total));
        }
        if agg.afternoon_present {
            cells.push(CellAssignment::text(&format!("{}{}", slot.afternoon_mark, slot.row), CONFIRMATION_MARK));
            cells.push(CellAssignment::number(&format!("{}{}", slot.afternoon_amount, slot.row), agg.afternoon_total));
        }
    }

    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CellType, CellValue};

    fn header() -> ReportHeader {
        ReportHeader {
            organization: "総務課".to_string(),
            position: "主任".to_string(),
            name: "山田太郎".to_string(),
            from_section: "大分米良".to_string(),
            to_section: "日田".to_string(),
            one_way_fee: 2680.0,
        }
    }

    fn find<'a>(cells: &'a [CellAssignment], address: &str) -> Option<&'a CellValue> {
        cells.iter().find(|c| c.address == address).map(|c| &c.value)
    }

    fn travelled(day: u32) -> DailyAggregate {
        DailyAggregate {
            day,
            morning_total: 620.0,
            afternoon_total: 300.0,
            morning_present: true,
            afternoon_present: true,
        }
    }

    const MARCH_2024: ReportingPeriod = ReportingPeriod { year: 2024, month: 3 };

    #[test]
    fn header_cells_without_any_travel() {
        let cells = map_to_cells(&header(), MARCH_2024, &[]);
        assert_eq!(cells.len(), 10);
        assert_eq!(find(&cells, "C3"), Some(&CellValue::Text("総務課".to_string())));
        assert_eq!(find(&cells, "K3"), Some(&CellValue::Text("主任".to_string())));
        assert_eq!(find(&cells, "N3"), Some(&CellValue::Text("山田太郎".to_string())));
        assert_eq!(find(&cells, "B5"), Some(&CellValue::Number(6.0)));
        assert_eq!(find(&cells, "D5"), Some(&CellValue::Number(3.0)));
        assert_eq!(find(&cells, "M5"), Some(&CellValue::Text("大分米良".to_string())));
        assert_eq!(find(&cells, "P5"), Some(&CellValue::Text("日田".to_string())));
        assert_eq!(find(&cells, "M6"), Some(&CellValue::Number(2680.0)));
        assert_eq!(
            find(&cells, "E56"),
            Some(&CellValue::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()))
        );
        assert_eq!(
            find(&cells, "E57"),
            Some(&CellValue::Date(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()))
        );
        assert_eq!(find(&cells, "E56").map(|v| v.type_tag()), Some(CellType::Date));
    }

    #[test]
    fn quiet_days_write_nothing() {
        let days: Vec<DailyAggregate> = (1..=31).map(DailyAggregate::empty).collect();
        assert_eq!(map_to_cells(&header(), MARCH_2024, &days).len(), 10);
    }

    #[test]
    fn split_rows_for_a_31_day_month() {
        let days = vec![travelled(1), travelled(15), travelled(16), travelled(30), travelled(31)];
        let cells = map_to_cells(&header(), MARCH_2024, &days);
        let mark = Some(&CellValue::Text(CONFIRMATION_MARK.to_string()));

        for addr in ["D14", "G14", "D28", "G28", "L14", "O14", "L28", "O28", "L29", "O29"] {
            assert_eq!(find(&cells, addr), mark, "mark missing at {addr}");
        }
        for addr in ["E14", "E28", "M14", "M28", "M29"] {
            assert_eq!(find(&cells, addr), Some(&CellValue::Number(620.0)), "amount at {addr}");
        }
        for addr in ["H14", "H28", "P14", "P28", "P29"] {
            assert_eq!(find(&cells, addr), Some(&CellValue::Number(300.0)), "amount at {addr}");
        }
        assert_eq!(cells.len(), 10 + 5 * 4);
        assert!(find(&cells, "D29").is_none());
    }

    #[test]
    fn only_the_travelled_half_is_written() {
        let day = DailyAggregate {
            day: 20,
            morning_total: 0.0,
            afternoon_total: 1280.0,
            morning_present: false,
            afternoon_present: true,
        };
        let cells = map_to_cells(&header(), MARCH_2024, &[day]);
        assert!(find(&cells, "L18").is_none());
        assert!(find(&cells, "M18").is_none());
        assert_eq!(find(&cells, "O18"), Some(&CellValue::Text(CONFIRMATION_MARK.to_string())));
        assert_eq!(find(&cells, "P18"), Some(&CellValue::Number(1280.0)));
    }

    #[test]
    fn present_with_zero_fee_still_writes_an_amount() {
        let day = DailyAggregate {
            day: 2,
            morning_total: 0.0,
            afternoon_total: 0.0,
            morning_present: true,
            afternoon_present: false,
        };
        let cells = map_to_cells(&header(), MARCH_2024, &[day]);
        assert_eq!(find(&cells, "D15"), Some(&CellValue::Text(CONFIRMATION_MARK.to_string())));
        assert_eq!(find(&cells, "E15"), Some(&CellValue::Number(0.0)));
    }

    #[test]
    fn slot_table() {
        assert_eq!(day_slot(1).map(|s| s.row), Some(14));
        assert_eq!(day_slot(15).map(|s| (s.row, s.morning_mark)), Some((28, "D")));
        assert_eq!(day_slot(16).map(|s| (s.row, s.morning_mark)), Some((14, "L")));
        assert_eq!(day_slot(30).map(|s| s.row), Some(28));
        assert_eq!(day_slot(31).map(|s| (s.row, s.afternoon_amount)), Some((29, "P")));
        assert_eq!(day_slot(0), None);
        assert_eq!(day_slot(32), None);
    }

    #[test]
    fn end_date_follows_month_length() {
        let cells = map_to_cells(&header(), ReportingPeriod { year: 2023, month: 2 }, &[]);
        assert_eq!(
            find(&cells, "E57"),
            Some(&CellValue::Date(NaiveDate::from_ymd_opt(2023, 2, 28).unwrap()))
        );
        assert_eq!(find(&cells, "B5"), Some(&CellValue::Number(5.0)));
    }
}
