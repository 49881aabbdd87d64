use chrono::NaiveDate;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use tabled::Tabled;

/// Column holding the usage date, e.g. `24/03/05`.
pub const DATE_COLUMN: &str = "利用年月日（自）";
/// Column holding the entry time, e.g. `09:15`.
pub const TIME_COLUMN: &str = "時分（自）";
/// Column holding the deferred-payment toll.
pub const FEE_COLUMN: &str = "後納料金";
pub const ENTRY_IC_COLUMN: &str = "利用ＩＣ（自）";
pub const EXIT_IC_COLUMN: &str = "利用ＩＣ（至）";

/// One CSV row: column name to raw field text. Columns the report does not
/// consume are kept for the data preview.
pub type TripRecord = HashMap<String, String>;

/// A decoded CSV export: column names in file order plus the rows.
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<TripRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ReportingPeriod {
    pub year: i32,
    pub month: u32,
}

impl ReportingPeriod {
    /// `{0, 0}` is what the resolver hands back when nothing parsed.
    pub const UNRESOLVED: ReportingPeriod = ReportingPeriod { year: 0, month: 0 };

    pub fn is_resolved(&self) -> bool {
        *self != Self::UNRESOLVED
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAggregate {
    pub day: u32,
    pub morning_total: f64,
    pub afternoon_total: f64,
    pub morning_present: bool,
    pub afternoon_present: bool,
}

impl DailyAggregate {
    pub fn empty(day: u32) -> Self {
        DailyAggregate {
            day,
            morning_total: 0.0,
            afternoon_total: 0.0,
            morning_present: false,
            afternoon_present: false,
        }
    }

    pub fn has_travel(&self) -> bool {
        self.morning_present || self.afternoon_present
    }
}

/// Caller-supplied metadata printed at the top of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportHeader {
    pub organization: String,
    pub position: String,
    pub name: String,
    pub from_section: String,
    pub to_section: String,
    pub one_way_fee: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    String,
    Number,
    Date,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl CellValue {
    pub fn type_tag(&self) -> CellType {
        match self {
            CellValue::Text(_) => CellType::String,
            CellValue::Number(_) => CellType::Number,
            CellValue::Date(_) => CellType::Date,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellAssignment {
    pub address: String,
    pub value: CellValue,
}

// Serialised as `{address, type, value}`.
impl Serialize for CellAssignment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("CellAssignment", 3)?;
        s.serialize_field("address", &self.address)?;
        s.serialize_field("type", &self.value.type_tag())?;
        s.serialize_field("value", &self.value)?;
        s.end()
    }
}

impl CellAssignment {
    pub fn text(address: &str, value: &str) -> Self {
        CellAssignment { address: address.to_string(), value: CellValue::Text(value.to_string()) }
    }

    pub fn number(address: &str, value: f64) -> Self {
        CellAssignment { address: address.to_string(), value: CellValue::Number(value) }
    }

    pub fn date(address: &str, value: NaiveDate) -> Self {
        CellAssignment { address: address.to_string(), value: CellValue::Date(value) }
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DailySummaryRow {
    #[tabled(rename = "Day")]
    pub day: u32,
    #[tabled(rename = "AM")]
    pub morning_mark: String,
    #[tabled(rename = "AM Fee")]
    pub morning_total: String,
    #[tabled(rename = "PM")]
    pub afternoon_mark: String,
    #[tabled(rename = "PM Fee")]
    pub afternoon_total: String,
}

/// Which way a trip ran relative to the declared route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TripDirection {
    Outbound,
    Return,
    NotApplicable,
}

impl TripDirection {
    pub fn label(self) -> &'static str {
        match self {
            TripDirection::Outbound => "往路",
            TripDirection::Return => "復路",
            TripDirection::NotApplicable => "対象外",
        }
    }

    /// Outbound and return legs count towards the certified trips.
    pub fn is_certified(self) -> bool {
        self != TripDirection::NotApplicable
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TripRow {
    #[tabled(rename = "Date")]
    pub date: String,
    #[tabled(rename = "Time")]
    pub time: String,
    #[tabled(rename = "From IC")]
    pub entry: String,
    #[tabled(rename = "To IC")]
    pub exit: String,
    #[tabled(rename = "Fee")]
    pub fee: String,
    #[tabled(rename = "Direction")]
    pub direction: String,
}

/// Trip counts and totals shown alongside the preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageStats {
    pub total_trips: usize,
    pub certified_trips: usize,
    pub total_fee: f64,
    pub travel_days: usize,
    pub expected_trips: u64,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub period: ReportingPeriod,
    pub header: ReportHeader,
    pub stats: UsageStats,
    pub output_file: String,
    pub cells: Vec<CellAssignment>,
}
