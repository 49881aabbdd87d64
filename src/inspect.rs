// Read-only look at a template: the cells the report depends on, with
// their current values and formulas.
use crate::error::ReportError;
use crate::template::parse_cell_ref;
use calamine::{open_workbook_auto, Data, Reader};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

/// Header and period cells the report writes or the form derives from.
pub const KEY_CELLS: [&str; 9] = ["B5", "D5", "E56", "E57", "B13", "C13", "J13", "K13", "M7"];

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct InspectedCell {
    #[tabled(rename = "Cell")]
    pub address: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Formula")]
    pub formula: String,
}

/// Key cells followed by the date (B13:B20) and weekday (C13:C20) columns.
pub fn default_addresses() -> Vec<String> {
    let mut addresses: Vec<String> = KEY_CELLS.iter().map(|a| a.to_string()).collect();
    for col in ["B", "C"] {
        addresses.extend((13..=20).map(|row| format!("{}{}", col, row)));
    }
    addresses
}

pub fn describe(value: &Data) -> String {
    match value {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::Error(e) => format!("{:?}", e),
    }
}

pub fn inspect_template(path: &Path, addresses: &[String]) -> Result<Vec<InspectedCell>, ReportError> {
    let unavailable = |e: calamine::Error| ReportError::TemplateUnavailable(format!("{}: {}", path.display(), e));
    let mut workbook = open_workbook_auto(path).map_err(unavailable)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ReportError::TemplateUnavailable("workbook has no sheets".to_string()))?;
    let values = workbook.worksheet_range(&sheet).map_err(unavailable)?;
    let formulas = workbook.worksheet_formula(&sheet).map_err(unavailable)?;

    let cells = addresses
        .iter()
        .map(|address| {
            let pos = parse_cell_ref(address).map(|(col, row)| (row - 1, col - 1));
            let value = pos.and_then(|p| values.get_value(p)).map(describe).unwrap_or_default();
            let formula = pos
                .and_then(|p| formulas.get_value(p))
                .filter(|f| !f.is_empty())
                .map(|f| format!("={}", f))
                .unwrap_or_default();
            InspectedCell { address: address.clone(), value, formula }
        })
        .collect();
    Ok(cells)
}
