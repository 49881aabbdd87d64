use crate::error::ReportError;
use crate::types::{CsvTable, TripRecord, DATE_COLUMN, FEE_COLUMN, TIME_COLUMN};
use csv::{ReaderBuilder, Trim};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub encoding: &'static str,
    pub missing_columns: Vec<&'static str>,
}

/// Read the billing export at `path` into a table of rows.
pub fn load_table(path: &Path) -> Result<(CsvTable, LoadReport), ReportError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ReportError::InputAbsent(format!("{}: {}", path.display(), e)))?;
    let (text, encoding) = decode_text(&bytes);
    log::info!("Decoded {} as {}", path.display(), encoding);
    let table = parse_table(&text)?;
    let report = LoadReport {
        total_rows: table.rows.len(),
        encoding,
        missing_columns: missing_columns(&table.headers),
    };
    for column in &report.missing_columns {
        log::warn!("Column {} not found; affected rows will be skipped or defaulted", column);
    }
    Ok((table, report))
}

/// UTF-8 when the bytes allow it, otherwise Shift_JIS (what the billing
/// portal actually exports).
pub fn decode_text(bytes: &[u8]) -> (String, &'static str) {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), "UTF-8"),
        Err(_) => {
            let (decoded, _, had_errors) = encoding_rs::SHIFT_JIS.decode(bytes);
            if had_errors {
                log::warn!("Some bytes were not valid Shift_JIS and were replaced");
            }
            (decoded.into_owned(), "Shift_JIS")
        }
    }
}

/// Tokenise decoded CSV text. The first record is the header row.
pub fn parse_table(text: &str) -> Result<CsvTable, ReportError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| ReportError::InputAbsent(format!("unreadable header row: {}", e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                log::debug!("Skipping unreadable record: {}", e);
                skipped += 1;
                continue;
            }
        };
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        let row: TripRecord = headers
            .iter()
            .zip(record.iter())
            .map(|(h, f)| (h.clone(), f.to_string()))
            .collect();
        rows.push(row);
    }
    if skipped > 0 {
        log::info!("{} unreadable records skipped", skipped);
    }

    if rows.is_empty() {
        return Err(ReportError::InputAbsent("the CSV contains no data rows".to_string()));
    }
    Ok(CsvTable { headers, rows })
}

fn missing_columns(headers: &[String]) -> Vec<&'static str> {
    [DATE_COLUMN, TIME_COLUMN, FEE_COLUMN]
        .into_iter()
        .filter(|c| !headers.iter().any(|h| h.as_str() == *c))
        .collect()
}
