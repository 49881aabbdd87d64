// Failure categories of a report run.
//
// Row-level noise (bad dates, times, fees) never shows up here: it is
// skipped or defaulted where it is read. Everything below aborts the run
// but leaves the process usable for another attempt.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReportError {
    /// No file was given, it could not be read, or it held no data rows.
    #[error("No usable CSV input: {0}")]
    InputAbsent(String),
    /// No row carried a parseable usage date.
    #[error("Could not determine the reporting year and month from the data")]
    PeriodUnresolvable,
    /// The template workbook could not be read or decoded.
    #[error("Template workbook unavailable: {0}")]
    TemplateUnavailable(String),
    /// Header values supplied by the caller are not usable.
    #[error("Invalid report header: {0}")]
    InvalidHeader(String),
    /// Anything else that went wrong while writing or serialising.
    #[error("Report generation failed: {0}")]
    Unexpected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_the_cause() {
        let e = ReportError::TemplateUnavailable("file not found".to_string());
        assert_eq!(e.to_string(), "Template workbook unavailable: file not found");
        assert!(ReportError::PeriodUnresolvable.to_string().contains("year and month"));
    }
}
