// Interchanges a commute can start or end at.
use crate::error::ReportError;
use crate::types::{ReportHeader, TripDirection, TripRecord, ENTRY_IC_COLUMN, EXIT_IC_COLUMN};
use once_cell::sync::Lazy;

pub const DEFAULT_FROM: &str = "大分米良";
pub const DEFAULT_TO: &str = "日田";

/// The route-section set, sorted once on first use.
pub static ROUTE_SECTIONS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    let mut sections = vec![
        "玖珠", "湯布院", "別府", "大分米良", "大分光吉", "大分宮河内", "大分松岡", "大分", "津久見",
        "津久見南", "佐伯", "佐伯堅田", "北浦", "蒲江", "日田", "竹田", "朝地", "宇佐", "院内", "安心院",
    ];
    sections.sort_unstable();
    sections
});

pub fn is_known(section: &str) -> bool {
    ROUTE_SECTIONS.iter().any(|s| *s == section)
}

/// Default endpoints, falling back to the first two entries of the set.
pub fn default_endpoints() -> (String, String) {
    let pick = |wanted: &str, fallback: usize| {
        if is_known(wanted) {
            wanted.to_string()
        } else {
            ROUTE_SECTIONS.get(fallback).map(|s| s.to_string()).unwrap_or_default()
        }
    };
    (pick(DEFAULT_FROM, 0), pick(DEFAULT_TO, 1))
}

/// Reject headers the form could not have produced.
pub fn validate_header(header: &ReportHeader) -> Result<(), ReportError> {
    for section in [&header.from_section, &header.to_section] {
        let section = section.as_str();
        if !is_known(section) {
            return Err(ReportError::InvalidHeader(format!(
                "unknown route section '{}' (see `sections`)",
                section
            )));
        }
    }
    if !header.one_way_fee.is_finite() || header.one_way_fee < 0.0 {
        return Err(ReportError::InvalidHeader(format!(
            "one-way fee must be a non-negative amount, got {}",
            header.one_way_fee
        )));
    }
    Ok(())
}

/// Classify a trip by its interchanges. A section matches an interchange
/// name that contains it, so `大分` also covers `大分米良`.
pub fn classify_trip(row: &TripRecord, from: &str, to: &str) -> TripDirection {
    if from.is_empty() || to.is_empty() {
        return TripDirection::NotApplicable;
    }
    let field = |c: &str| row.get(c).map(String::as_str).unwrap_or("");
    let (entry, exit) = (field(ENTRY_IC_COLUMN), field(EXIT_IC_COLUMN));
    if entry.contains(from) && exit.contains(to) {
        TripDirection::Outbound
    } else if entry.contains(to) && exit.contains(from) {
        TripDirection::Return
    } else {
        TripDirection::NotApplicable
    }
}
