use crate::types::{DailyAggregate, ReportingPeriod, TripRecord, DATE_COLUMN, FEE_COLUMN, TIME_COLUMN};
use crate::util::{last_day_of_month, parse_f64_safe, parse_hour, parse_year_month_day};
use std::collections::BTreeMap;

/// Reduce trips into one morning/afternoon summary per calendar day of
/// `period`. Rows are bucketed by day in a single pass, then each bucket is
/// folded. An unresolved or impossible period yields no days.
pub fn aggregate(rows: &[TripRecord], period: ReportingPeriod) -> Vec<DailyAggregate> {
    let Some(last_day) = last_day_of_month(period.year, period.month) else {
        return Vec::new();
    };

    let mut by_day: BTreeMap<u32, Vec<&TripRecord>> = BTreeMap::new();
    for row in rows {
        let Some((year, month, day)) = row.get(DATE_COLUMN).and_then(|d| parse_year_month_day(d))
        else {
            continue;
        };
        if year == period.year && month == period.month && day <= last_day {
            by_day.entry(day).or_default().push(row);
        }
    }

    (1..=last_day)
        .map(|day| {
            let mut acc = DailyAggregate::empty(day);
            for row in by_day.get(&day).map(Vec::as_slice).unwrap_or_default() {
                add_trip(&mut acc, row);
            }
            acc
        })
        .collect()
}

fn add_trip(acc: &mut DailyAggregate, row: &TripRecord) {
    // No time, or no hour before the colon, counts as a morning trip.
    let is_morning = row
        .get(TIME_COLUMN)
        .and_then(|t| parse_hour(t))
        .map_or(true, |hour| hour < 12);
    // A trip with an unreadable fee still marks the half-day.
    let fee = parse_f64_safe(row.get(FEE_COLUMN).map(String::as_str)).unwrap_or(0.0);

    if is_morning {
        acc.morning_total += fee;
        acc.morning_present = true;
    } else {
        acc.afternoon_total += fee;
        acc.afternoon_present = true;
    }
}
