// Utility helpers for parsing and formatting.
//
// The billing export is hand-entered in places and re-saved by spreadsheet
// tools, so every field is parsed leniently here and the rest of the code
// works with typed values.
use chrono::{Datelike, NaiveDate};
use num_format::{Locale, ToFormattedString};

/// Parse a fee-like value into `f64`.
///
/// - Accepts `Option<&str>` so callers can pass a missing column straight in.
/// - Trims whitespace and strips thousands separators (`1,280`).
/// - Reads the leading number and ignores what follows (`620円` is 620).
/// - Returns `None` when the value does not start with a number.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.replace(",", "");
    let s = s.trim();
    let bytes = s.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = if matches!(bytes.first(), Some(b'+') | Some(b'-')) { 1 } else { 0 };
    let int_end = digits_from(end);
    let mut has_digits = int_end > end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        if frac_end > end + 1 || has_digits {
            has_digits |= frac_end > end + 1;
            end = frac_end;
        }
    }
    if !has_digits {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+') | Some(b'-')));
        let exp_end = digits_from(end + 1 + sign);
        if exp_end > end + 1 + sign {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Leading-integer parse: `" 05 10:00"` gives 5, `"x1"` gives `None`.
pub fn parse_leading_int(s: &str) -> Option<i32> {
    let s = s.trim_start();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i32>().ok().map(|v| sign * v)
}

/// Expand abbreviated years: below 50 is 20xx, 50..100 is 19xx, anything
/// from 100 upward is taken as written.
pub fn normalize_year(year: i32) -> i32 {
    if year < 50 {
        year + 2000
    } else if year < 100 {
        year + 1900
    } else {
        year
    }
}

/// Year and month of a `Y/M[/D...]` string, year normalised.
pub fn parse_year_month(s: &str) -> Option<(i32, u32)> {
    if !s.contains('/') {
        return None;
    }
    let mut parts = s.split('/');
    let year = parse_leading_int(parts.next()?)?;
    let month = parse_leading_int(parts.next()?)?;
    if year < 0 || !(1..=12).contains(&month) {
        return None;
    }
    let year = normalize_year(year);
    // Years chrono cannot represent have no calendar to lay out.
    NaiveDate::from_ymd_opt(year, month as u32, 1)?;
    Some((year, month as u32))
}

/// Full `Y/M/D` date, year normalised. Needs at least three tokens.
pub fn parse_year_month_day(s: &str) -> Option<(i32, u32, u32)> {
    let (year, month) = parse_year_month(s)?;
    let day = parse_leading_int(s.split('/').nth(2)?)?;
    if day < 1 {
        return None;
    }
    Some((year, month, day as u32))
}

/// Hour of an `HH:MM` string; `None` when there is no colon or no number.
pub fn parse_hour(s: &str) -> Option<i32> {
    if !s.contains(':') {
        return None;
    }
    parse_leading_int(s.split(':').next()?)
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(next.pred_opt().unwrap_or(first).day())
}

/// Days since 1899-12-30, the 1900 date system serial Excel stores.
pub fn excel_serial(date: NaiveDate) -> f64 {
    match NaiveDate::from_ymd_opt(1899, 12, 30) {
        Some(epoch) => (date - epoch).num_days() as f64,
        None => 0.0,
    }
}

/// Format with a fixed number of decimals and `,` thousands separators.
pub fn format_number(n: f64, decimals: usize) -> String {
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Yen amount without decimals, e.g. `¥12,345`.
pub fn format_yen(n: f64) -> String {
    format!("¥{}", format_number(n, 0))
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_thresholds() {
        assert_eq!(normalize_year(0), 2000);
        assert_eq!(normalize_year(7), 2007);
        assert_eq!(normalize_year(49), 2049);
        assert_eq!(normalize_year(50), 1950);
        assert_eq!(normalize_year(99), 1999);
        assert_eq!(normalize_year(100), 100);
        assert_eq!(normalize_year(2024), 2024);
    }

    #[test]
    fn year_month_needs_a_slash_and_two_numbers() {
        assert_eq!(parse_year_month("24/3/1"), Some((2024, 3)));
        assert_eq!(parse_year_month("2024/12"), Some((2024, 12)));
        assert_eq!(parse_year_month(" 24 / 03 /05"), Some((2024, 3)));
        assert_eq!(parse_year_month("2024-03-01"), None);
        assert_eq!(parse_year_month("24/"), None);
        assert_eq!(parse_year_month("abc/3"), None);
        assert_eq!(parse_year_month("24/13/1"), None);
        assert_eq!(parse_year_month("24/0/1"), None);
    }

    #[test]
    fn years_outside_the_calendar_are_unparseable() {
        assert_eq!(parse_year_month("200000/12/1"), Some((200000, 12)));
        assert_eq!(parse_year_month("300000/03/05"), None);
        assert_eq!(parse_year_month_day("300000/03/05"), None);
    }

    #[test]
    fn full_date_takes_the_leading_day_number() {
        assert_eq!(parse_year_month_day("24/03/05"), Some((2024, 3, 5)));
        assert_eq!(parse_year_month_day("2024/3/5 10:00"), Some((2024, 3, 5)));
        assert_eq!(parse_year_month_day("24/03"), None);
        assert_eq!(parse_year_month_day("24/03/xx"), None);
    }

    #[test]
    fn hour_before_the_colon() {
        assert_eq!(parse_hour("09:15"), Some(9));
        assert_eq!(parse_hour("14:30"), Some(14));
        assert_eq!(parse_hour("0915"), None);
        assert_eq!(parse_hour(":15"), None);
    }

    #[test]
    fn fees_are_forgiving() {
        assert_eq!(parse_f64_safe(Some(" 620 ")), Some(620.0));
        assert_eq!(parse_f64_safe(Some("1,280")), Some(1280.0));
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(Some("n/a")), None);
        assert_eq!(parse_f64_safe(Some("-")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn fees_keep_the_leading_amount() {
        assert_eq!(parse_f64_safe(Some("620円")), Some(620.0));
        assert_eq!(parse_f64_safe(Some("1,280 yen")), Some(1280.0));
        assert_eq!(parse_f64_safe(Some("12.5abc")), Some(12.5));
        assert_eq!(parse_f64_safe(Some(".5")), Some(0.5));
        assert_eq!(parse_f64_safe(Some("3.")), Some(3.0));
        assert_eq!(parse_f64_safe(Some("-40")), Some(-40.0));
        assert_eq!(parse_f64_safe(Some("1e3円")), Some(1000.0));
        assert_eq!(parse_f64_safe(Some("2e")), Some(2.0));
        assert_eq!(parse_f64_safe(Some("円620")), None);
    }

    #[test]
    fn month_lengths() {
        assert_eq!(last_day_of_month(2024, 2), Some(29));
        assert_eq!(last_day_of_month(2023, 2), Some(28));
        assert_eq!(last_day_of_month(2024, 12), Some(31));
        assert_eq!(last_day_of_month(2024, 4), Some(30));
        assert_eq!(last_day_of_month(2024, 13), None);
    }

    #[test]
    fn serials_match_excel() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(excel_serial(d), 45352.0);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_yen(112560.0), "¥112,560");
        assert_eq!(format_int(9855), "9,855");
    }
}
