// Utility helpers for cell coercion, dates, percentages and display formatting.
//
// This module centralizes all the "dirty" spreadsheet handling so the
// extractor and the aggregator can assume clean, typed values.
use crate::error::RowError;
use crate::types::Cell;
use chrono::{Local, NaiveDate};
use num_format::{Locale, ToFormattedString};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// `DD-Mon-YY`, e.g. `05-Mar-24`. Reference dates are compared against this form.
pub const DATE_FORMAT: &str = "%d-%b-%y";

static THOUSANDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+]?\d{1,3}(,\d{3})+(\.\d+)?$").expect("regex is valid"));

/// Parse a string into `Decimal`, forgiving about the formatting noise that is
/// common in spreadsheet exports.
///
/// - Trims whitespace.
/// - Strips thousands separators, but only when every group sits in a
///   thousands position (`1,234.5`); `1,5` is not a number.
/// - Accepts scientific notation (`1.5e3`).
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_decimal_safe(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let s = if THOUSANDS.is_match(s) {
        s.replace(',', "")
    } else {
        s.to_string()
    };
    s.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(&s).ok())
}

/// Monetary coercion. Never fails: anything that is not a number becomes 0.
pub fn coerce_decimal(cell: Option<&Cell>) -> Decimal {
    match cell {
        Some(Cell::Number(v)) => Decimal::from_f64(*v).unwrap_or(Decimal::ZERO),
        Some(Cell::Text(s)) => parse_decimal_safe(s).unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

/// Plain string form of a cell. `Ok(None)` means the cell is absent or empty.
///
/// Text is kept verbatim, surrounding whitespace included.
pub fn coerce_text(cell: Option<&Cell>, column: usize) -> Result<Option<String>, RowError> {
    match cell {
        None | Some(Cell::Empty) => Ok(None),
        Some(Cell::Text(s)) => Ok((!s.is_empty()).then(|| s.clone())),
        Some(Cell::Number(v)) => Ok(Some(number_to_string(*v))),
        Some(Cell::Date(dt)) => Ok(Some(dt.format("%Y-%m-%d %H:%M:%S").to_string())),
        Some(Cell::Invalid(detail)) => Err(RowError::MalformedCell {
            column,
            detail: detail.clone(),
        }),
    }
}

/// Like [`coerce_text`] but date-typed cells render as `DD-Mon-YY`.
pub fn coerce_date(cell: Option<&Cell>, column: usize) -> Result<Option<String>, RowError> {
    match cell {
        Some(Cell::Date(dt)) => Ok(Some(dt.format(DATE_FORMAT).to_string())),
        other => coerce_text(other, column),
    }
}

fn number_to_string(v: f64) -> String {
    // Spreadsheets store ids and phone numbers as floats; drop the `.0`.
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

pub fn format_short_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Local (yesterday, today) in `DD-Mon-YY`, used when the user leaves the
/// reference dates blank.
pub fn default_report_dates() -> (String, String) {
    let today = Local::now().date_naive();
    let yesterday = today.pred_opt().unwrap_or(today);
    (format_short_date(yesterday), format_short_date(today))
}

/// `round(recovered / due * 100, 2)`, or 0 when nothing is due.
///
/// Midpoints round away from zero, so `33.335` becomes `33.34`.
pub fn recovery_percentage(recovered: Decimal, due: Decimal) -> Decimal {
    if due <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    recovered
        .checked_div(due)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|pct| pct.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .unwrap_or(Decimal::ZERO)
}

pub fn format_number(n: Decimal, decimals: u32) -> String {
    // Format a decimal value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let rounded = n.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    let neg = rounded.is_sign_negative() && !rounded.is_zero();
    let abs_n = rounded.abs();
    let s = format!("{:.*}", decimals as usize, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part
        .parse()
        .unwrap_or_else(|_| abs_n.trunc().to_i64().unwrap_or(0));
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals as usize));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
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
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn parses_numbers_with_separators_and_noise() {
        assert_eq!(parse_decimal_safe(" 1,234.50 "), Some(dec("1234.50")));
        assert_eq!(parse_decimal_safe("1.5e3"), Some(dec("1500")));
        assert_eq!(parse_decimal_safe("n/a"), None);
        assert_eq!(parse_decimal_safe("   "), None);
        assert_eq!(parse_decimal_safe("-12,345,678"), Some(dec("-12345678")));
    }

    #[test]
    fn commas_outside_thousands_positions_are_not_numbers() {
        assert_eq!(parse_decimal_safe("1,5"), None);
        assert_eq!(parse_decimal_safe("12,34"), None);
        assert_eq!(parse_decimal_safe("1234,567"), None);
        assert_eq!(coerce_decimal(Some(&Cell::Text("1,5".into()))), Decimal::ZERO);
    }

    #[test]
    fn decimal_coercion_swallows_everything_non_numeric() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(coerce_decimal(None), Decimal::ZERO);
        assert_eq!(coerce_decimal(Some(&Cell::Empty)), Decimal::ZERO);
        assert_eq!(coerce_decimal(Some(&Cell::Text("abc".into()))), Decimal::ZERO);
        assert_eq!(coerce_decimal(Some(&Cell::Date(date))), Decimal::ZERO);
        assert_eq!(coerce_decimal(Some(&Cell::Invalid("#DIV/0!".into()))), Decimal::ZERO);
        assert_eq!(coerce_decimal(Some(&Cell::Number(f64::NAN))), Decimal::ZERO);
        assert_eq!(coerce_decimal(Some(&Cell::Number(8000.0))), dec("8000"));
        assert_eq!(coerce_decimal(Some(&Cell::Text("2.01".into()))), dec("2.01"));
    }

    #[test]
    fn text_coercion_keeps_text_verbatim() {
        assert_eq!(
            coerce_text(Some(&Cell::Number(9876543210.0)), 31),
            Ok(Some("9876543210".to_string()))
        );
        assert_eq!(coerce_text(Some(&Cell::Number(2.5)), 1), Ok(Some("2.5".to_string())));
        assert_eq!(coerce_text(Some(&Cell::Text(String::new())), 1), Ok(None));
        assert_eq!(
            coerce_text(Some(&Cell::Text("  ".into())), 4),
            Ok(Some("  ".to_string()))
        );
        assert_eq!(
            coerce_text(Some(&Cell::Text(" Mumbai Central ".into())), 4),
            Ok(Some(" Mumbai Central ".to_string()))
        );
    }

    #[test]
    fn invalid_cells_are_row_errors_for_text_fields() {
        let err = coerce_text(Some(&Cell::Invalid("#REF!".into())), 4).unwrap_err();
        assert_eq!(
            err,
            RowError::MalformedCell {
                column: 4,
                detail: "#REF!".into()
            }
        );
    }

    #[test]
    fn date_cells_format_as_day_month_year() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(coerce_date(Some(&Cell::Date(dt)), 26), Ok(Some("05-Mar-24".to_string())));
        assert_eq!(
            coerce_date(Some(&Cell::Text("14-Jan-24".into())), 26),
            Ok(Some("14-Jan-24".to_string()))
        );
        assert_eq!(coerce_date(None, 26), Ok(None));
    }

    #[test]
    fn recovery_percentage_rounds_half_away_from_zero() {
        assert_eq!(recovery_percentage(dec("250"), dec("1000")), dec("25"));
        assert_eq!(recovery_percentage(dec("100"), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(recovery_percentage(dec("1"), dec("3")), dec("33.33"));
        assert_eq!(recovery_percentage(dec("33.335"), dec("100")), dec("33.34"));
    }

    #[test]
    fn formats_with_thousands_separators() {
        assert_eq!(format_number(dec("1234567.891"), 2), "1,234,567.89");
        assert_eq!(format_number(dec("-1500"), 2), "-1,500.00");
        assert_eq!(format_number(dec("0"), 0), "0");
        assert_eq!(format_int(9855usize), "9,855");
    }
}
