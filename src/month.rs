use chrono::{Datelike, NaiveDate};

use crate::error::{Result, ZeroedError};

/// Parse `YYYY-MM` into the first day of that month.
pub fn parse_month(raw: &str) -> Result<NaiveDate> {
    let invalid = || ZeroedError::InvalidMonth(raw.to_string());
    let (y, m) = raw.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = y.parse().map_err(|_| invalid())?;
    let month: u32 = m.parse().map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)
}

/// `--month` option, defaulting to the month containing `today`.
pub fn month_or_current(raw: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
    match raw {
        Some(m) => parse_month(m),
        None => Ok(month_start(today)),
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ZeroedError::InvalidDate(raw.to_string()))
}

pub fn month_start(d: NaiveDate) -> NaiveDate {
    d.with_day(1).unwrap_or(d)
}

pub fn next_month(d: NaiveDate) -> NaiveDate {
    shift_months(d, 1)
}

/// First day of the month `n` months away from `d`'s month.
pub fn shift_months(d: NaiveDate, n: i32) -> NaiveDate {
    let total = d.year() * 12 + d.month0() as i32 + n;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(d)
}

pub fn months_between(start: NaiveDate, end: NaiveDate) -> i32 {
    (end.year() - start.year()) * 12 + (end.month() as i32 - start.month() as i32)
}

/// The `YYYY-MM-DD` string stored in the database.
pub fn iso(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// "March 2025"
pub fn long_label(d: NaiveDate) -> String {
    d.format("%B %Y").to_string()
}

/// "Mar 2025"
pub fn short_label(d: NaiveDate) -> String {
    d.format("%b %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2025-03").unwrap(), ymd(2025, 3, 1));
        assert_eq!(parse_month("2025-3").unwrap(), ymd(2025, 3, 1));
        assert!(parse_month("2025-13").is_err());
        assert!(parse_month("March").is_err());
        assert!(parse_month("2025").is_err());
    }

    #[test]
    fn test_december_rolls_over() {
        assert_eq!(next_month(ymd(2024, 12, 15)), ymd(2025, 1, 1));
        assert_eq!(shift_months(ymd(2025, 1, 31), -1), ymd(2024, 12, 1));
    }

    #[test]
    fn test_shift_months_across_years() {
        assert_eq!(shift_months(ymd(2025, 2, 1), -3), ymd(2024, 11, 1));
        assert_eq!(shift_months(ymd(2025, 2, 1), 23), ymd(2027, 1, 1));
    }

    #[test]
    fn test_months_between() {
        assert_eq!(months_between(ymd(2025, 1, 1), ymd(2025, 12, 31)), 11);
        assert_eq!(months_between(ymd(2025, 6, 1), ymd(2026, 2, 1)), 8);
        assert_eq!(months_between(ymd(2025, 6, 1), ymd(2025, 3, 1)), -3);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2025-01-15").unwrap(), ymd(2025, 1, 15));
        assert!(parse_date("01/15/2025").is_err());
    }
}
