//! Date utilities
//!
//! Acquisition dates arrive as compact `YYYYMMDD` strings; roster dates of
//! birth arrive in whatever form the spreadsheet export produced.

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};

/// Compact date format used in README metadata
pub const COMPACT_DATE_FORMAT: &str = "%Y%m%d";

/// Hyphenated date format used in reports
pub const REPORT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse an 8-digit `YYYYMMDD` date
///
/// Surrounding whitespace is ignored. Anything that is not exactly eight
/// digits forming a valid calendar date yields `None`.
pub fn parse_compact_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(raw, COMPACT_DATE_FORMAT).ok()
}

/// Render a date as `YYYY-MM-DD`
pub fn hyphenate(date: NaiveDate) -> String {
    date.format(REPORT_DATE_FORMAT).to_string()
}

/// Parse a roster date of birth
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` (spreadsheet exports keep the
/// time part), `MM/DD/YYYY` and compact `YYYYMMDD`.
pub fn parse_date_of_birth(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, REPORT_DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(datetime.date());
    }
    // Date part only, whatever follows the first space
    if let Some((date_part, _)) = raw.split_once(' ') {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, REPORT_DATE_FORMAT) {
            return Some(date);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%m/%d/%Y") {
        return Some(date);
    }
    parse_compact_date(raw)
}

/// Whole years elapsed between `born` and `on`
///
/// Anniversaries falling on a day the target month lacks clamp to its last
/// day, so a Feb 29 birthday is reached on Feb 28 in common years. Returns
/// `None` when `on` precedes `born`.
pub fn age_in_years(born: NaiveDate, on: NaiveDate) -> Option<u32> {
    if on < born {
        return None;
    }
    let mut years = u32::try_from(on.year() - born.year()).ok()?;
    let anniversary = born.checked_add_months(Months::new(years * 12))?;
    if anniversary > on {
        years -= 1;
    }
    Some(years)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_compact_date() {
        assert_eq!(parse_compact_date("20230504"), Some(date(2023, 5, 4)));
        assert_eq!(parse_compact_date(" 20230504\n"), Some(date(2023, 5, 4)));
    }

    #[test]
    fn test_parse_compact_date_rejects_garbage() {
        assert_eq!(parse_compact_date(""), None);
        assert_eq!(parse_compact_date("2023-05-04"), None);
        assert_eq!(parse_compact_date("20231345"), None);
        assert_eq!(parse_compact_date("202305041"), None);
        assert_eq!(parse_compact_date("2023050x"), None);
    }

    #[test]
    fn test_hyphenate() {
        assert_eq!(hyphenate(date(2001, 5, 4)), "2001-05-04");
    }

    #[test]
    fn test_parse_date_of_birth_formats() {
        assert_eq!(parse_date_of_birth("1990-01-01"), Some(date(1990, 1, 1)));
        assert_eq!(
            parse_date_of_birth("1990-01-01 00:00:00"),
            Some(date(1990, 1, 1))
        );
        assert_eq!(parse_date_of_birth("1990-01-01 x"), Some(date(1990, 1, 1)));
        assert_eq!(parse_date_of_birth("02/28/1985"), Some(date(1985, 2, 28)));
        assert_eq!(parse_date_of_birth("19850228"), Some(date(1985, 2, 28)));
        assert_eq!(parse_date_of_birth("unknown"), None);
        assert_eq!(parse_date_of_birth("  "), None);
    }

    #[test]
    fn test_age_in_years() {
        assert_eq!(age_in_years(date(1990, 1, 1), date(2020, 1, 1)), Some(30));
        assert_eq!(age_in_years(date(1990, 6, 15), date(2020, 6, 14)), Some(29));
        assert_eq!(age_in_years(date(1990, 6, 15), date(2020, 6, 15)), Some(30));
        assert_eq!(age_in_years(date(2020, 1, 2), date(2020, 1, 1)), None);
    }

    #[test]
    fn test_age_leap_day_birthday() {
        assert_eq!(age_in_years(date(2000, 2, 29), date(2021, 2, 27)), Some(20));
        assert_eq!(age_in_years(date(2000, 2, 29), date(2021, 2, 28)), Some(21));
        assert_eq!(age_in_years(date(2000, 2, 29), date(2024, 2, 29)), Some(24));
    }
}
