//! Date parsing and calendar arithmetic for the greencard questions.
//!
//! Everything here is pure: the display pattern is passed in rather than held in shared state.

use chrono::{DateTime, Months, NaiveDate, NaiveTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{input}' does not match date pattern '{format}'")]
pub struct DateParseError {
    pub input: String,
    pub format: String,
}

/// Parse `text` with the chrono `format` pattern.
pub fn parse_date(text: &str, format: &str) -> Result<NaiveDate, DateParseError> {
    NaiveDate::parse_from_str(text.trim(), format).map_err(|_| DateParseError {
        input: text.to_owned(),
        format: format.to_owned(),
    })
}

/// Outcome of reading a regimen start date.
///
/// Keeps "no date recorded" apart from "a date that could not be read", even though the
/// greencard questions currently answer both the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartDate {
    Missing,
    Unparseable(DateParseError),
    Parsed(NaiveDate),
}

impl StartDate {
    pub fn from_display(text: Option<&str>, format: &str) -> Self {
        match text {
            None => StartDate::Missing,
            Some(t) => match parse_date(t, format) {
                Ok(date) => StartDate::Parsed(date),
                Err(e) => StartDate::Unparseable(e),
            },
        }
    }

    pub fn parsed(&self) -> Option<NaiveDate> {
        match self {
            StartDate::Parsed(date) => Some(*date),
            _ => None,
        }
    }

    /// Start of day in UTC.
    pub fn at_midnight(&self) -> Option<DateTime<Utc>> {
        self.parsed()
            .map(|d| d.and_time(NaiveTime::MIN).and_utc())
    }
}

/// Absolute number of whole calendar months between two instants.
///
/// A month is complete once the later instant reaches the earlier one shifted by that many
/// months, with the day clamped to the end of shorter months (31 Jan + 1 month = 29 Feb in a
/// leap year).
pub fn months_between(a: DateTime<Utc>, b: DateTime<Utc>) -> u32 {
    let (start, end) = if a <= b { (a, b) } else { (b, a) };
    let start_naive = start.naive_utc();
    let end_naive = end.naive_utc();

    let naive_months = (end_naive.date().year_month_index()
        - start_naive.date().year_month_index())
    .max(0) as u32;

    let mut months = naive_months;
    while months > 0 {
        match start_naive.checked_add_months(Months::new(months)) {
            Some(shifted) if shifted <= end_naive => break,
            _ => months -= 1,
        }
    }
    months
}

/// Absolute number of whole days between two instants.
pub fn days_between(a: DateTime<Utc>, b: DateTime<Utc>) -> u32 {
    let days = (b - a).num_days().unsigned_abs();
    u32::try_from(days).unwrap_or(u32::MAX)
}

trait YearMonthIndex {
    fn year_month_index(&self) -> i64;
}

impl YearMonthIndex for NaiveDate {
    fn year_month_index(&self) -> i64 {
        use chrono::Datelike;
        i64::from(self.year()) * 12 + i64::from(self.month0())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DISPLAY_DATE_FORMAT;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn parses_display_dates() {
        assert_eq!(
            parse_date("05-Mar-2024", DISPLAY_DATE_FORMAT),
            Ok(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
        );
        assert_eq!(
            parse_date("05-MAR-2024", DISPLAY_DATE_FORMAT),
            Ok(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
        );
    }

    #[test]
    fn rejects_other_patterns() {
        let err = parse_date("2024-03-05", DISPLAY_DATE_FORMAT).expect_err("iso date");
        assert_eq!(err.input, "2024-03-05");
        assert!(parse_date("31-Feb-2024", DISPLAY_DATE_FORMAT).is_err());
        assert!(parse_date("", DISPLAY_DATE_FORMAT).is_err());
    }

    #[test]
    fn start_date_distinguishes_missing_from_unparseable() {
        assert_eq!(
            StartDate::from_display(None, DISPLAY_DATE_FORMAT),
            StartDate::Missing
        );
        assert!(matches!(
            StartDate::from_display(Some("garbage"), DISPLAY_DATE_FORMAT),
            StartDate::Unparseable(_)
        ));
        assert_eq!(
            StartDate::from_display(Some("01-Jan-2024"), DISPLAY_DATE_FORMAT).at_midnight(),
            Some(at(2024, 1, 1, 0))
        );
    }

    #[test]
    fn months_between_counts_whole_months_in_either_order() {
        assert_eq!(months_between(at(2024, 1, 15, 0), at(2024, 4, 15, 0)), 3);
        assert_eq!(months_between(at(2024, 4, 15, 0), at(2024, 1, 15, 0)), 3);
        assert_eq!(months_between(at(2024, 1, 15, 0), at(2024, 4, 14, 23)), 2);
        assert_eq!(months_between(at(2024, 1, 15, 10), at(2024, 4, 15, 9)), 2);
        assert_eq!(months_between(at(2024, 1, 15, 0), at(2024, 1, 15, 0)), 0);
        assert_eq!(months_between(at(2022, 11, 1, 0), at(2024, 2, 1, 0)), 15);
    }

    #[test]
    fn months_between_clamps_month_ends() {
        assert_eq!(months_between(at(2024, 1, 31, 0), at(2024, 2, 29, 0)), 1);
        assert_eq!(months_between(at(2023, 1, 31, 0), at(2023, 2, 28, 0)), 1);
        assert_eq!(months_between(at(2024, 1, 31, 0), at(2024, 2, 28, 0)), 0);
    }

    #[test]
    fn days_between_is_absolute_whole_days() {
        assert_eq!(days_between(at(2024, 1, 1, 0), at(2024, 1, 1, 23)), 0);
        assert_eq!(days_between(at(2024, 1, 1, 0), at(2024, 7, 1, 0)), 182);
        assert_eq!(days_between(at(2024, 7, 1, 0), at(2024, 1, 1, 0)), 182);
    }
}
