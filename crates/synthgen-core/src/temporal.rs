//! ISO-8601 parsing and canonical formatting for date-like values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn parse_date_value(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

pub fn parse_timestamp_value(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.naive_utc())
        .or_else(|| NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).ok())
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok())
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").ok())
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f").ok())
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").ok())
}

/// Accepts either a plain date (midnight) or a full timestamp.
pub fn parse_iso(value: &str) -> Option<NaiveDateTime> {
    parse_timestamp_value(value).or_else(|| {
        parse_date_value(value).map(|date| NaiveDateTime::new(date, NaiveTime::MIN))
    })
}

pub fn format_date(value: NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

pub fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dates_and_timestamps() {
        assert!(parse_iso("2024-02-29").is_some());
        assert!(parse_iso("2024-02-29T10:15:00").is_some());
        assert!(parse_iso("2024-02-29T10:15:00Z").is_some());
        assert!(parse_iso("2024-02-29 10:15:00").is_some());
        assert!(parse_iso("29/02/2024").is_none());
        assert!(parse_iso("2023-02-29").is_none());
    }
}
