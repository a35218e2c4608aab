use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Parse a report date in the diff script's `YYYY/MM/DD` form
pub fn parse_report_date(s: &str) -> Result<Date, time::error::Parse> {
    Date::parse(s.trim(), format_description!("[year]/[month]/[day]"))
}

/// Format a date as YYYY-MM-DD, the form stored in the database
pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Parse a stored YYYY-MM-DD date
pub fn parse_stored_date(s: &str) -> Result<Date, time::error::Parse> {
    Date::parse(s, format_description!("[year]-[month]-[day]"))
}

/// Format a Unix timestamp as YYYY-MM-DD string
pub fn format_timestamp(timestamp: i64) -> String {
    if timestamp == 0 {
        return "unknown".to_string();
    }

    OffsetDateTime::from_unix_timestamp(timestamp)
        .ok()
        .map(|dt| format_date(dt.date()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Current wall-clock time in Unix seconds
pub fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
