mod format;
pub mod set;

pub use format::{format_date, format_timestamp, parse_report_date, parse_stored_date, unix_now};
