use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Date as printed on reports, e.g. "March 4, 2025".
pub fn report_date(dt: DateTime<Utc>) -> String {
    dt.format("%B %-d, %Y").to_string()
}

/// Compact stamp used in generated file names.
pub fn file_stamp(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%d").to_string()
}
