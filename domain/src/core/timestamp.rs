//! Timestamp formatting shared by transcripts and persisted documents.

use chrono::{DateTime, Local};

/// Millisecond-precision local timestamp, e.g. `2025-06-01 14:03:07.412`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub fn format_timestamp(at: DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn now_timestamp() -> String {
    format_timestamp(Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_has_millis() {
        let at = Local.with_ymd_and_hms(2025, 6, 1, 14, 3, 7).unwrap();
        assert_eq!(format_timestamp(at), "2025-06-01 14:03:07.000");
    }
}
