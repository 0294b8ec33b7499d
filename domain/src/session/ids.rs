//! Session and message identifiers.
//!
//! Session ids are time-based with a process-unique suffix; message ids add
//! the sequence number and a microsecond stamp so two writes within the same
//! clock tick still get distinct ids.

use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicU64, Ordering};

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `session_<YYYYmmdd_HHMMSS>_<pid><counter>`
pub fn session_id(now: DateTime<Local>) -> String {
    let n = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(
        "session_{}_{}{:04}",
        now.format("%Y%m%d_%H%M%S"),
        std::process::id(),
        n
    )
}

/// `<session_id>_msg_<sequence:04>_<unix micros>`
pub fn message_id(session_id: &str, sequence: u64, unix_micros: i64) -> String {
    format!("{}_msg_{:04}_{}", session_id, sequence, unix_micros)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_session_ids_unique_within_same_second() {
        let now = Local::now();
        let ids: HashSet<_> = (0..100).map(|_| session_id(now)).collect();
        assert_eq!(ids.len(), 100);
        assert!(ids.iter().all(|id| id.starts_with("session_")));
    }

    #[test]
    fn test_message_id_format() {
        assert_eq!(message_id("session_x", 3, 42), "session_x_msg_0003_42");
        assert_eq!(message_id("s", 12345, 1), "s_msg_12345_1");
    }
}
