//! Session and message documents as persisted in the document store.
//!
//! Both live in one logical container partitioned by `session_id` and are
//! told apart by their `type` field (`"session"` / `"message"`).

use crate::conversation::entities::{MessageKind, TranscriptEntry};
use crate::core::error::DomainError;
use crate::core::timestamp::format_timestamp;
use crate::stats::SessionStats;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SESSION_DOCUMENT_TYPE: &str = "session";
pub const MESSAGE_DOCUMENT_TYPE: &str = "message";

/// Documents never expire.
pub const NO_EXPIRY: i64 = -1;

/// Lifecycle of a session. Only `running -> completed` and
/// `running -> failed` are valid transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::Running, SessionStatus::Completed)
                | (SessionStatus::Running, SessionStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Running)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Running counters kept on the session document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatistics {
    pub total_messages: u64,
    pub agent_message_counts: BTreeMap<String, u64>,
}

impl SessionStatistics {
    pub fn record(&mut self, responder: &str) {
        self.total_messages += 1;
        *self
            .agent_message_counts
            .entry(responder.to_string())
            .or_insert(0) += 1;
    }
}

/// Snapshot of the panel configuration at session start
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub agent_count: usize,
    pub agent_names: Vec<String>,
    pub max_messages: usize,
    pub reflection_agent_max_count: usize,
    pub allow_repeated_speaker: bool,
}

/// The durable summary record of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    pub id: String,
    /// Partition key; always equal to `id`
    pub session_id: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub date: String,
    /// Unix seconds at start, used to order sessions by recency
    pub timestamp: f64,
    pub task: String,
    pub start_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub status: SessionStatus,
    pub team_info: TeamInfo,
    pub statistics: SessionStatistics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_statistics: Option<SessionStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub ttl: i64,
}

impl SessionDocument {
    pub fn open(
        session_id: impl Into<String>,
        task: impl Into<String>,
        team_info: TeamInfo,
        now: DateTime<Local>,
    ) -> Self {
        let session_id = session_id.into();
        let stamp = format_timestamp(now);
        Self {
            id: session_id.clone(),
            session_id,
            doc_type: SESSION_DOCUMENT_TYPE.to_string(),
            date: now.format("%Y-%m-%d").to_string(),
            timestamp: now.timestamp_millis() as f64 / 1000.0,
            task: task.into(),
            start_time: stamp.clone(),
            end_time: None,
            status: SessionStatus::Running,
            team_info,
            statistics: SessionStatistics::default(),
            execution_time: None,
            final_statistics: None,
            termination_reason: None,
            failure_reason: None,
            created_at: stamp.clone(),
            updated_at: stamp,
            ttl: NO_EXPIRY,
        }
    }

    pub fn record_message(&mut self, responder: &str, now: DateTime<Local>) {
        self.statistics.record(responder);
        self.updated_at = format_timestamp(now);
    }

    fn transition(&mut self, next: SessionStatus, now: DateTime<Local>) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        let stamp = format_timestamp(now);
        self.end_time = Some(stamp.clone());
        self.updated_at = stamp;
        Ok(())
    }

    pub fn complete(
        &mut self,
        execution_time: f64,
        final_stats: SessionStats,
        termination_reason: Option<String>,
        now: DateTime<Local>,
    ) -> Result<(), DomainError> {
        self.transition(SessionStatus::Completed, now)?;
        self.execution_time = Some(execution_time);
        self.final_statistics = Some(final_stats);
        self.termination_reason = termination_reason;
        Ok(())
    }

    pub fn fail(
        &mut self,
        execution_time: f64,
        final_stats: SessionStats,
        reason: impl Into<String>,
        now: DateTime<Local>,
    ) -> Result<(), DomainError> {
        self.transition(SessionStatus::Failed, now)?;
        self.execution_time = Some(execution_time);
        self.final_statistics = Some(final_stats);
        self.failure_reason = Some(reason.into());
        Ok(())
    }
}

/// One persisted turn. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDocument {
    pub id: String,
    pub session_id: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub source: String,
    pub content: String,
    pub message_type: MessageKind,
    pub timestamp: String,
    /// 1-based, gap-free position within the session
    pub sequence: u64,
    pub created_at: String,
    pub ttl: i64,
}

impl MessageDocument {
    pub fn new(
        session_id: &str,
        sequence: u64,
        entry: &TranscriptEntry,
        now: DateTime<Local>,
    ) -> Self {
        Self {
            id: super::ids::message_id(session_id, sequence, now.timestamp_micros()),
            session_id: session_id.to_string(),
            doc_type: MESSAGE_DOCUMENT_TYPE.to_string(),
            source: entry.source.clone(),
            content: entry.content.clone(),
            message_type: entry.kind,
            timestamp: entry.timestamp.clone(),
            sequence,
            created_at: format_timestamp(now),
            ttl: NO_EXPIRY,
        }
    }

    pub fn to_entry(&self) -> TranscriptEntry {
        TranscriptEntry {
            source: self.source.clone(),
            content: self.content.clone(),
            kind: self.message_type,
            timestamp: self.timestamp.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> SessionDocument {
        SessionDocument::open("session_1", "Plan an app", TeamInfo::default(), Local::now())
    }

    #[test]
    fn test_open_session_is_running() {
        let doc = open();
        assert_eq!(doc.status, SessionStatus::Running);
        assert_eq!(doc.id, doc.session_id);
        assert_eq!(doc.doc_type, "session");
        assert_eq!(doc.statistics.total_messages, 0);
        assert_eq!(doc.ttl, -1);
    }

    #[test]
    fn test_record_message_counts() {
        let mut doc = open();
        doc.record_message("a", Local::now());
        doc.record_message("b", Local::now());
        doc.record_message("a", Local::now());
        assert_eq!(doc.statistics.total_messages, 3);
        assert_eq!(doc.statistics.agent_message_counts["a"], 2);
        assert_eq!(doc.statistics.agent_message_counts["b"], 1);
    }

    #[test]
    fn test_only_running_transitions() {
        let mut doc = open();
        doc.complete(1.5, SessionStats::default(), None, Local::now())
            .unwrap();
        assert_eq!(doc.status, SessionStatus::Completed);
        assert!(doc.end_time.is_some());

        let err = doc
            .fail(2.0, SessionStats::default(), "late failure", Local::now())
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidStatusTransition {
                from: "completed".into(),
                to: "failed".into()
            }
        );
        assert!(!SessionStatus::Failed.can_transition_to(SessionStatus::Running));
    }

    #[test]
    fn test_session_document_json_shape() {
        let doc = open();
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["type"], "session");
        assert_eq!(value["status"], "running");
        assert!(value.get("end_time").is_none());
    }

    #[test]
    fn test_message_document_from_entry() {
        let entry = TranscriptEntry::text("market_analyst", "hello").with_timestamp("t0");
        let doc = MessageDocument::new("session_1", 7, &entry, Local::now());
        assert!(doc.id.starts_with("session_1_msg_0007_"));
        assert_eq!(doc.sequence, 7);
        assert_eq!(doc.doc_type, "message");
        assert_eq!(doc.to_entry(), entry);
    }
}
