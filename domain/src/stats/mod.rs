//! Session statistics derived from a transcript.
//!
//! [`SessionStats::from_transcript`] is a pure function: it can be called
//! mid-run for live reporting and again at completion for the persisted
//! final record. Its counts are cross-checked against the counters the
//! persistence pipeline maintains independently.

use crate::conversation::entities::TranscriptEntry;
use crate::core::timestamp::format_timestamp;
use crate::session::entities::SessionStatistics;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_messages: usize,
    pub agent_message_counts: BTreeMap<String, usize>,
    /// Wall-clock seconds from start to `session_end`
    pub execution_time: f64,
    pub execution_time_formatted: String,
    pub session_start: String,
    pub session_end: String,
    /// Roster echo
    pub agent_names: Vec<String>,
}

impl SessionStats {
    pub fn from_transcript(
        transcript: &[TranscriptEntry],
        started_at: DateTime<Local>,
        ended_at: DateTime<Local>,
        roster: &[String],
    ) -> Self {
        let mut agent_message_counts = BTreeMap::new();
        for entry in transcript {
            *agent_message_counts.entry(entry.source.clone()).or_insert(0) += 1;
        }

        let execution_time = (ended_at - started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        Self {
            total_messages: transcript.len(),
            agent_message_counts,
            execution_time,
            execution_time_formatted: format!("{:.2}s", execution_time),
            session_start: format_timestamp(started_at),
            session_end: format_timestamp(ended_at),
            agent_names: roster.to_vec(),
        }
    }

    /// Whether the persisted running counters agree with this transcript view
    pub fn matches(&self, persisted: &SessionStatistics) -> bool {
        persisted.total_messages == self.total_messages as u64
            && persisted.agent_message_counts.len() == self.agent_message_counts.len()
            && self.agent_message_counts.iter().all(|(name, count)| {
                persisted.agent_message_counts.get(name).copied() == Some(*count as u64)
            })
    }
}
