//! Console output for panel runs and stored sessions

use colored::Colorize;
use panel_application::{RunOutcome, RunStatus};
use panel_domain::{MessageDocument, SessionDocument, SessionStats, TranscriptEntry, util};
use serde_json::json;

/// Characters of a message shown in session listings
const LIST_PREVIEW_CHARS: usize = 60;

/// Formats panel output for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Banner shown before the first turn
    pub fn run_header(task: &str, roster: &[String]) -> String {
        let mut output = Self::header("Expert Panel");
        output.push_str(&format!("\n{} {}\n", "Task:".cyan().bold(), task));
        output.push_str(&format!("{} {}\n", "Panel:".cyan().bold(), roster.join(", ")));
        output
    }

    /// One committed turn
    pub fn turn(entry: &TranscriptEntry, turn: usize) -> String {
        format!(
            "\n{}\n{}\n",
            format!("── [{}] {} ──", turn, entry.source).yellow().bold(),
            entry.content
        )
    }

    /// Final report: status line, counts and timing
    pub fn report(outcome: &RunOutcome) -> String {
        let mut output = Self::section_header("Run Summary");

        let status = match &outcome.status {
            RunStatus::Completed => "Completed".green().bold(),
            RunStatus::CompletedWithReason(_) => "Completed early".yellow().bold(),
            RunStatus::Failed(_) => "Failed".red().bold(),
        };
        output.push_str(&format!("{} {}\n", "Status:".cyan().bold(), status));
        if let Some(reason) = outcome.reason() {
            output.push_str(&format!("{} {}\n", "Reason:".cyan().bold(), reason));
        }

        output.push_str(&Self::stats(&outcome.stats));

        if outcome.persisted {
            output.push_str(&format!(
                "{} {}\n",
                "Session:".cyan().bold(),
                outcome.session_id
            ));
        }
        if outcome.persistence_failures > 0 {
            output.push_str(&format!(
                "{} {} store call(s) failed; the stored session may be incomplete\n",
                "Warning:".yellow().bold(),
                outcome.persistence_failures
            ));
        }
        if let Some(location) = &outcome.export_location {
            output.push_str(&format!("{} {}\n", "Transcript:".cyan().bold(), location));
        }

        output.push_str(&Self::footer());
        output
    }

    fn stats(stats: &SessionStats) -> String {
        let mut output = format!(
            "{} {} in {}\n",
            "Messages:".cyan().bold(),
            stats.total_messages,
            stats.execution_time_formatted
        );
        for (name, count) in &stats.agent_message_counts {
            output.push_str(&format!("  {:<24} {}\n", name, count));
        }
        output
    }

    /// Final report as JSON
    pub fn report_json(outcome: &RunOutcome) -> String {
        let value = json!({
            "session_id": outcome.session_id,
            "status": outcome.status.as_str(),
            "reason": outcome.reason(),
            "persisted": outcome.persisted,
            "persistence_failures": outcome.persistence_failures,
            "export_location": outcome.export_location,
            "statistics": outcome.stats,
            "transcript": outcome.transcript,
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    /// Recent sessions, one block each
    pub fn session_list(sessions: &[SessionDocument]) -> String {
        if sessions.is_empty() {
            return "No stored sessions.\n".to_string();
        }

        let mut output = Self::section_header(&format!("Recent Sessions ({})", sessions.len()));
        for session in sessions {
            output.push_str(&format!(
                "{}  {}  {}\n",
                session.session_id.bold(),
                session.start_time.dimmed(),
                session.status.as_str()
            ));
            output.push_str(&format!(
                "  {} messages  {}\n",
                session.statistics.total_messages,
                util::preview(&session.task, LIST_PREVIEW_CHARS)
            ));
            if let Some(reason) = session
                .termination_reason
                .as_deref()
                .or(session.failure_reason.as_deref())
            {
                output.push_str(&format!("  {}\n", reason.dimmed()));
            }
        }
        output
    }

    /// A stored session replayed turn by turn
    pub fn replay(session: Option<&SessionDocument>, messages: &[MessageDocument]) -> String {
        let mut output = String::new();
        if let Some(session) = session {
            output.push_str(&Self::run_header(&session.task, &session.team_info.agent_names));
        }
        for message in messages {
            output.push_str(&format!(
                "\n{} {}\n{}\n",
                format!("── [{}] {} ──", message.sequence, message.source)
                    .yellow()
                    .bold(),
                message.timestamp.dimmed(),
                message.content
            ));
        }
        if messages.is_empty() {
            output.push_str("\nNo stored messages.\n");
        }
        output
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("{}\n", "=".repeat(60).cyan())
    }
}
