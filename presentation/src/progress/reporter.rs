//! Live progress for a panel run

use crate::output::console::ConsoleFormatter;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use panel_application::{HookError, RunOutcome, TurnHook};
use panel_domain::TranscriptEntry;
use std::sync::Mutex;
use std::time::Duration;

/// Prints each turn as it is committed, with a spinner while the chosen
/// responder is thinking.
pub struct ProgressReporter {
    spinner: Mutex<Option<ProgressBar>>,
    show_spinner: bool,
    print_turns: bool,
}

impl ProgressReporter {
    pub fn new(show_spinner: bool, print_turns: bool) -> Self {
        Self {
            spinner: Mutex::new(None),
            show_spinner,
            print_turns,
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn clear_spinner(&self) {
        if let Ok(mut slot) = self.spinner.lock()
            && let Some(pb) = slot.take()
        {
            pb.finish_and_clear();
        }
    }
}

impl TurnHook for ProgressReporter {
    fn on_speaker_selected(&self, speaker: &str, eligible: &[String]) {
        if !self.show_spinner {
            return;
        }
        self.clear_spinner();

        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::spinner_style());
        pb.set_prefix(speaker.to_string());
        pb.set_message(format!("is thinking... ({} eligible)", eligible.len()));
        pb.enable_steady_tick(Duration::from_millis(100));

        if let Ok(mut slot) = self.spinner.lock() {
            *slot = Some(pb);
        }
    }

    fn on_message(&self, entry: &TranscriptEntry, turn: usize) -> Result<(), HookError> {
        self.clear_spinner();
        if self.print_turns {
            print!("{}", ConsoleFormatter::turn(entry, turn));
        }
        Ok(())
    }

    fn on_run_finished(&self, _outcome: &RunOutcome) {
        self.clear_spinner();
    }
}

/// Plain one-line-per-turn progress (no spinner, no content)
pub struct SimpleProgress;

impl TurnHook for SimpleProgress {
    fn on_message(&self, entry: &TranscriptEntry, turn: usize) -> Result<(), HookError> {
        println!("  {} turn {} by {}", "v".green(), turn, entry.source);
        Ok(())
    }
}
