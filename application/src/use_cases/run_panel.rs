//! Run Panel use case
//!
//! Drives one panel discussion from task to closed session.
//!
//! ```text
//! Idle → SessionOpen → Selecting → AwaitingReply → Committing ─┬→ Selecting
//!                                                              └→ Closing → Closed
//! ```
//!
//! The loop is sequential: one selection and one reply in flight at a time.
//! Only persistence runs in the background, through a [`SessionWriter`].
//! Any path out of the loop, including failures, goes through `Closing` so
//! the session document does not stay `running`.

use crate::config::RunParams;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::responder::{Reply, Responder, ResponderError};
use crate::ports::speaker_selection::SelectionCapability;
use crate::ports::transcript_sink::TranscriptSink;
use crate::ports::turn_hook::TurnHook;
use crate::use_cases::persistence::{PersistOutcome, PersistencePipeline};
use crate::use_cases::session_writer::SessionWriter;
use crate::use_cases::speaker_selector::{SelectionError, SpeakerSelector};
use chrono::Local;
use panel_domain::session::ids;
use panel_domain::{
    EligibilityPolicy, Roster, SelectorPrompt, SessionStats, StopSignal, Task, TerminationCondition,
    Transcript, TranscriptEntry,
};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Source name of the task entry shown to responders and the selector
pub const TASK_SOURCE: &str = "user";

/// Errors that prevent a run from starting, or end it as failed
#[derive(Error, Debug)]
pub enum RunPanelError {
    #[error("No responder registered for roster member '{0}'")]
    MissingResponder(String),

    #[error("Speaker selection failed: {0}")]
    Selection(#[from] SelectionError),

    #[error("Responder '{responder}' failed: {source}")]
    Reply {
        responder: String,
        #[source]
        source: ResponderError,
    },

    #[error("Responder '{responder}' did not reply within {timeout:?}")]
    ReplyTimeout { responder: String, timeout: Duration },
}

/// How a run ended, as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// The termination condition fired
    Completed,
    /// Ended early: stop token, hard turn cap, or cancellation
    CompletedWithReason(String),
    Failed(String),
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::CompletedWithReason(_) => "completed_with_reason",
            RunStatus::Failed(_) => "failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RunStatus::Failed(_))
    }
}

/// Everything a caller gets back from a run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub session_id: String,
    pub status: RunStatus,
    /// Set when a termination condition fired
    pub termination: Option<StopSignal>,
    pub transcript: Transcript,
    pub stats: SessionStats,
    /// Whether the session document was created
    pub persisted: bool,
    /// Where the transcript was exported, if it was
    pub export_location: Option<String>,
    /// Store calls that failed during this run, plus turns abandoned when
    /// the writer missed its flush deadline
    pub persistence_failures: u64,
}

impl RunOutcome {
    /// The reason text for `completed_with_reason`/`failed`, or the
    /// termination reason for a normal completion.
    pub fn reason(&self) -> Option<&str> {
        match &self.status {
            RunStatus::Completed => self.termination.as_ref().map(|s| s.reason.as_str()),
            RunStatus::CompletedWithReason(reason) | RunStatus::Failed(reason) => Some(reason),
        }
    }
}

/// Input for the RunPanel use case
pub struct RunPanelInput {
    pub task: Task,
    pub roster: Roster,
    /// Overrides the condition built from [`RunParams`]
    pub termination: Option<Box<dyn TerminationCondition>>,
}

impl RunPanelInput {
    pub fn new(task: Task, roster: Roster) -> Self {
        Self {
            task,
            roster,
            termination: None,
        }
    }

    pub fn with_termination(mut self, termination: impl TerminationCondition + 'static) -> Self {
        self.termination = Some(Box::new(termination));
        self
    }
}

/// Why the loop left `Selecting`/`AwaitingReply`/`Committing`
enum CloseReason {
    Terminated(StopSignal),
    Stopped { responder: String, reason: String },
    HardCap(usize),
    Cancelled,
    Failed(RunPanelError),
}

enum TurnState {
    Selecting,
    AwaitingReply { speaker: String },
    Committing { entry: TranscriptEntry },
    Closing(CloseReason),
}

/// Use case for running a panel discussion
pub struct RunPanelUseCase {
    responders: HashMap<String, Arc<dyn Responder>>,
    capability: Arc<dyn SelectionCapability>,
    prompt: SelectorPrompt,
    policy: Option<EligibilityPolicy>,
    persistence: Arc<PersistencePipeline>,
    hooks: Vec<Arc<dyn TurnHook>>,
    logger: Arc<dyn ConversationLogger>,
    sink: Option<Arc<dyn TranscriptSink>>,
    params: RunParams,
}

impl RunPanelUseCase {
    pub fn new(
        responders: Vec<Arc<dyn Responder>>,
        capability: Arc<dyn SelectionCapability>,
        params: RunParams,
    ) -> Self {
        Self {
            responders: responders
                .into_iter()
                .map(|r| (r.name().to_string(), r))
                .collect(),
            capability,
            prompt: SelectorPrompt::default(),
            policy: None,
            persistence: Arc::new(PersistencePipeline::disabled()),
            hooks: Vec::new(),
            logger: Arc::new(NoConversationLogger),
            sink: None,
            params,
        }
    }

    pub fn with_persistence(mut self, persistence: Arc<PersistencePipeline>) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn with_selector_prompt(mut self, prompt: SelectorPrompt) -> Self {
        self.prompt = prompt;
        self
    }

    /// Replace the eligibility policy derived from [`RunParams`]
    pub fn with_policy(mut self, policy: EligibilityPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn TurnHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_transcript_sink(mut self, sink: Arc<dyn TranscriptSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn params(&self) -> &RunParams {
        &self.params
    }

    fn selector(&self) -> SpeakerSelector {
        let policy = self.policy.clone().unwrap_or_else(|| {
            EligibilityPolicy::default()
                .with_repeated_speaker(self.params.allow_repeated_speaker)
                .with_affirmative_streak(self.params.affirmative_streak)
        });
        SpeakerSelector::new(Arc::clone(&self.capability))
            .with_prompt(self.prompt.clone())
            .with_policy(policy)
            .with_timeout(self.params.selection_timeout)
    }

    /// Execute without external cancellation
    pub async fn execute(&self, input: RunPanelInput) -> Result<RunOutcome, RunPanelError> {
        self.execute_with_cancel(input, &CancellationToken::new())
            .await
    }

    /// Execute the run. `cancel` is honoured between turns.
    ///
    /// Returns `Err` only when the run cannot start. Failures once the
    /// session is open end the run with [`RunStatus::Failed`].
    pub async fn execute_with_cancel(
        &self,
        input: RunPanelInput,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, RunPanelError> {
        let RunPanelInput {
            task,
            roster,
            termination,
        } = input;

        // ==================== Idle ====================
        if let Some(missing) = roster
            .names()
            .into_iter()
            .find(|name| !self.responders.contains_key(name))
        {
            return Err(RunPanelError::MissingResponder(missing));
        }
        let mut termination = termination.unwrap_or_else(|| self.params.termination_for(&roster));
        let selector = self.selector();
        let started_at = Local::now();
        let failures_before = self.persistence.failure_count();

        // ==================== SessionOpen ====================
        let team_info = self.params.team_info(&roster);
        let (session_id, writer) = match self
            .persistence
            .create_session(task.content(), team_info)
            .await
        {
            PersistOutcome::Persisted(id) => {
                let writer = SessionWriter::spawn(Arc::clone(&self.persistence), id.clone());
                (id, Some(writer))
            }
            PersistOutcome::NotPersisted => {
                if self.persistence.is_enabled() {
                    warn!("Session could not be persisted; continuing without persistence");
                }
                (ids::session_id(started_at), None)
            }
        };

        info!(
            session_id = %session_id,
            "Starting panel with {} responders", roster.len()
        );
        self.logger.log(ConversationEvent::session_started(
            &session_id,
            task.content(),
            &roster.names(),
            writer.is_some(),
        ));

        let task_entry = TranscriptEntry::text(TASK_SOURCE, task.content());
        let mut transcript = Transcript::new();

        // ==================== Turn loop ====================
        let mut state = TurnState::Selecting;
        let close_reason = loop {
            state = match state {
                TurnState::Selecting => {
                    if cancel.is_cancelled() {
                        TurnState::Closing(CloseReason::Cancelled)
                    } else if transcript.len() >= self.params.max_turns {
                        TurnState::Closing(CloseReason::HardCap(self.params.max_turns))
                    } else {
                        let history = conversation_view(&task_entry, &transcript);
                        match selector
                            .select(
                                &roster,
                                transcript.entries(),
                                &history,
                                self.params.selection_retries,
                            )
                            .await
                        {
                            Ok((selection, eligibility)) => {
                                let turn = transcript.len() + 1;
                                debug!(
                                    session_id = %session_id,
                                    turn,
                                    speaker = %selection.speaker,
                                    streak = eligibility.streak,
                                    "Speaker selected"
                                );
                                self.logger.log(ConversationEvent::speaker_selected(
                                    &session_id,
                                    turn,
                                    &selection.speaker,
                                    &eligibility.names,
                                    eligibility.streak,
                                ));
                                for hook in &self.hooks {
                                    guard_hook("on_speaker_selected", || {
                                        hook.on_speaker_selected(&selection.speaker, &eligibility.names);
                                        Ok(())
                                    });
                                }
                                TurnState::AwaitingReply {
                                    speaker: selection.speaker,
                                }
                            }
                            Err(e) => TurnState::Closing(CloseReason::Failed(e.into())),
                        }
                    }
                }

                TurnState::AwaitingReply { speaker } => {
                    match self.request_reply(&speaker, &task_entry, &transcript).await {
                        Ok(Reply::Message { content }) => TurnState::Committing {
                            entry: TranscriptEntry::text(speaker, content),
                        },
                        Ok(Reply::Stop { reason }) => TurnState::Closing(CloseReason::Stopped {
                            responder: speaker,
                            reason,
                        }),
                        Err(e) => TurnState::Closing(CloseReason::Failed(e)),
                    }
                }

                TurnState::Committing { entry } => {
                    let turn = transcript.push(entry.clone());
                    info!(session_id = %session_id, turn, source = %entry.source, "Turn committed");
                    self.logger.log(ConversationEvent::turn_committed(
                        &session_id,
                        turn,
                        &entry.source,
                        &entry.content,
                    ));
                    for hook in &self.hooks {
                        guard_hook("on_message", || hook.on_message(&entry, turn));
                    }

                    let signal = termination.check(std::slice::from_ref(&entry));

                    if let Some(writer) = &writer
                        && !writer.enqueue(entry)
                    {
                        warn!(session_id = %session_id, "Session writer stopped; turn {} not queued", turn);
                    }

                    match signal {
                        Some(signal) => TurnState::Closing(CloseReason::Terminated(signal)),
                        None => TurnState::Selecting,
                    }
                }

                TurnState::Closing(reason) => break reason,
            };
        };

        // ==================== Closing ====================
        let outcome = self
            .close(
                session_id,
                writer,
                close_reason,
                transcript,
                &roster,
                started_at,
                failures_before,
            )
            .await;

        for hook in &self.hooks {
            guard_hook("on_run_finished", || {
                hook.on_run_finished(&outcome);
                Ok(())
            });
        }
        Ok(outcome)
    }

    async fn request_reply(
        &self,
        speaker: &str,
        task_entry: &TranscriptEntry,
        transcript: &Transcript,
    ) -> Result<Reply, RunPanelError> {
        let responder = self
            .responders
            .get(speaker)
            .ok_or_else(|| RunPanelError::MissingResponder(speaker.to_string()))?;
        let history = conversation_view(task_entry, transcript);

        match tokio::time::timeout(self.params.reply_timeout, responder.generate(&history)).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(source)) => Err(RunPanelError::Reply {
                responder: speaker.to_string(),
                source,
            }),
            Err(_) => Err(RunPanelError::ReplyTimeout {
                responder: speaker.to_string(),
                timeout: self.params.reply_timeout,
            }),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn close(
        &self,
        session_id: String,
        writer: Option<SessionWriter>,
        reason: CloseReason,
        transcript: Transcript,
        roster: &Roster,
        started_at: chrono::DateTime<Local>,
        failures_before: u64,
    ) -> RunOutcome {
        let persisted = writer.is_some();
        let mut abandoned = 0;
        if let Some(writer) = writer {
            let report = writer.finish(self.params.flush_timeout).await;
            debug!(
                session_id = %session_id,
                "Writer finished: {} appended, {} failed, {} abandoned",
                report.appended, report.failed, report.abandoned
            );
            abandoned = report.abandoned;
        }

        let stats = SessionStats::from_transcript(
            transcript.entries(),
            started_at,
            Local::now(),
            &roster.names(),
        );

        let (status, termination) = match reason {
            CloseReason::Terminated(signal) => {
                info!(session_id = %session_id, "Terminated: {}", signal.reason);
                (RunStatus::Completed, Some(signal))
            }
            CloseReason::Stopped { responder, reason } => {
                info!(session_id = %session_id, "'{}' requested stop: {}", responder, reason);
                (RunStatus::CompletedWithReason(reason), None)
            }
            CloseReason::HardCap(cap) => {
                warn!(session_id = %session_id, "Hard turn cap {} reached", cap);
                (
                    RunStatus::CompletedWithReason(format!("Hard turn cap of {} turns reached", cap)),
                    None,
                )
            }
            CloseReason::Cancelled => {
                info!(session_id = %session_id, "Run cancelled");
                (RunStatus::CompletedWithReason("Run cancelled".to_string()), None)
            }
            CloseReason::Failed(e) => {
                error!(session_id = %session_id, "Run failed: {}", e);
                (RunStatus::Failed(e.to_string()), None)
            }
        };

        if persisted {
            match &status {
                RunStatus::Failed(reason) => {
                    self.persistence
                        .fail_session(&session_id, stats.execution_time, stats.clone(), reason)
                        .await;
                }
                RunStatus::Completed | RunStatus::CompletedWithReason(_) => {
                    let reason = match &status {
                        RunStatus::CompletedWithReason(r) => Some(r.clone()),
                        _ => termination.as_ref().map(|s| s.reason.clone()),
                    };
                    self.persistence
                        .complete_session(&session_id, stats.execution_time, stats.clone(), reason)
                        .await;
                }
            }
        }

        let export_location = match (&self.sink, status.is_failed()) {
            (Some(sink), false) => match sink.export(transcript.entries()) {
                Ok(location) => {
                    info!(session_id = %session_id, "Transcript exported to {}", location);
                    Some(location)
                }
                Err(e) => {
                    warn!(session_id = %session_id, "Transcript export failed: {}", e);
                    None
                }
            },
            _ => None,
        };

        let outcome = RunOutcome {
            session_id,
            status,
            termination,
            transcript,
            stats,
            persisted,
            export_location,
            persistence_failures: self
                .persistence
                .failure_count()
                .saturating_sub(failures_before)
                + abandoned,
        };

        self.logger.log(ConversationEvent::run_finished(
            &outcome.session_id,
            outcome.status.as_str(),
            outcome.reason(),
            outcome.stats.total_messages,
            outcome.stats.execution_time,
        ));
        outcome
    }
}

/// The task entry followed by every committed turn
fn conversation_view(task_entry: &TranscriptEntry, transcript: &Transcript) -> Vec<TranscriptEntry> {
    std::iter::once(task_entry.clone())
        .chain(transcript.entries().iter().cloned())
        .collect()
}

/// Run a hook, logging and swallowing errors and panics
fn guard_hook<F>(name: &str, f: F)
where
    F: FnOnce() -> Result<(), crate::ports::turn_hook::HookError>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Turn hook '{}' failed: {}", name, e),
        Err(_) => error!("Turn hook '{}' panicked", name),
    }
}
