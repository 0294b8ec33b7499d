//! Selector prompt template.
//!
//! The template is plain text with three placeholders:
//!
//! | Placeholder | Rendered as |
//! |-------------|-------------|
//! | `{roles}` | one `name: description` line per eligible responder |
//! | `{participants}` | `[a, b, c]` list of eligible names |
//! | `{history}` | one `source: content` paragraph per committed turn |

use crate::conversation::entities::TranscriptEntry;
use crate::panel::roster::Roster;
use serde::{Deserialize, Serialize};

/// Default speaker selection instruction.
pub const DEFAULT_SELECTOR_PROMPT: &str = r#"Select the agent that should perform the next task.
{roles}

Conversation history:
{history}

## Task
- Review the conversation history above.
- If three affirmative opinions have been given in a row, select reflection_agent so that it can start a discussion on a new topic. Otherwise do not select reflection_agent.
- After reading the conversation history, choose exactly one agent from {participants} to perform the next task.
- Prefer an agent that can bring a new idea to the current discussion.
- Select exactly one agent and answer with its name only.
"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectorPrompt {
    template: String,
}

impl Default for SelectorPrompt {
    fn default() -> Self {
        Self::new(DEFAULT_SELECTOR_PROMPT)
    }
}

impl SelectorPrompt {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn render_roles(roster: &Roster, eligible: &[String]) -> String {
        eligible
            .iter()
            .map(|name| match roster.get(name) {
                Some(profile) => format!("{}: {}", profile.name, profile.description),
                None => name.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render_participants(eligible: &[String]) -> String {
        format!("[{}]", eligible.join(", "))
    }

    pub fn render_history(transcript: &[TranscriptEntry]) -> String {
        transcript
            .iter()
            .map(|e| format!("{}: {}", e.source, e.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Fill all placeholders
    pub fn render(&self, roster: &Roster, eligible: &[String], transcript: &[TranscriptEntry]) -> String {
        self.template
            .replace("{roles}", &Self::render_roles(roster, eligible))
            .replace("{participants}", &Self::render_participants(eligible))
            .replace("{history}", &Self::render_history(transcript))
    }
}
