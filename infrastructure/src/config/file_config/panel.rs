//! Panel configuration from TOML (`[panel]` and `[termination]` sections)

use panel_domain::{
    AffirmationDetector, DomainError, EligibilityPolicy, PanelPrompts, ResponderProfile,
    ResponderRole, Roster, SelectorPrompt,
};
use serde::{Deserialize, Serialize};

/// One `[[panel.responders]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileResponderConfig {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub system_message: String,
    #[serde(default)]
    pub role: ResponderRole,
}

impl From<&FileResponderConfig> for ResponderProfile {
    fn from(config: &FileResponderConfig) -> Self {
        ResponderProfile {
            name: config.name.clone(),
            description: config.description.clone(),
            system_message: config.system_message.clone(),
            role: config.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePanelConfig {
    /// Task used when none is given on the command line
    pub task: Option<String>,
    /// Replaces the built-in selector instruction
    pub selector_prompt: Option<String>,
    /// Empty means the built-in six-member panel
    pub responders: Vec<FileResponderConfig>,
    /// Affirmative turns in a row before reflection may speak
    pub affirmative_streak: usize,
    pub affirmative_keywords: Option<Vec<String>>,
    pub negating_keywords: Option<Vec<String>>,
}

impl Default for FilePanelConfig {
    fn default() -> Self {
        Self {
            task: None,
            selector_prompt: None,
            responders: Vec::new(),
            affirmative_streak: 3,
            affirmative_keywords: None,
            negating_keywords: None,
        }
    }
}

impl FilePanelConfig {
    pub fn roster(&self) -> Result<Roster, DomainError> {
        if self.responders.is_empty() {
            return PanelPrompts::default_roster();
        }
        Roster::new(self.responders.iter().map(ResponderProfile::from).collect())
    }

    pub fn task_or_default(&self) -> String {
        self.task
            .clone()
            .unwrap_or_else(|| PanelPrompts::default_task().to_string())
    }

    pub fn selector_prompt(&self) -> SelectorPrompt {
        self.selector_prompt
            .as_deref()
            .map(SelectorPrompt::new)
            .unwrap_or_default()
    }

    pub fn eligibility_policy(&self, allow_repeated_speaker: bool) -> EligibilityPolicy {
        let mut detector = AffirmationDetector::default();
        if let Some(words) = &self.affirmative_keywords {
            detector.affirmative = words.clone();
        }
        if let Some(words) = &self.negating_keywords {
            detector.negating = words.clone();
        }
        EligibilityPolicy {
            allow_repeated_speaker,
            affirmative_streak: self.affirmative_streak,
            detector,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTerminationConfig {
    pub max_messages: usize,
    pub reflection_agent_max_count: usize,
    pub allow_repeated_speaker: bool,
    /// Hard turn cap, independent of `max_messages`
    pub max_turns: usize,
}

impl Default for FileTerminationConfig {
    fn default() -> Self {
        Self {
            max_messages: 100,
            reflection_agent_max_count: 3,
            allow_repeated_speaker: false,
            max_turns: 200,
        }
    }
}
