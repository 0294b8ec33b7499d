//! Responder profiles: who sits on the panel.

use serde::{Deserialize, Serialize};

/// Role of a responder within the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponderRole {
    /// A domain expert that contributes opinions every turn
    #[default]
    Expert,
    /// Proposes new topics once the discussion converges.
    ///
    /// Only eligible after a streak of affirmative turns.
    Reflection,
}

/// Static description of one panel member (Value Object)
///
/// The `description` is what the speaker selector sees; the
/// `system_message` is what the responder's own model is primed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponderProfile {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub system_message: String,
    #[serde(default)]
    pub role: ResponderRole,
}

impl ResponderProfile {
    pub fn expert(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            system_message: String::new(),
            role: ResponderRole::Expert,
        }
    }

    pub fn reflection(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            role: ResponderRole::Reflection,
            ..Self::expert(name, description)
        }
    }

    pub fn with_system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = system_message.into();
        self
    }

    pub fn is_reflection(&self) -> bool {
        self.role == ResponderRole::Reflection
    }
}
