//! Built-in prompts: the default expert panel and its task.

pub mod personas;

pub use personas::PanelPrompts;
