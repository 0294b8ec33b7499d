//! Azure OpenAI adapters
//!
//! - [`AzureOpenAiClient`]: REST chat completions for one deployment
//! - [`ClientRegistry`]: lazily built chat and reasoning clients
//! - [`LlmResponder`] / [`LlmSpeakerSelection`]: the application ports over a client

pub mod azure_openai;
pub mod error;
pub mod registry;
pub mod responder;

pub use azure_openai::{AzureOpenAiClient, ChatCompletion, ChatMessage};
pub use error::LlmError;
pub use registry::{ClientRegistry, ClientRole};
pub use responder::{LlmResponder, LlmSpeakerSelection, STOP_TOKEN};
