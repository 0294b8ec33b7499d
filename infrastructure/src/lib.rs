//! Infrastructure layer for expert-panel
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod export;
pub mod llm;
pub mod logging;
pub mod store;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileLlmConfig, FileLoggingConfig,
    FileOutputConfig, FilePanelConfig, FilePersistenceConfig, StoreBackend, ValidationScope,
};
pub use export::FileTranscriptSink;
pub use llm::{
    AzureOpenAiClient, ChatCompletion, ChatMessage, ClientRegistry, ClientRole, LlmError,
    LlmResponder, LlmSpeakerSelection,
};
pub use logging::JsonlConversationLogger;
pub use store::{FsDocumentStore, InMemoryDocumentStore, build_store};
