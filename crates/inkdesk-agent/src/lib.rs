//! `inkdesk-agent`: the network side of the action layer.
//!
//! # Architecture
//!
//! ```text
//! staff text
//!     │
//!     ▼
//! CommandSession      ← latest-wins slot; confirm() returns the Action
//!     │
//!     ▼
//! CommandInterpreter  ← system prompt from the registry, timeout, parsing
//!     │
//!     ▼
//! FunctionAssistant   ← {messages} → {content} via Gateway::invoke
//!     │
//!     ▼
//! RestGateway         ← reqwest client for records, storage and functions
//! ```
//!
//! The dispatcher in `inkdesk-core` uses the same [`RestGateway`] for its
//! remote side effects.

pub mod assistant;
pub mod error;
pub mod interpreter;
pub mod rest;
pub mod types;

pub use assistant::{CompletionBackend, FunctionAssistant};
pub use error::AgentError;
pub use interpreter::{CommandInterpreter, CommandSession, Submission};
pub use rest::RestGateway;
pub use types::{ChatMessage, ChatRequest, ChatResponse, Role};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, AgentError>;
