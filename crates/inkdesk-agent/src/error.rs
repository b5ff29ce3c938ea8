use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("gateway is not configured: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Core(#[from] inkdesk_core::InkdeskError),
}
