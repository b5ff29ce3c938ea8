use thiserror::Error;

#[derive(Debug, Error)]
pub enum InkdeskError {
    #[error("not initialized: run 'inkdesk init'")]
    NotInitialized,

    #[error("unknown action type: {0}")]
    UnknownAction(String),

    #[error("unknown UI event: {0}")]
    UnknownEvent(String),

    #[error("unknown modal: {0}")]
    UnknownModal(String),

    #[error("the {0} form is not open")]
    ModalClosed(String),

    #[error("invalid payload for '{action}': {reason}")]
    InvalidPayload { action: String, reason: String },

    #[error("missing environment variable {0}")]
    MissingEnv(String),

    #[error(transparent)]
    Gateway(#[from] crate::gateway::GatewayError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InkdeskError>;
