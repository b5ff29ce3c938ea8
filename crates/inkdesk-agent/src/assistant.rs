//! Chat completion through the backend's AI function.

use crate::types::{ChatMessage, ChatRequest, ChatResponse};
use async_trait::async_trait;
use inkdesk_core::gateway::{Gateway, GatewayError};
use std::sync::Arc;

/// Anything that can answer a chat transcript with text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, GatewayError>;
}

/// Calls a named gateway function with `{messages}` and reads `{content}`.
pub struct FunctionAssistant {
    gateway: Arc<dyn Gateway>,
    function: String,
}

impl FunctionAssistant {
    pub fn new(gateway: Arc<dyn Gateway>, function: impl Into<String>) -> Self {
        Self {
            gateway,
            function: function.into(),
        }
    }
}

#[async_trait]
impl CompletionBackend for FunctionAssistant {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, GatewayError> {
        let body = serde_json::to_value(ChatRequest { messages })
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        let raw = self.gateway.invoke(&self.function, body).await?;
        let reply: ChatResponse =
            serde_json::from_value(raw).map_err(|e| GatewayError::Decode(e.to_string()))?;
        if let Some(message) = reply.error {
            return Err(GatewayError::Function {
                name: self.function.clone(),
                message,
            });
        }
        Ok(reply.content.unwrap_or_default())
    }
}
