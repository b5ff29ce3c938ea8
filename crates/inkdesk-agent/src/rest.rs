//! HTTP client for the managed backend.
//!
//! Records live under `/rest/v1/{collection}` (equality filters as
//! `column=eq.value`), files under `/storage/v1/object/{bucket}/{path}` and
//! serverless functions under `/functions/v1/{name}`. Every request carries
//! the API key both as `apikey` and as a bearer token.

use crate::error::AgentError;
use async_trait::async_trait;
use inkdesk_core::config::GatewayConfig;
use inkdesk_core::gateway::{ChangeEvent, ChangeFeed, ChangeKind, Filter, Gateway, GatewayError};
use reqwest::{header, Method, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::broadcast;

pub struct RestGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    feed: ChangeFeed,
}

impl RestGateway {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(AgentError::Config("gateway.url is empty".to_string()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
            feed: ChangeFeed::default(),
        })
    }

    /// Build from the `gateway` config section; the key is read from the
    /// configured environment variable.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, AgentError> {
        let key = config.api_key()?;
        Self::new(&config.url, key, Duration::from_secs(config.timeout_secs))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn rows(&self, method: Method, collection: &str) -> RequestBuilder {
        self.request(method, &format!("/rest/v1/{collection}"))
            .header("Prefer", "return=representation")
    }

    /// Public URL of an uploaded object.
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{bucket}/{path}",
            self.base_url
        )
    }
}

fn transport(e: reqwest::Error) -> GatewayError {
    GatewayError::Transport(e.to_string())
}

/// Pull a human-readable message out of an error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "error", "msg"]
                .iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

async fn send(builder: RequestBuilder) -> Result<Response, GatewayError> {
    let resp = builder.send().await.map_err(transport)?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(GatewayError::Status {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

async fn json_body(resp: Response) -> Result<Value, GatewayError> {
    let text = resp.text().await.map_err(transport)?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| GatewayError::Decode(e.to_string()))
}

/// `return=representation` answers with an array of affected rows.
async fn first_row(resp: Response) -> Result<Option<Value>, GatewayError> {
    match json_body(resp).await? {
        Value::Array(rows) => Ok(rows.into_iter().next()),
        Value::Null => Ok(None),
        row @ Value::Object(_) => Ok(Some(row)),
        other => Err(GatewayError::Decode(format!("expected rows, got {other}"))),
    }
}

fn id_filter(id: &str) -> [(&'static str, String); 1] {
    [("id", format!("eq.{id}"))]
}

#[async_trait]
impl Gateway for RestGateway {
    async fn select(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, GatewayError> {
        let query: Vec<(&str, String)> = filter
            .iter()
            .map(|(column, value)| (column.as_str(), format!("eq.{value}")))
            .collect();
        let resp = send(self.rows(Method::GET, collection).query(&query)).await?;
        match json_body(resp).await? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Err(GatewayError::Decode(format!("expected rows, got {other}"))),
        }
    }

    async fn insert(&self, collection: &str, record: Value) -> Result<Value, GatewayError> {
        let resp = send(self.rows(Method::POST, collection).json(&record)).await?;
        let stored = first_row(resp).await?.unwrap_or(record);
        self.feed.publish(collection, ChangeKind::Insert, stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<Value, GatewayError> {
        let builder = self
            .rows(Method::PATCH, collection)
            .query(&id_filter(id))
            .json(&patch);
        let updated = first_row(send(builder).await?)
            .await?
            .ok_or_else(|| GatewayError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        self.feed.publish(collection, ChangeKind::Update, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), GatewayError> {
        let builder = self.rows(Method::DELETE, collection).query(&id_filter(id));
        let removed = first_row(send(builder).await?)
            .await?
            .ok_or_else(|| GatewayError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        self.feed.publish(collection, ChangeKind::Delete, removed);
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, GatewayError> {
        let builder = self
            .request(Method::POST, &format!("/storage/v1/object/{bucket}/{path}"))
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes);
        send(builder).await?;
        Ok(self.public_url(bucket, path))
    }

    async fn invoke(&self, function: &str, body: Value) -> Result<Value, GatewayError> {
        tracing::debug!(function, "invoking function");
        let resp = self
            .request(Method::POST, &format!("/functions/v1/{function}"))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let status = resp.status();
        let value = if status.is_success() {
            json_body(resp).await?
        } else {
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Function {
                name: function.to_string(),
                message: format!("{}: {}", status.as_u16(), error_message(&text)),
            });
        };
        // Functions may also report failure inside a 200 body.
        if let Some(message) = value.get("error").and_then(Value::as_str) {
            return Err(GatewayError::Function {
                name: function.to_string(),
                message: message.to_string(),
            });
        }
        Ok(value)
    }

    fn subscribe(&self, collection: &str) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe(collection)
    }
}
