//! Contract for the managed backend (records, storage, functions, change
//! feed) and an in-process implementation.
//!
//! The real backend is reached through `inkdesk_agent::RestGateway`.
//! [`MemoryGateway`] backs offline mode and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("function '{name}' failed: {message}")]
    Function { name: String, message: String },

    #[error("record not found in {collection}: {id}")]
    NotFound { collection: String, id: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Change feed
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: String,
    pub kind: ChangeKind,
    pub record: Value,
}

/// Per-collection broadcast channels, created on first use.
#[derive(Default)]
pub struct ChangeFeed {
    channels: Mutex<HashMap<String, broadcast::Sender<ChangeEvent>>>,
}

impl ChangeFeed {
    pub fn subscribe(&self, collection: &str) -> broadcast::Receiver<ChangeEvent> {
        self.channel(collection).subscribe()
    }

    pub fn publish(&self, collection: &str, kind: ChangeKind, record: Value) {
        let event = ChangeEvent {
            collection: collection.to_string(),
            kind,
            record,
        };
        let _ = self.channel(collection).send(event);
    }

    fn channel(&self, collection: &str) -> broadcast::Sender<ChangeEvent> {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels
            .entry(collection.to_string())
            .or_insert_with(|| broadcast::channel(64).0)
            .clone()
    }
}

// ---------------------------------------------------------------------------
// Gateway trait
// ---------------------------------------------------------------------------

/// Equality filter for `select`: every `(column, value)` pair must match.
pub type Filter = Vec<(String, String)>;

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn select(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, GatewayError>;

    /// Insert `record` and return it as stored (with its `id`).
    async fn insert(&self, collection: &str, record: Value) -> Result<Value, GatewayError>;

    async fn update(&self, collection: &str, id: &str, patch: Value)
        -> Result<Value, GatewayError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), GatewayError>;

    /// Store `bytes` and return a URL the file can be fetched from.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, GatewayError>;

    /// Call a named serverless function with a JSON body.
    async fn invoke(&self, function: &str, body: Value) -> Result<Value, GatewayError>;

    fn subscribe(&self, collection: &str) -> broadcast::Receiver<ChangeEvent>;

    /// True when nothing reaches a real backend, so no client, payment or
    /// message is actually affected.
    fn is_offline(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// MemoryGateway
// ---------------------------------------------------------------------------

type Handler = Arc<dyn Fn(&Value) -> Result<Value, GatewayError> + Send + Sync>;

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Select(String),
    Insert(String, Value),
    Update(String, String),
    Delete(String, String),
    Upload(String, String),
    Invoke(String, Value),
}

#[derive(Default)]
struct Store {
    collections: HashMap<String, Vec<Value>>,
    files: HashMap<String, Vec<u8>>,
    calls: Vec<Call>,
    failing_collections: HashMap<String, String>,
}

/// In-process gateway. Functions without a registered handler echo
/// `{"ok": true, "function": name}`.
#[derive(Default)]
pub struct MemoryGateway {
    store: Mutex<Store>,
    functions: Mutex<HashMap<String, Handler>>,
    feed: ChangeFeed,
    offline: bool,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway standing in for the real backend, e.g. for `--offline`.
    /// It reports itself offline so outcomes can say nothing was sent.
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub fn with_function<F>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, GatewayError> + Send + Sync + 'static,
    {
        self.functions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), Arc::new(handler));
        self
    }

    /// Make every function call to `name` fail with `message`.
    pub fn failing_function(self, name: &str, message: &str) -> Self {
        let (fname, msg) = (name.to_string(), message.to_string());
        self.with_function(name, move |_| {
            Err(GatewayError::Function {
                name: fname.clone(),
                message: msg.clone(),
            })
        })
    }

    /// Make every write to `collection` fail with a 503.
    pub fn failing_collection(self, collection: &str, message: &str) -> Self {
        self.lock()
            .failing_collections
            .insert(collection.to_string(), message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn records(&self, collection: &str) -> Vec<Value> {
        self.lock()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Bytes uploaded to `bucket/path`.
    pub fn file(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(&format!("{bucket}/{path}")).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_writable(store: &Store, collection: &str) -> Result<(), GatewayError> {
        match store.failing_collections.get(collection) {
            Some(message) => Err(GatewayError::Status {
                status: 503,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn select(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, GatewayError> {
        let mut store = self.lock();
        store.calls.push(Call::Select(collection.to_string()));
        let rows = store.collections.get(collection).cloned().unwrap_or_default();
        Ok(rows
            .into_iter()
            .filter(|row| {
                filter.iter().all(|(column, expected)| {
                    match row.get(column) {
                        Some(Value::String(s)) => s == expected,
                        Some(other) => other.to_string() == *expected,
                        None => false,
                    }
                })
            })
            .collect())
    }

    async fn insert(&self, collection: &str, record: Value) -> Result<Value, GatewayError> {
        let stored = {
            let mut store = self.lock();
            store
                .calls
                .push(Call::Insert(collection.to_string(), record.clone()));
            Self::check_writable(&store, collection)?;
            let mut fields = match record {
                Value::Object(map) => map,
                other => {
                    return Err(GatewayError::Decode(format!(
                        "records must be objects, got {other}"
                    )))
                }
            };
            fields
                .entry("id")
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
            let stored = Value::Object(fields);
            store
                .collections
                .entry(collection.to_string())
                .or_default()
                .push(stored.clone());
            stored
        };
        self.feed.publish(collection, ChangeKind::Insert, stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<Value, GatewayError> {
        let updated = {
            let mut store = self.lock();
            store
                .calls
                .push(Call::Update(collection.to_string(), id.to_string()));
            Self::check_writable(&store, collection)?;
            let row = store
                .collections
                .get_mut(collection)
                .and_then(|rows| rows.iter_mut().find(|r| record_id(r) == Some(id)))
                .ok_or_else(|| GatewayError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;
            if let (Value::Object(target), Value::Object(changes)) = (&mut *row, patch) {
                for (k, v) in changes {
                    target.insert(k, v);
                }
            }
            row.clone()
        };
        self.feed.publish(collection, ChangeKind::Update, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), GatewayError> {
        let removed = {
            let mut store = self.lock();
            store
                .calls
                .push(Call::Delete(collection.to_string(), id.to_string()));
            Self::check_writable(&store, collection)?;
            let rows = store.collections.entry(collection.to_string()).or_default();
            let pos = rows
                .iter()
                .position(|r| record_id(r) == Some(id))
                .ok_or_else(|| GatewayError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;
            rows.remove(pos)
        };
        self.feed.publish(collection, ChangeKind::Delete, removed);
        Ok(())
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, GatewayError> {
        let mut store = self.lock();
        store
            .calls
            .push(Call::Upload(bucket.to_string(), path.to_string()));
        let key = format!("{bucket}/{path}");
        store.files.insert(key.clone(), bytes);
        Ok(format!("memory://{key}"))
    }

    async fn invoke(&self, function: &str, body: Value) -> Result<Value, GatewayError> {
        self.lock()
            .calls
            .push(Call::Invoke(function.to_string(), body.clone()));
        let handler = self
            .functions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(function)
            .cloned();
        match handler {
            Some(handler) => handler(&body),
            None => Ok(json!({ "ok": true, "function": function })),
        }
    }

    fn subscribe(&self, collection: &str) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe(collection)
    }

    fn is_offline(&self) -> bool {
        self.offline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_assigns_id_and_publishes_change() {
        let gw = MemoryGateway::new();
        let mut rx = gw.subscribe("clients");
        let stored = gw
            .insert("clients", json!({"name": "Maria"}))
            .await
            .unwrap();
        assert!(record_id(&stored).is_some());

        let change = rx.recv().await.unwrap();
        assert_eq!(change.kind, ChangeKind::Insert);
        assert_eq!(change.record["name"], "Maria");
    }

    #[tokio::test]
    async fn select_filters_by_equality() {
        let gw = MemoryGateway::new();
        gw.insert("clients", json!({"name": "Maria", "email": "m@x.co"}))
            .await
            .unwrap();
        gw.insert("clients", json!({"name": "Jo", "email": "j@x.co"}))
            .await
            .unwrap();
        let rows = gw
            .select("clients", &vec![("email".into(), "j@x.co".into())])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "Jo");
    }

    #[tokio::test]
    async fn update_and_delete_by_id() {
        let gw = MemoryGateway::new();
        gw.insert("bookings", json!({"id": "b1", "status": "requested"}))
            .await
            .unwrap();
        let updated = gw
            .update("bookings", "b1", json!({"status": "confirmed"}))
            .await
            .unwrap();
        assert_eq!(updated["status"], "confirmed");

        gw.delete("bookings", "b1").await.unwrap();
        assert!(gw.records("bookings").is_empty());
        assert!(matches!(
            gw.delete("bookings", "b1").await,
            Err(GatewayError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn functions_use_handlers_or_echo() {
        let gw = MemoryGateway::new()
            .with_function("double", |body| Ok(json!({"n": body["n"].as_i64().unwrap_or(0) * 2})))
            .failing_function("broken", "boom");

        assert_eq!(gw.invoke("double", json!({"n": 21})).await.unwrap()["n"], 42);
        assert_eq!(gw.invoke("other", json!({})).await.unwrap()["ok"], true);
        let err = gw.invoke("broken", json!({})).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert_eq!(gw.calls().len(), 3);
    }

    #[tokio::test]
    async fn failing_collection_rejects_writes() {
        let gw = MemoryGateway::new().failing_collection("action_log", "read-only");
        let err = gw.insert("action_log", json!({})).await.unwrap_err();
        assert!(matches!(err, GatewayError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn upload_returns_url() {
        let gw = MemoryGateway::new();
        let url = gw
            .upload("references", "maria/rose.png", vec![1, 2, 3], "image/png")
            .await
            .unwrap();
        assert_eq!(url, "memory://references/maria/rose.png");
        assert_eq!(gw.file("references", "maria/rose.png"), Some(vec![1, 2, 3]));
    }
}
