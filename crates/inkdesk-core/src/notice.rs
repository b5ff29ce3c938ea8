//! User-visible notices and low-severity incidents.
//!
//! Nothing in the action layer returns errors to the palette; failures become
//! a [`Notice`] (short, dismissible) or, when the user flow must not be
//! interrupted at all, an [`Incident`]. Both go through a [`Reporter`].

use crate::action::ActionKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: Uuid,
    pub level: NoticeLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionKind>,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
            action: None,
            at: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    pub fn for_action(mut self, kind: ActionKind) -> Self {
        self.action = Some(kind);
        self
    }
}

/// A failure that is observable but never shown as a blocking error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Subsystem that raised it, e.g. `audit` or `refresh`.
    pub source: String,
    pub detail: String,
    pub at: DateTime<Utc>,
}

impl Incident {
    pub fn new(source: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            detail: detail.into(),
            at: Utc::now(),
        }
    }
}

/// Everything pushed to live subscribers (the SSE stream).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Signal {
    Notice(Notice),
    Incident(Incident),
    /// Lists showing `topic` should re-fetch.
    Refresh { topic: String },
}

pub trait Reporter: Send + Sync {
    fn notify(&self, notice: Notice);
    fn incident(&self, incident: Incident);
}

// ---------------------------------------------------------------------------
// NoticeBoard
// ---------------------------------------------------------------------------

/// Bounded history of notices and incidents, fanned out over a broadcast
/// channel.
pub struct NoticeBoard {
    capacity: usize,
    notices: Mutex<VecDeque<Notice>>,
    incidents: Mutex<VecDeque<Incident>>,
    tx: broadcast::Sender<Signal>,
}

impl NoticeBoard {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            capacity: capacity.max(1),
            notices: Mutex::new(VecDeque::new()),
            incidents: Mutex::new(VecDeque::new()),
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.tx.subscribe()
    }

    pub fn sender(&self) -> broadcast::Sender<Signal> {
        self.tx.clone()
    }

    /// Notices, oldest first.
    pub fn recent(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn incidents(&self) -> Vec<Incident> {
        self.incidents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    fn push<T>(&self, queue: &Mutex<VecDeque<T>>, item: T) {
        let mut q = queue.lock().unwrap_or_else(|e| e.into_inner());
        if q.len() == self.capacity {
            q.pop_front();
        }
        q.push_back(item);
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(50)
    }
}

impl Reporter for NoticeBoard {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error | NoticeLevel::Warning => {
                tracing::warn!(action = ?notice.action, "{}", notice.message)
            }
            NoticeLevel::Info | NoticeLevel::Success => {
                tracing::info!(action = ?notice.action, "{}", notice.message)
            }
        }
        self.push(&self.notices, notice.clone());
        // No subscribers is fine: the history still has it.
        let _ = self.tx.send(Signal::Notice(notice));
    }

    fn incident(&self, incident: Incident) {
        tracing::warn!(source = %incident.source, "incident: {}", incident.detail);
        self.push(&self.incidents, incident.clone());
        let _ = self.tx.send(Signal::Incident(incident));
    }
}
