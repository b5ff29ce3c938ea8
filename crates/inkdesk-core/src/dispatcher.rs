//! The action dispatcher.
//!
//! `Dispatcher` is the only owner of modal visibility and the client refresh
//! set. `dispatch` routes every [`Action`] to its side effect and never fails:
//! gateway errors become error notices, audit failures become incidents.
//!
//! ```text
//! UiEvent ──► handle_event ─┐
//! palette / confirm ────────┴─► dispatch(Action)
//!                                  │
//!          ┌───────────────────────┼──────────────────────────┐
//!          ▼                       ▼                          ▼
//!   Modals (open seed)     Gateway insert/invoke      Reporter notice
//!                                  │
//!                                  ▼
//!                          audit record (best effort)
//! ```
//!
//! State is behind mutexes because handlers run on a multi-threaded runtime;
//! no lock is held across an `.await` or while a refresh callback runs.

use crate::action::{
    Action, ActionKind, BookingRequest, ClientDraft, DepositRequest, QuoteRequest, ReplyRequest,
    SlotRequest,
};
use crate::config::EffectsConfig;
use crate::error::{InkdeskError, Result};
use crate::events::{EventBus, UiEvent};
use crate::gateway::{Gateway, GatewayError};
use crate::modal::{ModalExit, ModalKind, Modals};
use crate::notice::{Incident, Notice, Reporter};
use crate::refresh::{RefreshOutcome, RefreshSet, Subscription};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

// ---------------------------------------------------------------------------
// DispatchOutcome
// ---------------------------------------------------------------------------

/// What a dispatch did. Informational; failures were already reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Opened { modal: ModalKind },
    Completed { message: String },
    Failed { error: String },
}

impl DispatchOutcome {
    fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Opened { .. } => "opened",
            DispatchOutcome::Completed { .. } => "completed",
            DispatchOutcome::Failed { .. } => "failed",
        }
    }
}

/// Short user-facing text for a failed remote action.
fn failure_text(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::CreateClient => "Could not open the new client form",
        ActionKind::ViewClient => "Could not open the client profile",
        ActionKind::CreateBooking => "Could not create the booking",
        ActionKind::SendDeposit => "Could not send the deposit link",
        ActionKind::CreateQuote => "Could not draft the quote",
        ActionKind::AiGenerateReply => "Could not draft a reply",
        ActionKind::AiSuggestSlots => "Could not suggest slots",
    }
}

fn str_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
}

/// Cut a reply preview to `max` characters for a notice.
fn preview(text: &str, max: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct Dispatcher {
    gateway: Arc<dyn Gateway>,
    reporter: Arc<dyn Reporter>,
    effects: EffectsConfig,
    modals: Mutex<Modals>,
    palette_open: AtomicBool,
    client_refresh: RefreshSet,
}

impl Dispatcher {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        reporter: Arc<dyn Reporter>,
        effects: EffectsConfig,
    ) -> Self {
        Self {
            gateway,
            reporter,
            effects,
            modals: Mutex::new(Modals::default()),
            palette_open: AtomicBool::new(false),
            client_refresh: RefreshSet::new(),
        }
    }

    fn lock_modals(&self) -> MutexGuard<'_, Modals> {
        self.modals.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `action`'s side effect. Never returns an error and never panics on
    /// backend failure; the outcome is informational.
    pub async fn dispatch(&self, action: Action) -> DispatchOutcome {
        let kind = action.kind();
        let payload = action.payload_json();
        tracing::info!(action = %kind, "dispatch");

        let outcome = match action {
            Action::CreateClient(seed) => {
                self.lock_modals().open_create_client(seed);
                DispatchOutcome::Opened {
                    modal: ModalKind::CreateClient,
                }
            }
            Action::ViewClient(seed) => {
                self.lock_modals().open_view_client(seed);
                DispatchOutcome::Opened {
                    modal: ModalKind::ViewClient,
                }
            }
            Action::CreateBooking(req) => {
                let result = self.create_booking(&req, payload.clone()).await;
                self.settle(kind, result)
            }
            Action::SendDeposit(req) => {
                let result = self.send_deposit(&req, payload.clone()).await;
                self.settle(kind, result)
            }
            Action::CreateQuote(req) => {
                let result = self.create_quote(&req, payload.clone()).await;
                self.settle(kind, result)
            }
            Action::AiGenerateReply(req) => {
                let result = self.generate_reply(&req, payload.clone()).await;
                self.settle(kind, result)
            }
            Action::AiSuggestSlots(req) => {
                let result = self.suggest_slots(&req, payload.clone()).await;
                self.settle(kind, result)
            }
        };

        self.audit(kind, payload, &outcome).await;
        outcome
    }

    /// Success text, flagged when the gateway never reached a backend.
    fn mark_offline(&self, message: String) -> String {
        if self.gateway.is_offline() {
            format!("{message} (offline)")
        } else {
            message
        }
    }

    fn settle(
        &self,
        kind: ActionKind,
        result: std::result::Result<String, GatewayError>,
    ) -> DispatchOutcome {
        match result {
            Ok(message) => {
                let message = self.mark_offline(message);
                self.reporter
                    .notify(Notice::success(message.clone()).for_action(kind));
                DispatchOutcome::Completed { message }
            }
            Err(e) => {
                tracing::warn!(action = %kind, error = %e, "action failed");
                self.reporter
                    .notify(Notice::error(failure_text(kind)).for_action(kind));
                DispatchOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Remote effects
    // -----------------------------------------------------------------------

    async fn create_booking(
        &self,
        req: &BookingRequest,
        payload: Value,
    ) -> std::result::Result<String, GatewayError> {
        let mut record = payload;
        if let Value::Object(fields) = &mut record {
            fields.insert("status".into(), json!("requested"));
            fields.insert("source".into(), json!("os"));
        }
        let stored = self
            .gateway
            .insert(&self.effects.bookings_collection, record)
            .await?;
        let who = req
            .client_name
            .as_deref()
            .or(req.client_email.as_deref())
            .unwrap_or("new client");
        Ok(match str_field(&stored, &["id"]) {
            Some(id) => format!("Booking request {id} created for {who}"),
            None => format!("Booking request created for {who}"),
        })
    }

    async fn send_deposit(
        &self,
        req: &DepositRequest,
        payload: Value,
    ) -> std::result::Result<String, GatewayError> {
        let response = self
            .gateway
            .invoke(&self.effects.deposit_function, payload)
            .await?;
        let to = req.client_email.as_deref().unwrap_or("the client");
        Ok(match str_field(&response, &["url", "paymentUrl", "payment_url"]) {
            Some(url) => format!("Deposit link sent to {to}: {url}"),
            None => format!("Deposit link sent to {to}"),
        })
    }

    async fn create_quote(
        &self,
        req: &QuoteRequest,
        payload: Value,
    ) -> std::result::Result<String, GatewayError> {
        let response = self
            .gateway
            .invoke(&self.effects.quote_function, payload)
            .await?;
        let who = req.client_name.as_deref().unwrap_or("the client");
        Ok(match str_field(&response, &["summary", "total"]) {
            Some(summary) => format!("Quote drafted for {who}: {summary}"),
            None => format!("Quote drafted for {who}"),
        })
    }

    async fn generate_reply(
        &self,
        _req: &ReplyRequest,
        payload: Value,
    ) -> std::result::Result<String, GatewayError> {
        let response = self
            .gateway
            .invoke(&self.effects.reply_function, payload)
            .await?;
        Ok(match str_field(&response, &["reply", "content"]) {
            Some(reply) => format!("Draft reply ready: {}", preview(reply, 80)),
            None => "Draft reply ready".to_string(),
        })
    }

    async fn suggest_slots(
        &self,
        _req: &SlotRequest,
        payload: Value,
    ) -> std::result::Result<String, GatewayError> {
        let response = self
            .gateway
            .invoke(&self.effects.slots_function, payload)
            .await?;
        let count = response
            .get("slots")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0);
        Ok(match count {
            0 => "No open slots found".to_string(),
            1 => "1 open slot suggested".to_string(),
            n => format!("{n} open slots suggested"),
        })
    }

    /// Best-effort audit trail. A failed write is an incident, not a
    /// user-facing error.
    async fn audit(&self, kind: ActionKind, payload: Value, outcome: &DispatchOutcome) {
        let detail = match outcome {
            DispatchOutcome::Opened { modal } => modal.to_string(),
            DispatchOutcome::Completed { message } => message.clone(),
            DispatchOutcome::Failed { error } => error.clone(),
        };
        let record = json!({
            "action": kind,
            "payload": payload,
            "outcome": outcome.label(),
            "detail": detail,
            "at": Utc::now(),
        });
        if let Err(e) = self
            .gateway
            .insert(&self.effects.audit_collection, record)
            .await
        {
            self.reporter.incident(Incident::new(
                "audit",
                format!("could not record {kind}: {e}"),
            ));
        }
    }

    // -----------------------------------------------------------------------
    // Modals and palette
    // -----------------------------------------------------------------------

    pub fn modals(&self) -> Modals {
        self.lock_modals().clone()
    }

    /// Leave a modal. Returns false if it was already closed.
    pub fn close_modal(&self, kind: ModalKind, exit: ModalExit) -> bool {
        let closed = self.lock_modals().close(kind);
        if closed {
            tracing::debug!(modal = %kind, ?exit, "modal closed");
        }
        closed
    }

    pub fn palette_open(&self) -> bool {
        self.palette_open.load(Ordering::SeqCst)
    }

    pub fn set_palette_open(&self, open: bool) {
        self.palette_open.store(open, Ordering::SeqCst);
    }

    /// Confirm step of the new-client form: create the client, close the
    /// form and refresh client lists. Only an open form can be confirmed.
    ///
    /// Unlike `dispatch` this returns errors, because the form stays open and
    /// shows them next to the user's input.
    pub async fn submit_client(&self, draft: ClientDraft) -> Result<Value> {
        if draft.name.is_none() && draft.email.is_none() {
            return Err(InkdeskError::InvalidPayload {
                action: ActionKind::CreateClient.to_string(),
                reason: "a client needs a name or an email".to_string(),
            });
        }
        if !self.lock_modals().is_open(ModalKind::CreateClient) {
            tracing::warn!("client submitted while the form is closed");
            return Err(InkdeskError::ModalClosed(ModalKind::CreateClient.to_string()));
        }
        let record = serde_json::to_value(&draft)?;
        match self
            .gateway
            .insert(&self.effects.clients_collection, record)
            .await
        {
            Ok(stored) => {
                self.close_modal(ModalKind::CreateClient, ModalExit::Confirmed);
                let who = draft
                    .name
                    .as_deref()
                    .or(draft.email.as_deref())
                    .unwrap_or("client");
                let message = self.mark_offline(format!("Client {who} created"));
                self.reporter
                    .notify(Notice::success(message).for_action(ActionKind::CreateClient));
                self.refresh_clients();
                Ok(stored)
            }
            Err(e) => {
                tracing::warn!(error = %e, "client insert failed");
                self.reporter.notify(
                    Notice::error("Could not save the client").for_action(ActionKind::CreateClient),
                );
                Err(e.into())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Client refresh
    // -----------------------------------------------------------------------

    pub fn on_client_refresh<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.client_refresh.subscribe(callback)
    }

    pub fn refresh_clients(&self) -> RefreshOutcome {
        let outcome = self.client_refresh.refresh();
        if outcome.panicked > 0 {
            self.reporter.incident(Incident::new(
                "refresh",
                format!("{} client refresh callback(s) panicked", outcome.panicked),
            ));
        }
        outcome
    }

    // -----------------------------------------------------------------------
    // UI events
    // -----------------------------------------------------------------------

    /// Translate a UI event into its fixed action (empty payload), or open
    /// the command palette.
    pub async fn handle_event(&self, event: UiEvent) {
        match event.action() {
            Some(kind) => {
                self.dispatch(Action::empty(kind)).await;
            }
            None => self.set_palette_open(true),
        }
    }

    /// Handle events from `bus` on a background task until the bus closes.
    pub fn listen(self: Arc<Self>, bus: &EventBus) -> JoinHandle<()> {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => self.handle_event(event).await,
                    Err(RecvError::Lagged(skipped)) => self.reporter.incident(Incident::new(
                        "events",
                        format!("dropped {skipped} UI event(s)"),
                    )),
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
