//! The closed set of studio intents.
//!
//! `Action` is the single source of truth for what the back office can do.
//! Each variant carries its own payload struct; `ActionKind` is the field-less
//! mirror used for lookups, UI events and the interpreter vocabulary. Adding a
//! variant is a compile error until every exhaustive `match` over the kind
//! (registry, dispatcher, event mapping) handles it.

use crate::error::{InkdeskError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    CreateClient,
    ViewClient,
    CreateBooking,
    SendDeposit,
    CreateQuote,
    AiGenerateReply,
    AiSuggestSlots,
}

impl ActionKind {
    pub fn all() -> &'static [ActionKind] {
        &[
            ActionKind::CreateClient,
            ActionKind::ViewClient,
            ActionKind::CreateBooking,
            ActionKind::SendDeposit,
            ActionKind::CreateQuote,
            ActionKind::AiGenerateReply,
            ActionKind::AiSuggestSlots,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::CreateClient => "create-client",
            ActionKind::ViewClient => "view-client",
            ActionKind::CreateBooking => "create-booking",
            ActionKind::SendDeposit => "send-deposit",
            ActionKind::CreateQuote => "create-quote",
            ActionKind::AiGenerateReply => "ai-generate-reply",
            ActionKind::AiSuggestSlots => "ai-suggest-slots",
        }
    }

    pub fn is_valid(s: &str) -> bool {
        s.parse::<ActionKind>().is_ok()
    }

    /// One-line meaning, shown in the palette and fed to the interpreter.
    pub fn summary(self) -> &'static str {
        match self {
            ActionKind::CreateClient => "Open the new-client form, optionally prefilled",
            ActionKind::ViewClient => "Open an existing client's profile",
            ActionKind::CreateBooking => "Create a booking request for a client",
            ActionKind::SendDeposit => "Send a deposit payment link for a booking",
            ActionKind::CreateQuote => "Draft a price quote for a tattoo",
            ActionKind::AiGenerateReply => "Draft an AI reply to a client conversation",
            ActionKind::AiSuggestSlots => "Ask the AI to suggest open appointment slots",
        }
    }

    /// Wire names of the payload fields this kind understands.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            ActionKind::CreateClient => ClientDraft::FIELDS,
            ActionKind::ViewClient => ClientRef::FIELDS,
            ActionKind::CreateBooking => BookingRequest::FIELDS,
            ActionKind::SendDeposit => DepositRequest::FIELDS,
            ActionKind::CreateQuote => QuoteRequest::FIELDS,
            ActionKind::AiGenerateReply => ReplyRequest::FIELDS,
            ActionKind::AiSuggestSlots => SlotRequest::FIELDS,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = InkdeskError;

    fn from_str(s: &str) -> Result<Self> {
        ActionKind::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| InkdeskError::UnknownAction(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Implemented by every action payload.
///
/// Unknown keys land in the payload's `extra` map and survive a round trip;
/// missing keys are `None`.
pub trait Payload: Serialize + DeserializeOwned + Default + Clone + PartialEq {
    const FIELDS: &'static [&'static str];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Payload for ClientDraft {
    const FIELDS: &'static [&'static str] = &["email", "name", "phone"];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Payload for ClientRef {
    const FIELDS: &'static [&'static str] = &["clientId", "clientEmail"];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<String>,
    /// Free text as the client said it ("next Tuesday"); resolution happens
    /// in the booking backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Payload for BookingRequest {
    const FIELDS: &'static [&'static str] = &[
        "clientId",
        "clientName",
        "clientEmail",
        "style",
        "placement",
        "preferredDate",
        "notes",
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DepositRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_cents: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Payload for DepositRequest {
    const FIELDS: &'static [&'static str] = &["bookingId", "clientEmail", "amountCents"];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuoteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Payload for QuoteRequest {
    const FIELDS: &'static [&'static str] =
        &["clientId", "clientName", "description", "size", "placement"];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReplyRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Payload for ReplyRequest {
    const FIELDS: &'static [&'static str] = &["conversationId", "clientEmail", "message"];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SlotRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Payload for SlotRequest {
    const FIELDS: &'static [&'static str] = &["artistId", "durationMinutes", "fromDate"];
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A studio intent with its typed payload.
///
/// Wire form is `{"type": "create-booking", "payload": {...}}`. On input the
/// payload may be absent or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
#[serde(try_from = "RawAction")]
pub enum Action {
    CreateClient(ClientDraft),
    ViewClient(ClientRef),
    CreateBooking(BookingRequest),
    SendDeposit(DepositRequest),
    CreateQuote(QuoteRequest),
    AiGenerateReply(ReplyRequest),
    AiSuggestSlots(SlotRequest),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::CreateClient(_) => ActionKind::CreateClient,
            Action::ViewClient(_) => ActionKind::ViewClient,
            Action::CreateBooking(_) => ActionKind::CreateBooking,
            Action::SendDeposit(_) => ActionKind::SendDeposit,
            Action::CreateQuote(_) => ActionKind::CreateQuote,
            Action::AiGenerateReply(_) => ActionKind::AiGenerateReply,
            Action::AiSuggestSlots(_) => ActionKind::AiSuggestSlots,
        }
    }

    /// The action of `kind` with an empty payload.
    pub fn empty(kind: ActionKind) -> Self {
        match kind {
            ActionKind::CreateClient => Action::CreateClient(ClientDraft::default()),
            ActionKind::ViewClient => Action::ViewClient(ClientRef::default()),
            ActionKind::CreateBooking => Action::CreateBooking(BookingRequest::default()),
            ActionKind::SendDeposit => Action::SendDeposit(DepositRequest::default()),
            ActionKind::CreateQuote => Action::CreateQuote(QuoteRequest::default()),
            ActionKind::AiGenerateReply => Action::AiGenerateReply(ReplyRequest::default()),
            ActionKind::AiSuggestSlots => Action::AiSuggestSlots(SlotRequest::default()),
        }
    }

    /// Build an action from a kind and an untyped payload.
    ///
    /// `null` means "no payload". Any other non-object value, or a field of
    /// the wrong JSON type, is `InvalidPayload`.
    pub fn from_parts(kind: ActionKind, payload: Value) -> Result<Self> {
        Ok(match kind {
            ActionKind::CreateClient => Action::CreateClient(decode(kind, payload)?),
            ActionKind::ViewClient => Action::ViewClient(decode(kind, payload)?),
            ActionKind::CreateBooking => Action::CreateBooking(decode(kind, payload)?),
            ActionKind::SendDeposit => Action::SendDeposit(decode(kind, payload)?),
            ActionKind::CreateQuote => Action::CreateQuote(decode(kind, payload)?),
            ActionKind::AiGenerateReply => Action::AiGenerateReply(decode(kind, payload)?),
            ActionKind::AiSuggestSlots => Action::AiSuggestSlots(decode(kind, payload)?),
        })
    }

    /// The payload as a JSON object (extras included).
    pub fn payload_json(&self) -> Value {
        let encoded = match self {
            Action::CreateClient(p) => serde_json::to_value(p),
            Action::ViewClient(p) => serde_json::to_value(p),
            Action::CreateBooking(p) => serde_json::to_value(p),
            Action::SendDeposit(p) => serde_json::to_value(p),
            Action::CreateQuote(p) => serde_json::to_value(p),
            Action::AiGenerateReply(p) => serde_json::to_value(p),
            Action::AiSuggestSlots(p) => serde_json::to_value(p),
        };
        // Payloads are plain string/number maps; serialisation cannot fail.
        encoded.unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

fn decode<P: Payload>(kind: ActionKind, payload: Value) -> Result<P> {
    match payload {
        Value::Null => Ok(P::default()),
        Value::Object(_) => {
            serde_json::from_value(payload).map_err(|e| InkdeskError::InvalidPayload {
                action: kind.to_string(),
                reason: e.to_string(),
            })
        }
        other => Err(InkdeskError::InvalidPayload {
            action: kind.to_string(),
            reason: format!("expected an object, got {}", json_type(&other)),
        }),
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Deserialize)]
struct RawAction {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

impl TryFrom<RawAction> for Action {
    type Error = InkdeskError;

    fn try_from(raw: RawAction) -> Result<Self> {
        let kind: ActionKind = raw.kind.parse()?;
        Action::from_parts(kind, raw.payload)
    }
}
