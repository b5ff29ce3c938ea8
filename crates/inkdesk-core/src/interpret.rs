//! Turning an AI reply into a proposed action, and holding the proposal until
//! a human confirms it.
//!
//! The remote call itself lives in `inkdesk_agent::interpreter`; this module
//! is pure so the parsing rules can be tested without a network.

use crate::action::{Action, ActionKind};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;
pub const DEFAULT_REASONING: &str = "No reasoning provided.";
pub const FAILURE_MESSAGE: &str = "Could not understand the command";

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// A proposed action awaiting confirmation. Confidence is advisory only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterpretedAction {
    pub action: Action,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<Action>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NoJson,
    UnknownAction,
    InvalidPayload,
    Remote,
}

/// Why a command could not be turned into an action. `detail` is for logs;
/// users only ever see [`FAILURE_MESSAGE`].
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{detail}")]
pub struct InterpretationFailure {
    pub reason: FailureReason,
    pub detail: String,
}

impl InterpretationFailure {
    pub fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        FAILURE_MESSAGE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Interpretation {
    /// Blank input; nothing was sent anywhere.
    Empty,
    Understood(InterpretedAction),
    Failed(InterpretationFailure),
}

impl Interpretation {
    pub fn understood(&self) -> Option<&InterpretedAction> {
        match self {
            Interpretation::Understood(i) => Some(i),
            Interpretation::Empty | Interpretation::Failed(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// First JSON object embedded anywhere in `text` (prose, code fences and
/// trailing commentary are skipped).
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    text.match_indices('{').find_map(|(start, _)| {
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Object(map))) => Some(map),
            _ => None,
        }
    })
}

/// Parse the AI function's `content` into a proposal.
pub fn parse_response(content: &str) -> Result<InterpretedAction, InterpretationFailure> {
    let obj = extract_json_object(content).ok_or_else(|| {
        InterpretationFailure::new(FailureReason::NoJson, "response contained no JSON object")
    })?;

    let action = parse_entry(&obj)?;

    let confidence = obj
        .get("confidence")
        .and_then(Value::as_f64)
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_CONFIDENCE);

    let reasoning = obj
        .get("reasoning")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_REASONING)
        .to_string();

    let alternatives = obj
        .get("alternatives")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|entry| parse_entry(entry).ok())
                .filter(|alt| *alt != action)
                .collect()
        })
        .unwrap_or_default();

    Ok(InterpretedAction {
        action,
        confidence,
        reasoning,
        alternatives,
    })
}

fn parse_entry(obj: &Map<String, Value>) -> Result<Action, InterpretationFailure> {
    let name = obj
        .get("action")
        .or_else(|| obj.get("type"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            InterpretationFailure::new(FailureReason::UnknownAction, "missing 'action' field")
        })?;

    let kind: ActionKind = name.parse().map_err(|_| {
        InterpretationFailure::new(
            FailureReason::UnknownAction,
            format!("'{name}' is not a registered action"),
        )
    })?;

    let payload = obj.get("payload").cloned().unwrap_or(Value::Null);
    Action::from_parts(kind, payload)
        .map_err(|e| InterpretationFailure::new(FailureReason::InvalidPayload, e.to_string()))
}

// ---------------------------------------------------------------------------
// CommandSlot
// ---------------------------------------------------------------------------

/// Sequence number of one interpretation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Ticket(pub u64);

/// The proposal currently on screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingCommand {
    pub ticket: Ticket,
    pub text: String,
    pub interpretation: Interpretation,
}

/// Latest-wins holder for the proposal shown to the user.
///
/// Every request takes a ticket from [`begin`](Self::begin). A result is only
/// accepted if no newer ticket has been issued since; older results are
/// dropped. In-flight requests are never aborted.
#[derive(Debug, Default)]
pub struct CommandSlot {
    issued: u64,
    shown: Option<PendingCommand>,
}

impl CommandSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> Ticket {
        self.issued += 1;
        Ticket(self.issued)
    }

    pub fn is_latest(&self, ticket: Ticket) -> bool {
        ticket.0 == self.issued
    }

    /// Show `interpretation` if `ticket` is still the newest. Returns whether
    /// it was accepted.
    pub fn offer(
        &mut self,
        ticket: Ticket,
        text: impl Into<String>,
        interpretation: Interpretation,
    ) -> bool {
        if !self.is_latest(ticket) {
            tracing::debug!(
                ticket = ticket.0,
                latest = self.issued,
                "discarding stale interpretation"
            );
            return false;
        }
        self.shown = Some(PendingCommand {
            ticket,
            text: text.into(),
            interpretation,
        });
        true
    }

    pub fn shown(&self) -> Option<&PendingCommand> {
        self.shown.as_ref()
    }

    /// Take the shown proposal's action (or alternative `n`) for dispatch.
    ///
    /// Returns `None` and keeps the proposal when there is nothing to
    /// confirm: no proposal, a failed interpretation, or a bad index.
    pub fn confirm(&mut self, alternative: Option<usize>) -> Option<Action> {
        let proposal = self.shown.as_ref()?.interpretation.understood()?;
        let action = match alternative {
            None => proposal.action.clone(),
            Some(n) => proposal.alternatives.get(n)?.clone(),
        };
        self.shown = None;
        Some(action)
    }

    /// Drop the shown proposal. Returns false if there was none.
    pub fn discard(&mut self) -> bool {
        self.shown.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::BookingRequest;

    const MARIA: &str = r#"{"action":"create-booking","payload":{"clientName":"Maria"},"confidence":0.9,"reasoning":"booking request detected"}"#;

    #[test]
    fn parses_clean_json() {
        let parsed = parse_response(MARIA).unwrap();
        assert_eq!(parsed.action.kind(), ActionKind::CreateBooking);
        let Action::CreateBooking(ref b) = parsed.action else {
            panic!("expected booking")
        };
        assert_eq!(b.client_name.as_deref(), Some("Maria"));
        assert_eq!(parsed.confidence, 0.9);
        assert_eq!(parsed.reasoning, "booking request detected");
        assert!(parsed.alternatives.is_empty());
    }

    #[test]
    fn finds_json_inside_prose_and_fences() {
        let content = format!("Sure! Here you go:\n```json\n{MARIA}\n```\nLet me know.");
        assert_eq!(parse_response(&content).unwrap().confidence, 0.9);
    }

    #[test]
    fn skips_brace_that_is_not_json() {
        let content = format!("Use {{curly}} syntax. {MARIA}");
        assert_eq!(
            parse_response(&content).unwrap().action.kind(),
            ActionKind::CreateBooking
        );
    }

    #[test]
    fn prose_without_json_fails() {
        let err = parse_response("I'm not sure what you mean by that.").unwrap_err();
        assert_eq!(err.reason, FailureReason::NoJson);
        assert_eq!(err.user_message(), FAILURE_MESSAGE);
    }

    #[test]
    fn unregistered_action_fails() {
        let err = parse_response(r#"{"action":"delete-studio"}"#).unwrap_err();
        assert_eq!(err.reason, FailureReason::UnknownAction);
        assert!(err.detail.contains("delete-studio"));
    }

    #[test]
    fn missing_action_fails() {
        let err = parse_response(r#"{"payload":{}}"#).unwrap_err();
        assert_eq!(err.reason, FailureReason::UnknownAction);
    }

    #[test]
    fn mistyped_payload_fails() {
        let err = parse_response(r#"{"action":"send-deposit","payload":{"amountCents":"lots"}}"#)
            .unwrap_err();
        assert_eq!(err.reason, FailureReason::InvalidPayload);
    }

    #[test]
    fn defaults_for_missing_metadata() {
        let parsed = parse_response(r#"{"action":"create-client"}"#).unwrap();
        assert_eq!(parsed.confidence, DEFAULT_CONFIDENCE);
        assert_eq!(parsed.reasoning, DEFAULT_REASONING);
    }

    #[test]
    fn confidence_is_clamped() {
        let high = parse_response(r#"{"action":"create-client","confidence":7}"#).unwrap();
        let low = parse_response(r#"{"action":"create-client","confidence":-1}"#).unwrap();
        assert_eq!(high.confidence, 1.0);
        assert_eq!(low.confidence, 0.0);
    }

    #[test]
    fn alternatives_skip_invalid_and_duplicate_entries() {
        let parsed = parse_response(
            r#"{"action":"create-quote","payload":{"size":"palm"},
                "alternatives":[
                    {"action":"create-booking"},
                    {"action":"teleport"},
                    {"action":"create-quote","payload":{"size":"palm"}},
                    "nonsense"
                ]}"#,
        )
        .unwrap();
        assert_eq!(parsed.alternatives.len(), 1);
        assert_eq!(parsed.alternatives[0].kind(), ActionKind::CreateBooking);
    }

    fn understood(name: &str) -> Interpretation {
        Interpretation::Understood(InterpretedAction {
            action: Action::CreateBooking(BookingRequest {
                client_name: Some(name.to_string()),
                ..Default::default()
            }),
            confidence: 0.8,
            reasoning: "test".into(),
            alternatives: vec![Action::empty(ActionKind::CreateQuote)],
        })
    }

    #[test]
    fn slot_keeps_only_latest_ticket() {
        let mut slot = CommandSlot::new();
        let a = slot.begin();
        let b = slot.begin();

        assert!(slot.offer(b, "b", understood("B")));
        assert!(!slot.offer(a, "a", understood("A")));
        assert_eq!(slot.shown().unwrap().text, "b");
        assert_eq!(slot.shown().unwrap().ticket, b);
    }

    #[test]
    fn confirm_takes_action_and_clears() {
        let mut slot = CommandSlot::new();
        let t = slot.begin();
        slot.offer(t, "book maria", understood("Maria"));

        let action = slot.confirm(None).unwrap();
        assert_eq!(action.kind(), ActionKind::CreateBooking);
        assert!(slot.shown().is_none());
        assert!(slot.confirm(None).is_none());
    }

    #[test]
    fn confirm_alternative_by_index() {
        let mut slot = CommandSlot::new();
        let t = slot.begin();
        slot.offer(t, "quote?", understood("Maria"));

        assert!(slot.confirm(Some(5)).is_none());
        assert!(slot.shown().is_some());
        assert_eq!(slot.confirm(Some(0)).unwrap().kind(), ActionKind::CreateQuote);
    }

    #[test]
    fn failed_interpretation_cannot_be_confirmed() {
        let mut slot = CommandSlot::new();
        let t = slot.begin();
        slot.offer(
            t,
            "asdf",
            Interpretation::Failed(InterpretationFailure::new(FailureReason::NoJson, "none")),
        );
        assert!(slot.confirm(None).is_none());
        assert!(slot.discard());
        assert!(!slot.discard());
    }
}
