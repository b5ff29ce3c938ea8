//! Typed UI event bus.
//!
//! Decoupled triggers (keyboard shortcuts, palette buttons, other pages) emit
//! a [`UiEvent`] instead of holding a reference to the dispatcher. The
//! vocabulary is closed; names only exist at the HTTP edge.

use crate::action::ActionKind;
use crate::error::{InkdeskError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UiEvent {
    CreateClient,
    CreateBooking,
    SendDeposit,
    CreateQuote,
    AiGenerateReply,
    AiSuggestSlots,
    OpenCommandPalette,
}

impl UiEvent {
    pub fn all() -> &'static [UiEvent] {
        &[
            UiEvent::CreateClient,
            UiEvent::CreateBooking,
            UiEvent::SendDeposit,
            UiEvent::CreateQuote,
            UiEvent::AiGenerateReply,
            UiEvent::AiSuggestSlots,
            UiEvent::OpenCommandPalette,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            UiEvent::CreateClient => "create-client",
            UiEvent::CreateBooking => "create-booking",
            UiEvent::SendDeposit => "send-deposit",
            UiEvent::CreateQuote => "create-quote",
            UiEvent::AiGenerateReply => "ai-generate-reply",
            UiEvent::AiSuggestSlots => "ai-suggest-slots",
            UiEvent::OpenCommandPalette => "open-command-palette",
        }
    }

    /// The action this event dispatches, or `None` for palette control.
    pub fn action(self) -> Option<ActionKind> {
        match self {
            UiEvent::CreateClient => Some(ActionKind::CreateClient),
            UiEvent::CreateBooking => Some(ActionKind::CreateBooking),
            UiEvent::SendDeposit => Some(ActionKind::SendDeposit),
            UiEvent::CreateQuote => Some(ActionKind::CreateQuote),
            UiEvent::AiGenerateReply => Some(ActionKind::AiGenerateReply),
            UiEvent::AiSuggestSlots => Some(ActionKind::AiSuggestSlots),
            UiEvent::OpenCommandPalette => None,
        }
    }
}

impl fmt::Display for UiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for UiEvent {
    type Err = InkdeskError;

    fn from_str(s: &str) -> Result<Self> {
        UiEvent::all()
            .iter()
            .copied()
            .find(|e| e.name() == s)
            .ok_or_else(|| InkdeskError::UnknownEvent(s.to_string()))
    }
}

/// Process-wide broadcast of [`UiEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<UiEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(32);
        Self { tx }
    }

    /// Emit to every listener. Returns how many listeners received it.
    pub fn emit(&self, event: UiEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => {
                tracing::debug!(event = %event, "UI event emitted with no listeners");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_round_trip() {
        for ev in UiEvent::all() {
            assert_eq!(ev.name().parse::<UiEvent>().unwrap(), *ev);
        }
        assert!("view-client".parse::<UiEvent>().is_err());
    }

    #[test]
    fn event_to_action_mapping_is_one_to_one() {
        let mapped: Vec<ActionKind> = UiEvent::all().iter().filter_map(|e| e.action()).collect();
        let unique: HashSet<ActionKind> = mapped.iter().copied().collect();
        assert_eq!(mapped.len(), unique.len());
        for ev in UiEvent::all() {
            if let Some(kind) = ev.action() {
                assert_eq!(kind.as_str(), ev.name());
            }
        }
    }

    #[tokio::test]
    async fn listeners_receive_emitted_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        assert_eq!(bus.emit(UiEvent::SendDeposit), 1);
        assert_eq!(rx.recv().await.unwrap(), UiEvent::SendDeposit);
    }

    #[test]
    fn emit_without_listeners_is_harmless() {
        assert_eq!(EventBus::new().emit(UiEvent::OpenCommandPalette), 0);
    }
}
