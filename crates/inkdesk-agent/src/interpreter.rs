//! Natural-language command interpretation.
//!
//! [`CommandInterpreter`] turns one line of staff input into an
//! [`Interpretation`]; it never dispatches. [`CommandSession`] adds the
//! latest-wins rule for the palette: only the newest request's result is
//! shown, and confirming hands the chosen [`Action`] back to the caller.

use crate::assistant::CompletionBackend;
use crate::types::ChatMessage;
use inkdesk_core::action::Action;
use inkdesk_core::interpret::{
    parse_response, CommandSlot, FailureReason, Interpretation, InterpretationFailure,
    PendingCommand,
};
use inkdesk_core::registry;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub struct CommandInterpreter {
    backend: Arc<dyn CompletionBackend>,
    timeout: Duration,
    prompt: String,
}

impl CommandInterpreter {
    pub fn new(backend: Arc<dyn CompletionBackend>, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            prompt: registry::system_prompt(),
        }
    }

    pub async fn interpret(&self, text: &str) -> Interpretation {
        let text = text.trim();
        if text.is_empty() {
            return Interpretation::Empty;
        }

        let messages = vec![ChatMessage::system(&self.prompt), ChatMessage::user(text)];
        let content = match tokio::time::timeout(self.timeout, self.backend.complete(messages)).await
        {
            Ok(Ok(content)) => content,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "assistant call failed");
                return Interpretation::Failed(InterpretationFailure::new(
                    FailureReason::Remote,
                    e.to_string(),
                ));
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "assistant call timed out");
                return Interpretation::Failed(InterpretationFailure::new(
                    FailureReason::Remote,
                    format!("no reply within {}s", self.timeout.as_secs_f32()),
                ));
            }
        };

        match parse_response(&content) {
            Ok(proposal) => {
                tracing::debug!(
                    action = %proposal.action.kind(),
                    confidence = proposal.confidence,
                    "command understood"
                );
                Interpretation::Understood(proposal)
            }
            Err(failure) => {
                tracing::warn!(reason = ?failure.reason, detail = %failure.detail, "could not parse assistant reply");
                Interpretation::Failed(failure)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CommandSession
// ---------------------------------------------------------------------------

/// What became of one [`CommandSession::submit`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// The interpretation is now the shown proposal.
    Shown(PendingCommand),
    /// Blank input. Nothing was sent and the slot is untouched; carries
    /// whatever was already shown.
    Ignored(Option<PendingCommand>),
    /// A newer submission was made while this one was in flight.
    Superseded,
}

pub struct CommandSession {
    interpreter: CommandInterpreter,
    slot: Mutex<CommandSlot>,
}

impl CommandSession {
    pub fn new(interpreter: CommandInterpreter) -> Self {
        Self {
            interpreter,
            slot: Mutex::new(CommandSlot::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CommandSlot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Interpret `text` and show the result unless a newer submission was
    /// made while this one was in flight.
    ///
    /// Blank input takes no ticket, so it neither replaces the shown
    /// proposal nor supersedes a command still in flight.
    pub async fn submit(&self, text: &str) -> Submission {
        if text.trim().is_empty() {
            return Submission::Ignored(self.shown());
        }
        let ticket = self.lock().begin();
        let interpretation = self.interpreter.interpret(text).await;
        let mut slot = self.lock();
        if !slot.offer(ticket, text, interpretation) {
            return Submission::Superseded;
        }
        match slot.shown() {
            Some(shown) => Submission::Shown(shown.clone()),
            None => Submission::Superseded,
        }
    }

    pub fn shown(&self) -> Option<PendingCommand> {
        self.lock().shown().cloned()
    }

    /// The action to dispatch for the shown proposal (or its alternative
    /// `n`). The proposal is cleared once taken.
    pub fn confirm(&self, alternative: Option<usize>) -> Option<Action> {
        self.lock().confirm(alternative)
    }

    pub fn discard(&self) -> bool {
        self.lock().discard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::FunctionAssistant;
    use async_trait::async_trait;
    use inkdesk_core::action::ActionKind;
    use inkdesk_core::gateway::{Call, GatewayError, MemoryGateway};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MARIA: &str = r#"Sure! ```json
{"action":"create-booking","payload":{"clientName":"Maria","preferredDate":"next Tuesday"},"confidence":0.92,"reasoning":"Staff asked to book Maria."}
```"#;

    /// Answers every input with a booking for a client of that name. A few
    /// inputs are scripted to stall or fail. Counts calls.
    struct ScriptedBackend {
        calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let text = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            match text.as_str() {
                "slow" => tokio::time::sleep(Duration::from_millis(150)).await,
                "hang" => tokio::time::sleep(Duration::from_secs(10)).await,
                "prose" => return Ok("I am not sure what you mean.".to_string()),
                "offline" => {
                    return Err(GatewayError::Transport("connection refused".to_string()))
                }
                _ => {}
            }
            Ok(json!({
                "action": "create-booking",
                "payload": {"clientName": text},
                "confidence": 0.8
            })
            .to_string())
        }
    }

    fn interpreter(backend: Arc<ScriptedBackend>) -> CommandInterpreter {
        CommandInterpreter::new(backend, Duration::from_secs(2))
    }

    #[tokio::test]
    async fn blank_input_makes_no_call() {
        let backend = ScriptedBackend::new();
        let interp = interpreter(backend.clone());
        assert_eq!(interp.interpret("   \n").await, Interpretation::Empty);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn maria_booking_through_ai_function() {
        let gw = Arc::new(
            MemoryGateway::new().with_function("ai-chat", |_| Ok(json!({ "content": MARIA }))),
        );
        let backend = Arc::new(FunctionAssistant::new(gw.clone(), "ai-chat"));
        let interp = CommandInterpreter::new(backend, Duration::from_secs(2));

        let result = interp.interpret("book Maria for next Tuesday").await;
        let proposal = result.understood().expect("understood");
        assert_eq!(proposal.action.kind(), ActionKind::CreateBooking);
        assert_eq!(proposal.confidence, 0.92);
        let Action::CreateBooking(booking) = &proposal.action else {
            panic!("expected booking")
        };
        assert_eq!(booking.client_name.as_deref(), Some("Maria"));

        // Interpreting only talked to the AI function; nothing was dispatched.
        let calls = gw.calls();
        assert_eq!(calls.len(), 1);
        let Call::Invoke(name, body) = &calls[0] else {
            panic!("expected invoke")
        };
        assert_eq!(name, "ai-chat");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "book Maria for next Tuesday");
    }

    #[tokio::test]
    async fn prose_reply_fails_with_generic_message() {
        let interp = interpreter(ScriptedBackend::new());
        let Interpretation::Failed(failure) = interp.interpret("prose").await else {
            panic!("expected failure")
        };
        assert_eq!(failure.reason, FailureReason::NoJson);
        assert_eq!(failure.user_message(), "Could not understand the command");
    }

    #[tokio::test]
    async fn remote_error_is_a_failure_not_a_panic() {
        let interp = interpreter(ScriptedBackend::new());
        let Interpretation::Failed(failure) = interp.interpret("offline").await else {
            panic!("expected failure")
        };
        assert_eq!(failure.reason, FailureReason::Remote);
        assert!(failure.detail.contains("connection refused"));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let interp = CommandInterpreter::new(ScriptedBackend::new(), Duration::from_millis(50));
        let Interpretation::Failed(failure) = interp.interpret("hang").await else {
            panic!("expected failure")
        };
        assert_eq!(failure.reason, FailureReason::Remote);
    }

    #[tokio::test]
    async fn latest_submission_wins() {
        let session = CommandSession::new(interpreter(ScriptedBackend::new()));

        let (older, newer) = tokio::join!(session.submit("slow"), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            session.submit("fast").await
        });

        assert_eq!(older, Submission::Superseded);
        let Submission::Shown(newer) = newer else {
            panic!("expected the newer command to be shown")
        };
        assert_eq!(newer.text, "fast");
        assert_eq!(session.shown().unwrap().text, "fast");
    }

    #[tokio::test]
    async fn confirm_takes_the_shown_action_once() {
        let session = CommandSession::new(interpreter(ScriptedBackend::new()));
        assert!(matches!(session.submit("Maria").await, Submission::Shown(_)));

        let action = session.confirm(None).unwrap();
        assert_eq!(action.kind(), ActionKind::CreateBooking);
        assert!(session.shown().is_none());
        assert!(session.confirm(None).is_none());
    }

    #[tokio::test]
    async fn failed_interpretation_cannot_be_confirmed() {
        let session = CommandSession::new(interpreter(ScriptedBackend::new()));
        assert!(matches!(session.submit("prose").await, Submission::Shown(_)));
        assert!(session.confirm(None).is_none());
        assert!(session.discard());
        assert!(!session.discard());
    }

    #[tokio::test]
    async fn blank_submit_keeps_the_shown_proposal() {
        let backend = ScriptedBackend::new();
        let session = CommandSession::new(interpreter(backend.clone()));
        let Submission::Shown(maria) = session.submit("Maria").await else {
            panic!("expected Maria to be shown")
        };

        assert_eq!(
            session.submit("   ").await,
            Submission::Ignored(Some(maria.clone()))
        );
        assert_eq!(session.shown(), Some(maria));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        let action = session.confirm(None).unwrap();
        assert_eq!(action.kind(), ActionKind::CreateBooking);
    }

    #[tokio::test]
    async fn blank_submit_does_not_supersede_a_command_in_flight() {
        let session = CommandSession::new(interpreter(ScriptedBackend::new()));

        let (real, blank) = tokio::join!(session.submit("slow"), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            session.submit("").await
        });

        assert_eq!(blank, Submission::Ignored(None));
        let Submission::Shown(real) = real else {
            panic!("expected the real command to be shown")
        };
        assert_eq!(real.text, "slow");
        assert_eq!(session.shown().unwrap().text, "slow");
    }
}
