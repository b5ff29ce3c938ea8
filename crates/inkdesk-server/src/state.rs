use inkdesk_agent::{CommandInterpreter, CommandSession, FunctionAssistant};
use inkdesk_core::config::Config;
use inkdesk_core::dispatcher::Dispatcher;
use inkdesk_core::events::EventBus;
use inkdesk_core::gateway::Gateway;
use inkdesk_core::notice::{NoticeBoard, Signal};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub session: Arc<CommandSession>,
    pub notices: Arc<NoticeBoard>,
    pub bus: EventBus,
    pub event_tx: broadcast::Sender<Signal>,
}

impl AppState {
    pub fn new(config: &Config, gateway: Arc<dyn Gateway>) -> Self {
        let notices = Arc::new(NoticeBoard::new(config.notices.history));
        let dispatcher = Arc::new(Dispatcher::new(
            gateway.clone(),
            notices.clone(),
            config.effects.clone(),
        ));
        let assistant = Arc::new(FunctionAssistant::new(
            gateway,
            config.assistant.function.clone(),
        ));
        let interpreter = CommandInterpreter::new(
            assistant,
            Duration::from_secs(config.assistant.timeout_secs),
        );
        let event_tx = notices.sender();

        // Client lists in connected browsers re-fetch on this signal.
        let tx = event_tx.clone();
        dispatcher.on_client_refresh(move || {
            let _ = tx.send(Signal::Refresh {
                topic: "clients".to_string(),
            });
        });

        let bus = EventBus::new();
        // Guard: only spawn if inside a Tokio runtime (skipped in sync unit tests).
        if tokio::runtime::Handle::try_current().is_ok() {
            dispatcher.clone().listen(&bus);
        }

        Self {
            dispatcher,
            session: Arc::new(CommandSession::new(interpreter)),
            notices,
            bus,
            event_tx,
        }
    }
}
