use crate::cmd::{gateway, load_config};
use crate::output::{print_json, print_notices};
use anyhow::Context;
use inkdesk_core::action::{Action, ActionKind};
use inkdesk_core::dispatcher::{DispatchOutcome, Dispatcher};
use inkdesk_core::notice::NoticeBoard;
use std::path::Path;
use std::sync::Arc;

pub fn run(
    root: &Path,
    action_type: &str,
    payload: Option<&str>,
    offline: bool,
    json: bool,
) -> anyhow::Result<()> {
    let kind: ActionKind = action_type.parse()?;
    let payload: serde_json::Value = match payload {
        Some(raw) => serde_json::from_str(raw).context("--payload is not valid JSON")?,
        None => serde_json::Value::Null,
    };
    let action = Action::from_parts(kind, payload)?;

    let config = load_config(root)?;
    let gateway = gateway(&config, offline)?;
    let board = Arc::new(NoticeBoard::new(config.notices.history));
    let dispatcher = Dispatcher::new(gateway, board.clone(), config.effects.clone());

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(dispatcher.dispatch(action));
    report(&dispatcher, &board, &outcome, json)?;

    if let DispatchOutcome::Failed { error } = outcome {
        anyhow::bail!("{kind} failed: {error}");
    }
    Ok(())
}

/// Print what a dispatch did: the outcome, any notices, and the form a
/// modal-opening action would show.
pub fn report(
    dispatcher: &Dispatcher,
    board: &NoticeBoard,
    outcome: &DispatchOutcome,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        return print_json(&serde_json::json!({
            "result": outcome,
            "notices": board.recent(),
            "incidents": board.incidents(),
        }));
    }

    if let DispatchOutcome::Opened { modal } = outcome {
        println!("Opened {modal} form:");
        print_json(&dispatcher.modals())?;
    }
    print_notices(&board.recent());
    for incident in board.incidents() {
        eprintln!("note: {} ({})", incident.detail, incident.source);
    }
    Ok(())
}
