use crate::cmd::dispatch::report;
use crate::cmd::{gateway, load_config};
use crate::output::print_json;
use anyhow::Context;
use inkdesk_agent::{CommandInterpreter, FunctionAssistant};
use inkdesk_core::action::{Action, ActionKind};
use inkdesk_core::dispatcher::{DispatchOutcome, Dispatcher};
use inkdesk_core::interpret::{Interpretation, InterpretedAction};
use inkdesk_core::notice::NoticeBoard;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// An answer to the confirmation prompt.
#[derive(Debug, PartialEq)]
enum Choice {
    Proposal,
    Alternative(usize),
    Decline,
}

/// `y`/`yes` takes the proposal, a number takes that alternative, anything
/// else (including end of input) declines.
fn parse_choice(answer: &str, alternatives: usize) -> Choice {
    let answer = answer.trim().to_ascii_lowercase();
    match answer.as_str() {
        "y" | "yes" => Choice::Proposal,
        other => match other.parse::<usize>() {
            Ok(n) if n < alternatives => Choice::Alternative(n),
            _ => Choice::Decline,
        },
    }
}

fn ask(proposal: &InterpretedAction) -> anyhow::Result<Choice> {
    let hint = if proposal.alternatives.is_empty() {
        "[y/N]".to_string()
    } else {
        format!("[y/N or 0-{}]", proposal.alternatives.len() - 1)
    };
    print!("Dispatch {}? {hint} ", proposal.action.kind());
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read confirmation from stdin")?;
    Ok(parse_choice(&answer, proposal.alternatives.len()))
}

fn print_proposal(proposal: &InterpretedAction) {
    println!(
        "Proposed: {} ({:.0}% confident)",
        proposal.action.kind(),
        proposal.confidence * 100.0
    );
    println!("  {}", proposal.reasoning);
    println!("  payload: {}", proposal.action.payload_json());
    for (i, alt) in proposal.alternatives.iter().enumerate() {
        println!("  alternative {i}: {} {}", alt.kind(), alt.payload_json());
    }
}

/// Interpret `text` and dispatch the proposal only once a person has
/// approved it: either at the prompt, or up front with `--confirm TYPE`
/// naming the action they expect. A proposal of any other type is refused.
pub fn run(
    root: &Path,
    text: &str,
    confirm: Option<&str>,
    offline: bool,
    json: bool,
) -> anyhow::Result<()> {
    let expected: Option<ActionKind> = confirm.map(str::parse::<ActionKind>).transpose()?;

    let config = load_config(root)?;
    let gateway = gateway(&config, offline)?;
    let board = Arc::new(NoticeBoard::new(config.notices.history));
    let dispatcher = Dispatcher::new(gateway.clone(), board.clone(), config.effects.clone());
    let interpreter = CommandInterpreter::new(
        Arc::new(FunctionAssistant::new(gateway, config.assistant.function.clone())),
        Duration::from_secs(config.assistant.timeout_secs),
    );

    let rt = tokio::runtime::Runtime::new()?;
    let interpretation = rt.block_on(interpreter.interpret(text));

    if json && expected.is_none() {
        return print_json(&interpretation);
    }

    let proposal = match &interpretation {
        Interpretation::Empty => {
            println!("Nothing to interpret.");
            return Ok(());
        }
        Interpretation::Failed(failure) => {
            tracing::debug!(detail = %failure.detail, "interpretation failed");
            anyhow::bail!("{}", failure.user_message());
        }
        Interpretation::Understood(proposal) => proposal,
    };

    if !json {
        print_proposal(proposal);
    }

    let action: Action = match expected {
        Some(kind) if proposal.action.kind() == kind => proposal.action.clone(),
        Some(kind) => anyhow::bail!(
            "proposed {} but --confirm named {kind}; nothing dispatched",
            proposal.action.kind()
        ),
        None => match ask(proposal)? {
            Choice::Proposal => proposal.action.clone(),
            Choice::Alternative(n) => proposal.alternatives[n].clone(),
            Choice::Decline => {
                println!("Not dispatched.");
                return Ok(());
            }
        },
    };

    let kind = action.kind();
    let outcome = rt.block_on(dispatcher.dispatch(action));
    report(&dispatcher, &board, &outcome, json)?;
    if let DispatchOutcome::Failed { error } = outcome {
        anyhow::bail!("{kind} failed: {error}");
    }
    Ok(())
}
