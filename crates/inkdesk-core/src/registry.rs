//! The action registry.
//!
//! The closed list of actions the studio OS can perform, in palette order.
//! The palette catalog and the assistant's system prompt are both rendered
//! from [`ActionKind`], so neither can name an action the dispatcher lacks.

use crate::action::ActionKind;
use serde::Serialize;
use std::fmt::Write as _;

// ---------------------------------------------------------------------------
// ActionSpec
// ---------------------------------------------------------------------------

/// Catalog entry for one registry member, as shown in the command palette.
#[derive(Debug, Clone, Serialize)]
pub struct ActionSpec {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub summary: &'static str,
    pub fields: &'static [&'static str],
    /// True when dispatching only opens a form and performs no remote call.
    pub opens_modal: bool,
}

/// The registry, in palette order.
pub fn catalog() -> Vec<ActionSpec> {
    ActionKind::all()
        .iter()
        .map(|&kind| ActionSpec {
            kind,
            summary: kind.summary(),
            fields: kind.fields(),
            opens_modal: crate::modal::ModalKind::for_action(kind).is_some(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Interpreter prompt
// ---------------------------------------------------------------------------

/// System prompt for the natural-language interpreter, rendered from
/// [`catalog`] so the AI vocabulary always equals the typed action set.
pub fn system_prompt() -> String {
    let mut prompt = String::from(
        "You translate short requests from tattoo studio staff into exactly one \
         back-office action.\n\nAvailable actions:\n",
    );
    for spec in catalog() {
        let fields = if spec.fields.is_empty() {
            "(no payload)".to_string()
        } else {
            spec.fields.join(", ")
        };
        let _ = writeln!(
            prompt,
            "- {}: {}. Payload fields (all optional): {}",
            spec.kind, spec.summary, fields
        );
    }
    prompt.push_str(
        "\nRespond with a single JSON object and nothing else:\n\
         {\"action\": \"<action type>\", \"payload\": {...}, \"confidence\": <0.0-1.0>, \
         \"reasoning\": \"<one sentence>\", \"alternatives\": [{\"action\": \"...\", \"payload\": {...}}]}\n\
         Only use action types from the list above. Omit payload fields you cannot infer. \
         List alternatives only when the request is ambiguous.",
    );
    prompt
}
