//! Modal visibility owned by the dispatcher.
//!
//! Each modal is either `Closed` or `Open(seed)`. There is no submitting or
//! error state here; those belong to the form itself. Closing a modal never
//! undoes a remote mutation the form already made.

use crate::action::{ActionKind, ClientDraft, ClientRef};
use crate::error::{InkdeskError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModalKind {
    CreateClient,
    ViewClient,
}

impl ModalKind {
    pub fn all() -> &'static [ModalKind] {
        &[ModalKind::CreateClient, ModalKind::ViewClient]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModalKind::CreateClient => "create-client",
            ModalKind::ViewClient => "view-client",
        }
    }

    /// The modal an action opens, if any.
    pub fn for_action(kind: ActionKind) -> Option<ModalKind> {
        match kind {
            ActionKind::CreateClient => Some(ModalKind::CreateClient),
            ActionKind::ViewClient => Some(ModalKind::ViewClient),
            ActionKind::CreateBooking
            | ActionKind::SendDeposit
            | ActionKind::CreateQuote
            | ActionKind::AiGenerateReply
            | ActionKind::AiSuggestSlots => None,
        }
    }
}

impl fmt::Display for ModalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModalKind {
    type Err = InkdeskError;

    fn from_str(s: &str) -> Result<Self> {
        ModalKind::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| InkdeskError::UnknownModal(s.to_string()))
    }
}

/// How an open modal was left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalExit {
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum ModalState<T> {
    #[default]
    Closed,
    Open(T),
}

impl<T> ModalState<T> {
    pub fn is_open(&self) -> bool {
        matches!(self, ModalState::Open(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ModalState::Open(seed) => Some(seed),
            ModalState::Closed => None,
        }
    }
}

/// Every modal the dispatcher controls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Modals {
    pub create_client: ModalState<ClientDraft>,
    pub view_client: ModalState<ClientRef>,
}

impl Modals {
    /// Open (or re-seed) the new-client form.
    pub fn open_create_client(&mut self, seed: ClientDraft) {
        self.create_client = ModalState::Open(seed);
    }

    /// Open (or re-seed) the client profile.
    pub fn open_view_client(&mut self, seed: ClientRef) {
        self.view_client = ModalState::Open(seed);
    }

    /// Close `kind`. Returns false if it was already closed.
    pub fn close(&mut self, kind: ModalKind) -> bool {
        let was_open = self.is_open(kind);
        match kind {
            ModalKind::CreateClient => self.create_client = ModalState::Closed,
            ModalKind::ViewClient => self.view_client = ModalState::Closed,
        }
        was_open
    }

    pub fn is_open(&self, kind: ModalKind) -> bool {
        match kind {
            ModalKind::CreateClient => self.create_client.is_open(),
            ModalKind::ViewClient => self.view_client.is_open(),
        }
    }
}
