// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::ids::QuoteId;

/// Whether the form is composing a brand-new quote or editing an archived
/// one. The distinction decides insert vs. update on the next archive save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftState {
    New,
    Editing(QuoteId),
}

impl DraftState {
    pub const fn edit_id(self) -> Option<QuoteId> {
        match self {
            Self::New => None,
            Self::Editing(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    BeginArchiveSave,
    FinishArchiveSave(QuoteId),
    AbortArchiveSave,
    OpenForEdit(QuoteId),
    StartNew,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SaveStarted,
    /// A save was requested while another one was still in flight.
    SaveRejected,
    SaveFinished(QuoteId),
    SaveAborted,
    StateChanged(DraftState),
}

/// Tracks the form's editing mode and the in-flight save guard. All
/// transitions go through [`FormSession::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormSession {
    state: DraftState,
    save_in_flight: bool,
}

impl Default for FormSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FormSession {
    pub const fn new() -> Self {
        Self {
            state: DraftState::New,
            save_in_flight: false,
        }
    }

    /// Restores the mode persisted alongside the draft slot.
    pub const fn from_edit_id(edit_id: Option<QuoteId>) -> Self {
        Self {
            state: match edit_id {
                Some(id) => DraftState::Editing(id),
                None => DraftState::New,
            },
            save_in_flight: false,
        }
    }

    pub const fn state(&self) -> DraftState {
        self.state
    }

    pub const fn save_in_flight(&self) -> bool {
        self.save_in_flight
    }

    pub fn dispatch(&mut self, command: SessionCommand) -> Vec<SessionEvent> {
        match command {
            SessionCommand::BeginArchiveSave => {
                if self.save_in_flight {
                    return vec![SessionEvent::SaveRejected];
                }
                self.save_in_flight = true;
                vec![SessionEvent::SaveStarted]
            }
            SessionCommand::FinishArchiveSave(id) => {
                self.save_in_flight = false;
                self.state = DraftState::Editing(id);
                vec![
                    SessionEvent::SaveFinished(id),
                    SessionEvent::StateChanged(self.state),
                ]
            }
            SessionCommand::AbortArchiveSave => {
                self.save_in_flight = false;
                vec![SessionEvent::SaveAborted]
            }
            SessionCommand::OpenForEdit(id) => {
                self.save_in_flight = false;
                self.state = DraftState::Editing(id);
                vec![SessionEvent::StateChanged(self.state)]
            }
            SessionCommand::StartNew => {
                self.save_in_flight = false;
                self.state = DraftState::New;
                vec![SessionEvent::StateChanged(self.state)]
            }
        }
    }
}
