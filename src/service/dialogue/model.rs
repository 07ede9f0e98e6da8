use serde::{Deserialize, Serialize};

use crate::service::{channel::MessageRef, menu::WizardStep};

#[derive(Clone, Copy, Default, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum DialogueState {
    #[default]
    Idle,
    // Generation
    AwaitingGenerateConfirm,
    AwaitingPrompt,
    // Settings
    SettingsMenu(WizardStep),
}

/// Per-user conversation state. `anchor` is the message whose text and keyboard are edited in place.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Session {
    pub state: DialogueState,
    pub anchor: Option<MessageRef>,
}

impl Session {
    pub fn is_idle(&self) -> bool {
        self.state == DialogueState::Idle
    }

    pub fn enter(&mut self, state: DialogueState, anchor: MessageRef) {
        self.state = state;
        self.anchor = Some(anchor);
    }

    pub fn reset(&mut self) {
        *self = Session::default();
    }

    /// A button belongs to this session only if it was pressed on the current anchor.
    pub fn is_anchored_on(&self, origin: Option<MessageRef>) -> bool {
        matches!((self.anchor, origin), (Some(anchor), Some(origin)) if anchor == origin)
    }
}
