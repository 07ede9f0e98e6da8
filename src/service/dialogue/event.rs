use crate::service::{channel::MessageRef, settings::UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Generate,
    Settings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Command(Command),
    /// Message text; media and other non-text messages arrive as an empty string.
    Text(String),
    /// Button press carrying its raw token and the message it was attached to.
    Button { token: String, origin: Option<MessageRef> },
}

/// One inbound unit of work attributed to a single user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub user: UserId,
    pub name: String,
    pub kind: EventKind,
}

impl Event {
    pub fn command(user: UserId, name: &str, command: Command) -> Self {
        Self {
            user,
            name: name.to_string(),
            kind: EventKind::Command(command),
        }
    }

    pub fn text(user: UserId, name: &str, text: &str) -> Self {
        Self {
            user,
            name: name.to_string(),
            kind: EventKind::Text(text.to_string()),
        }
    }

    pub fn button(user: UserId, name: &str, token: &str, origin: Option<MessageRef>) -> Self {
        Self {
            user,
            name: name.to_string(),
            kind: EventKind::Button {
                token: token.to_string(),
                origin,
            },
        }
    }

    /// Whether the event leaves the session as it is, on failure too.
    pub fn keeps_session(&self) -> bool {
        matches!(self.kind, EventKind::Command(Command::Start | Command::Help))
    }
}

/// Result of handling one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Handled,
    /// Stale or out-of-state event, dropped without side effects.
    Ignored,
    /// The user was shown the generic error message.
    Failed,
}
