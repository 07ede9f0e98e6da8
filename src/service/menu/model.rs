use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::service::settings::{Model, Quantity, Size};

/// One screen of the settings wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WizardStep {
    ChooseModel,
    ChooseSize,
    ChooseQuantity,
}

impl WizardStep {
    pub const ALL: [WizardStep; 3] = [WizardStep::ChooseModel, WizardStep::ChooseSize, WizardStep::ChooseQuantity];

    /// Step shown after a value is chosen on this one. The wizard is a cycle.
    pub fn forward(&self) -> WizardStep {
        match self {
            WizardStep::ChooseModel => WizardStep::ChooseSize,
            WizardStep::ChooseSize => WizardStep::ChooseQuantity,
            WizardStep::ChooseQuantity => WizardStep::ChooseModel,
        }
    }

    /// Target of the "back" control, `None` on the first step.
    pub fn back(&self) -> Option<WizardStep> {
        match self {
            WizardStep::ChooseModel => None,
            WizardStep::ChooseSize => Some(WizardStep::ChooseModel),
            WizardStep::ChooseQuantity => Some(WizardStep::ChooseSize),
        }
    }

    /// Choices per keyboard row.
    pub fn row_width(&self) -> usize {
        match self {
            WizardStep::ChooseModel => 2,
            WizardStep::ChooseSize | WizardStep::ChooseQuantity => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WizardStep::ChooseModel => "models",
            WizardStep::ChooseSize => "sizes",
            WizardStep::ChooseQuantity => "quantities",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WizardStep {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "models" => Ok(WizardStep::ChooseModel),
            "sizes" => Ok(WizardStep::ChooseSize),
            "quantities" => Ok(WizardStep::ChooseQuantity),
            _ => Err(ParseActionError::InvalidArgument(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseActionError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    #[error("Missing argument for {0}")]
    MissingArgument(&'static str),
    #[error("Unexpected argument: {0}")]
    UnexpectedArgument(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Button press payload, encoded as `<action>` or `<action> <argument>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    GenerateAccept,
    Cancel,
    ChooseModel(Model),
    ChooseSize(Size),
    ChooseQuantity(Quantity),
    BackTo(WizardStep),
    Close,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::GenerateAccept => "generate_accept",
            Action::Cancel => "cancel",
            Action::ChooseModel(_) => "choose_model",
            Action::ChooseSize(_) => "choose_size",
            Action::ChooseQuantity(_) => "choose_quantity",
            Action::BackTo(_) => "back_to",
            Action::Close => "close",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::GenerateAccept | Action::Cancel | Action::Close => f.write_str(self.name()),
            Action::ChooseModel(model) => write!(f, "{} {}", self.name(), model),
            Action::ChooseSize(size) => write!(f, "{} {}", self.name(), size),
            Action::ChooseQuantity(quantity) => write!(f, "{} {}", self.name(), quantity),
            Action::BackTo(step) => write!(f, "{} {}", self.name(), step),
        }
    }
}

impl FromStr for Action {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, argument) = match s.split_once(' ') {
            Some((name, argument)) => (name, Some(argument)),
            None => (s, None),
        };

        let required = |action: &'static str| argument.ok_or(ParseActionError::MissingArgument(action));
        let invalid = |argument: &str| ParseActionError::InvalidArgument(argument.to_string());

        let action = match name {
            "generate_accept" => Action::GenerateAccept,
            "cancel" => Action::Cancel,
            "close" => Action::Close,
            "choose_model" => {
                let argument = required("choose_model")?;
                Action::ChooseModel(argument.parse().map_err(|_| invalid(argument))?)
            }
            "choose_size" => {
                let argument = required("choose_size")?;
                Action::ChooseSize(argument.parse().map_err(|_| invalid(argument))?)
            }
            "choose_quantity" => {
                let argument = required("choose_quantity")?;
                Action::ChooseQuantity(argument.parse().map_err(|_| invalid(argument))?)
            }
            "back_to" => Action::BackTo(required("back_to")?.parse()?),
            _ => return Err(ParseActionError::UnknownAction(name.to_string())),
        };

        if let (Action::GenerateAccept | Action::Cancel | Action::Close, Some(argument)) = (action, argument) {
            return Err(ParseActionError::UnexpectedArgument(argument.to_string()));
        }

        Ok(action)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: Action,
}

impl Button {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }

    pub fn token(&self) -> String {
        self.action.to_string()
    }
}

/// Transport-neutral inline keyboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Screen {
    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}
