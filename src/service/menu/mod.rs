mod model;

pub use model::*;

use crate::service::settings::{Model, Quantity, Settings};

const SELECTED_MARKER: &str = " ✔️";
const KEYCAPS: [&str; 6] = ["1️⃣", "2️⃣", "3️⃣", "4️⃣", "5️⃣", "6️⃣"];

/// One selectable value of a wizard step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub action: Action,
    pub label: String,
    pub selected: bool,
}

/// Legal values of `step` for the given settings, in menu order, with the current one marked.
pub fn choices(step: WizardStep, settings: &Settings) -> Vec<Choice> {
    match step {
        WizardStep::ChooseModel => Model::ALL
            .iter()
            .map(|model| Choice {
                action: Action::ChooseModel(*model),
                label: model.as_str().to_string(),
                selected: *model == settings.model,
            })
            .collect(),
        WizardStep::ChooseSize => settings
            .model
            .sizes()
            .iter()
            .map(|size| Choice {
                action: Action::ChooseSize(*size),
                label: size.as_str().to_string(),
                selected: *size == settings.size,
            })
            .collect(),
        WizardStep::ChooseQuantity => Quantity::all()
            .map(|quantity| Choice {
                action: Action::ChooseQuantity(quantity),
                label: quantity_label(quantity),
                selected: quantity == settings.quantity,
            })
            .collect(),
    }
}

fn quantity_label(quantity: Quantity) -> String {
    KEYCAPS
        .get(quantity.get() as usize - 1)
        .map(|keycap| keycap.to_string())
        .unwrap_or_else(|| quantity.to_string())
}

/// Wizard screen for `step`: choice rows, then "back" when the step has one, then "close".
pub fn render(step: WizardStep, settings: &Settings, locale: &str) -> Screen {
    let mut rows: Vec<Vec<Button>> = choices(step, settings)
        .chunks(step.row_width())
        .map(|chunk| {
            chunk
                .iter()
                .map(|choice| {
                    let label = if choice.selected {
                        format!("{}{}", choice.label, SELECTED_MARKER)
                    } else {
                        choice.label.clone()
                    };
                    Button::new(label, choice.action)
                })
                .collect()
        })
        .collect();

    if let Some(previous) = step.back() {
        rows.push(vec![Button::new(t!("buttons.back", locale = locale), Action::BackTo(previous))]);
    }
    rows.push(vec![Button::new(t!("buttons.close", locale = locale), Action::Close)]);

    let text = match step {
        WizardStep::ChooseModel => t!("messages.settings.choose_model", locale = locale),
        WizardStep::ChooseSize => t!("messages.settings.choose_size", locale = locale),
        WizardStep::ChooseQuantity => t!("messages.settings.choose_quantity", locale = locale),
    };

    Screen::with_keyboard(text, Keyboard::new(rows))
}

/// Current settings with the control that starts the prompt flow.
pub fn status_screen(settings: &Settings, locale: &str) -> Screen {
    let text = t!(
        "messages.generate.status",
        locale = locale,
        model = settings.model.as_str(),
        size = settings.size.as_str(),
        quantity = settings.quantity.to_string()
    );
    let keyboard = Keyboard::new(vec![vec![Button::new(
        t!("buttons.continue", locale = locale),
        Action::GenerateAccept,
    )]]);

    Screen::with_keyboard(text, keyboard)
}

pub fn prompt_screen(locale: &str) -> Screen {
    let keyboard = Keyboard::new(vec![vec![Button::new(t!("buttons.cancel", locale = locale), Action::Cancel)]]);

    Screen::with_keyboard(t!("messages.generate.send_prompt", locale = locale), keyboard)
}
