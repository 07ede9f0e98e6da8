use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::service::menu::Keyboard;

pub fn get_inline_keyboard(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|button| InlineKeyboardButton::callback(button.label.clone(), button.token()))
            .collect::<Vec<_>>()
    }))
}
