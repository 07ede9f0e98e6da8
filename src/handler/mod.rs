mod callback;
mod channel;
mod command;
mod keyboard;
mod message;

pub use channel::TelegramChannel;
pub use keyboard::get_inline_keyboard;

use callback::get_callback_handler;
use command::get_command_handler;
use message::get_message_handler;
use teloxide::{dispatching::UpdateHandler, dptree, types::Message};

use crate::service::settings::UserId;

pub fn get_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    dptree::entry()
        .branch(get_command_handler())
        .branch(get_callback_handler())
        .branch(get_message_handler())
}

/// User and display name of a private-chat message. The chat id identifies the user.
fn sender(msg: &Message) -> (UserId, String) {
    let name = msg
        .from
        .as_ref()
        .map(|user| user.full_name())
        .or_else(|| msg.chat.first_name().map(str::to_string))
        .unwrap_or_default();

    (UserId(msg.chat.id.0), name)
}
