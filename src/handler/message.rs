use teloxide::{dispatching::UpdateHandler, prelude::*, types::Message};

use super::sender;
use crate::{error::HandlerResult, service::dialogue::Event, state::AppState};

/// Forwards private messages that are not known commands. Whether a leading `/` means an unknown
/// command or part of a prompt depends on the session, so the dialogue decides.
async fn handle_message(state: AppState, msg: Message) -> HandlerResult<()> {
    let (user, name) = sender(&msg);

    // Media and other non-text messages count as an empty prompt.
    let text = msg.text().unwrap_or_default();
    state.services.dialogue.handle(Event::text(user, &name, text)).await;

    Ok(())
}

pub fn get_message_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .endpoint(handle_message)
}
