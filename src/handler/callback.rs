use teloxide::{adaptors::Throttle, dispatching::UpdateHandler, prelude::*, types::CallbackQuery};

use crate::{
    error::HandlerResult,
    service::{channel::MessageRef, dialogue::Event, settings::UserId},
    state::AppState,
};

async fn handle_callback(bot: Throttle<Bot>, state: AppState, q: CallbackQuery) -> HandlerResult<()> {
    // Always acknowledge so the client stops its progress indicator, stale presses included.
    // Telegram refuses late answers, which must not cost the press itself.
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!("Failed to answer callback query from {}: {}", q.from.id, e);
    }

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };

    // Buttons on inline-mode messages carry no chat and are not ours.
    let Some(message) = q.message.as_ref() else {
        debug!("Ignoring callback without message from {}", q.from.id);
        return Ok(());
    };

    let origin = MessageRef {
        chat_id: message.chat().id.0,
        message_id: message.id().0,
    };
    let user = UserId(origin.chat_id);

    state
        .services
        .dialogue
        .handle(Event::button(user, &q.from.full_name(), data, Some(origin)))
        .await;

    Ok(())
}

pub fn get_callback_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    Update::filter_callback_query().endpoint(handle_callback)
}
