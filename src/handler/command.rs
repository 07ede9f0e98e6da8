use teloxide::{
    dispatching::{HandlerExt, UpdateHandler},
    prelude::*,
    types::Message,
};

use super::sender;
use crate::{command::UserCommand, error::HandlerResult, service::dialogue::Event, state::AppState};

async fn handle_command(state: AppState, msg: Message, cmd: UserCommand) -> HandlerResult<()> {
    let (user, name) = sender(&msg);
    info!("Received /{:?} from user {}", cmd, user);

    state
        .services
        .dialogue
        .handle(Event::command(user, &name, cmd.into()))
        .await;

    Ok(())
}

pub fn get_command_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync>> {
    Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .filter_command::<UserCommand>()
        .endpoint(handle_command)
}
