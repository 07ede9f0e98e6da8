use teloxide::{adaptors::Throttle, macros::BotCommands, prelude::Requester, types::BotCommand, Bot};

use crate::{error::HandlerResult, service::dialogue::Command};

#[derive(BotCommands, Clone, Copy, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase")]
pub enum UserCommand {
    Start,
    Help,
    Generate,
    Settings,
}

impl From<UserCommand> for Command {
    fn from(command: UserCommand) -> Self {
        match command {
            UserCommand::Start => Command::Start,
            UserCommand::Help => Command::Help,
            UserCommand::Generate => Command::Generate,
            UserCommand::Settings => Command::Settings,
        }
    }
}

impl UserCommand {
    pub fn user_commands(locale: &str) -> Vec<BotCommand> {
        vec![
            BotCommand::new("start", t!("commands.start", locale = locale)),
            BotCommand::new("help", t!("commands.help", locale = locale)),
            BotCommand::new("generate", t!("commands.generate", locale = locale)),
            BotCommand::new("settings", t!("commands.settings", locale = locale)),
        ]
    }
}

pub async fn setup_user_commands(bot: &Throttle<Bot>, locale: &str) -> HandlerResult<()> {
    bot.delete_my_commands().await?;
    bot.set_my_commands(UserCommand::user_commands(locale)).await?;
    Ok(())
}
