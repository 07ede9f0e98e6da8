use async_trait::async_trait;
use teloxide::{
    adaptors::Throttle,
    payloads::{EditMessageTextSetters, SendMessageSetters},
    prelude::*,
    types::{InputFile, InputMedia, InputMediaPhoto, MessageId, ParseMode},
    ApiError, RequestError,
};
use url::Url;

use super::keyboard::get_inline_keyboard;
use crate::service::{
    channel::{ChannelError, ChatChannel, MessageRef},
    menu::Keyboard,
    settings::UserId,
};

impl From<RequestError> for ChannelError {
    fn from(error: RequestError) -> Self {
        ChannelError::Transport(error.to_string())
    }
}

/// Chat channel over the Telegram Bot API. Texts use HTML parse mode.
#[derive(Clone)]
pub struct TelegramChannel {
    bot: Throttle<Bot>,
}

impl TelegramChannel {
    pub fn new(bot: Throttle<Bot>) -> Self {
        Self { bot }
    }
}

fn parse_media_url(url: &str) -> Result<Url, ChannelError> {
    Url::parse(url).map_err(|e| ChannelError::InvalidMedia {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl ChatChannel for TelegramChannel {
    async fn send_text(
        &self,
        user: UserId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef, ChannelError> {
        let mut request = self.bot.send_message(ChatId(user.0), text).parse_mode(ParseMode::Html);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(get_inline_keyboard(keyboard));
        }

        let message = request.await?;

        Ok(MessageRef {
            chat_id: message.chat.id.0,
            message_id: message.id.0,
        })
    }

    async fn edit_text(&self, message: MessageRef, text: &str, keyboard: Option<&Keyboard>) -> Result<(), ChannelError> {
        let mut request = self
            .bot
            .edit_message_text(ChatId(message.chat_id), MessageId(message.message_id), text)
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(get_inline_keyboard(keyboard));
        }

        match request.await {
            Ok(_) => Ok(()),
            // Re-rendering an identical screen.
            Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_message(&self, message: MessageRef) -> Result<(), ChannelError> {
        self.bot
            .delete_message(ChatId(message.chat_id), MessageId(message.message_id))
            .await?;
        Ok(())
    }

    async fn send_image(&self, user: UserId, url: &str) -> Result<(), ChannelError> {
        let url = parse_media_url(url)?;
        self.bot.send_photo(ChatId(user.0), InputFile::url(url)).await?;
        Ok(())
    }

    async fn send_image_group(&self, user: UserId, urls: &[String]) -> Result<(), ChannelError> {
        let media = urls
            .iter()
            .map(|url| {
                let url = parse_media_url(url)?;
                Ok(InputMedia::Photo(InputMediaPhoto::new(InputFile::url(url))))
            })
            .collect::<Result<Vec<_>, ChannelError>>()?;

        self.bot.send_media_group(ChatId(user.0), media).await?;
        Ok(())
    }
}
