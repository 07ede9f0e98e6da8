use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::service::{menu::Keyboard, settings::UserId};

/// Reference to a message previously sent by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Invalid media url {url}: {reason}")]
    InvalidMedia { url: String, reason: String },
}

/// Outbound side of the chat transport. Texts are HTML formatted.
#[async_trait]
pub trait ChatChannel: Send + Sync + 'static {
    async fn send_text(&self, user: UserId, text: &str, keyboard: Option<&Keyboard>)
        -> Result<MessageRef, ChannelError>;

    /// Replaces text and keyboard of `message`. Re-sending identical content succeeds.
    async fn edit_text(&self, message: MessageRef, text: &str, keyboard: Option<&Keyboard>)
        -> Result<(), ChannelError>;

    async fn delete_message(&self, message: MessageRef) -> Result<(), ChannelError>;

    async fn send_image(&self, user: UserId, url: &str) -> Result<(), ChannelError>;

    async fn send_image_group(&self, user: UserId, urls: &[String]) -> Result<(), ChannelError>;
}
