use crate::{
    service::{channel::ChannelError, generator::GeneratorError, settings::UserId},
    storage::StorageError,
};

#[derive(Debug, thiserror::Error)]
pub enum DialogueError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),
    #[error("Settings store unavailable: {0}")]
    StoreUnavailable(#[from] StorageError),
    #[error("Generation failed: {0}")]
    Generation(#[from] GeneratorError),
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}
