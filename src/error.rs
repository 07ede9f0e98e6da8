use shuttle_runtime::Error as ShuttleError;
use teloxide::{ApiError, RequestError};

use crate::{config::ConfigError, service::ServiceError, storage::StorageError};

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Other(anyhow::Error),
}

impl From<BotError> for ShuttleError {
    fn from(error: BotError) -> Self {
        ShuttleError::Custom(anyhow::anyhow!(error))
    }
}

impl From<BotError> for RequestError {
    fn from(error: BotError) -> Self {
        RequestError::Api(ApiError::Unknown(error.to_string()))
    }
}

impl From<anyhow::Error> for BotError {
    fn from(error: anyhow::Error) -> Self {
        BotError::Other(error)
    }
}

pub type HandlerResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub type BotResult<T> = Result<T, BotError>;
