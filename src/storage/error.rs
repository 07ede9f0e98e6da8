use libsql::errors::Error as TursoError;

use crate::service::settings::SettingsError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Turso error: {0}")]
    Turso(#[from] TursoError),
    #[error("Corrupt row for user {user_id}: {reason}")]
    Corrupt { user_id: i64, reason: String },
    #[error("Invalid settings: {0}")]
    InvalidSettings(#[from] SettingsError),
    #[error("Other error: {0}")]
    Other(String),
}
