mod model;

pub use model::*;

use async_trait::async_trait;

use crate::storage::StorageError;

/// Persistence of users and their generation settings.
///
/// Every call is atomic: a concurrent reader never sees a partially applied patch.
#[async_trait]
pub trait SettingsStore: Send + Sync + 'static {
    async fn get_user(&self, user_id: UserId) -> Result<Option<User>, StorageError>;

    /// Creates the user with default settings, or returns the existing record untouched.
    async fn create_user(&self, user_id: UserId, name: &str) -> Result<User, StorageError>;

    async fn get_settings(&self, user_id: UserId) -> Result<Option<Settings>, StorageError>;

    /// Applies `patch` and returns the stored result, or `None` if the user does not exist.
    async fn update_settings(&self, user_id: UserId, patch: SettingsPatch) -> Result<Option<Settings>, StorageError>;
}
