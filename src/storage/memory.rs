use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;

use super::StorageError;
use crate::service::settings::{Settings, SettingsPatch, SettingsStore, User, UserId};

/// Settings store kept entirely in process memory. Records are lost on restart.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    users: Arc<DashMap<UserId, User>>,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            users: Arc::new(DashMap::with_capacity(capacity)),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.users.len()
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get_user(&self, user_id: UserId) -> Result<Option<User>, StorageError> {
        Ok(self.users.get(&user_id).map(|user| user.value().clone()))
    }

    async fn create_user(&self, user_id: UserId, name: &str) -> Result<User, StorageError> {
        let user = match self.users.entry(user_id) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => entry.insert(User::new(user_id, name)).value().clone(),
        };

        Ok(user)
    }

    async fn get_settings(&self, user_id: UserId) -> Result<Option<Settings>, StorageError> {
        Ok(self.users.get(&user_id).map(|user| user.settings))
    }

    async fn update_settings(&self, user_id: UserId, patch: SettingsPatch) -> Result<Option<Settings>, StorageError> {
        // The shard write lock is held for the whole read-modify-write.
        let Some(mut user) = self.users.get_mut(&user_id) else {
            return Ok(None);
        };

        let settings = user.settings.apply(&patch)?;
        user.settings = settings;

        Ok(Some(settings))
    }
}
