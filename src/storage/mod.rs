mod error;
mod memory;
mod turso;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use turso::TursoStore;

use std::sync::Arc;

use crate::{config::StorageConfig, service::settings::SettingsStore};

/// Opens the settings store selected by the configuration.
pub async fn open_settings_store(config: &StorageConfig, capacity: usize) -> Result<Arc<dyn SettingsStore>, StorageError> {
    let store: Arc<dyn SettingsStore> = match config {
        StorageConfig::Memory => {
            warn!("Using in-memory settings store, user settings are lost on restart");
            Arc::new(MemoryStore::new(capacity))
        }
        StorageConfig::Local { path } => {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| StorageError::Other(format!("Failed to create {}: {}", parent.display(), e)))?;
                }
            }
            Arc::new(TursoStore::open_local(path).await?)
        }
        StorageConfig::Remote { url, token } => Arc::new(TursoStore::open_remote(url, token).await?),
    };

    Ok(store)
}
