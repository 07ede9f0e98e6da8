use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{params, Builder, Connection, Database, Row, TransactionBehavior};
use std::sync::Arc;

use super::StorageError;
use crate::service::settings::{Model, Quantity, Settings, SettingsPatch, SettingsStore, Size, User, UserId};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    joined_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS settings (
    user_id INTEGER PRIMARY KEY REFERENCES users(user_id),
    model TEXT NOT NULL,
    size TEXT NOT NULL,
    quantity INTEGER NOT NULL
);
";

const SELECT_USER: &str = "
SELECT u.name, u.joined_at, s.model, s.size, s.quantity
FROM users u JOIN settings s ON s.user_id = u.user_id
WHERE u.user_id = ?1
LIMIT 1";

const SELECT_SETTINGS: &str = "SELECT model, size, quantity FROM settings WHERE user_id = ?1 LIMIT 1";

/// Settings store backed by libsql, either a local SQLite file or a remote Turso database.
#[derive(Clone)]
pub struct TursoStore {
    inner: Arc<Database>,
}

impl TursoStore {
    pub async fn open_local(path: &str) -> Result<Self, StorageError> {
        info!("Opening local database at {}", path);
        let db = Builder::new_local(path).build().await?;
        Self::with_database(db).await
    }

    pub async fn open_remote(url: &str, token: &str) -> Result<Self, StorageError> {
        info!("Connecting to remote database...");
        let db = Builder::new_remote(url.to_string(), token.to_string())
            .build()
            .await?;
        Self::with_database(db).await
    }

    async fn with_database(db: Database) -> Result<Self, StorageError> {
        let store = Self { inner: Arc::new(db) };
        store.migrate().await?;
        info!("Database ready");
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StorageError> {
        let conn = self.get_connection().await?;
        conn.execute_batch(SCHEMA).await?;
        Ok(())
    }

    pub async fn get_connection(&self) -> Result<Connection, StorageError> {
        let conn = self.inner.connect()?;
        Ok(conn)
    }
}

async fn load_user(conn: &Connection, user_id: UserId) -> Result<Option<User>, StorageError> {
    let mut rows = conn.query(SELECT_USER, params![user_id.0]).await?;

    let Some(row) = rows.next().await? else {
        return Ok(None);
    };

    let name = row.get::<String>(0)?;
    let joined_at = row.get::<String>(1)?;
    let joined_at = DateTime::parse_from_rfc3339(&joined_at)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| corrupt(user_id, format!("joined_at {:?}: {}", joined_at, e)))?;
    let settings = settings_from_row(user_id, &row, 2)?;

    Ok(Some(User {
        id: user_id,
        name,
        joined_at,
        settings,
    }))
}

async fn load_settings(conn: &Connection, user_id: UserId) -> Result<Option<Settings>, StorageError> {
    let mut rows = conn.query(SELECT_SETTINGS, params![user_id.0]).await?;

    match rows.next().await? {
        Some(row) => Ok(Some(settings_from_row(user_id, &row, 0)?)),
        None => Ok(None),
    }
}

/// Reads `model, size, quantity` starting at column `offset`.
fn settings_from_row(user_id: UserId, row: &Row, offset: i32) -> Result<Settings, StorageError> {
    let model = row.get::<String>(offset)?;
    let size = row.get::<String>(offset + 1)?;
    let quantity = row.get::<i64>(offset + 2)?;

    let model = model.parse::<Model>().map_err(|e| corrupt(user_id, e.to_string()))?;
    let size = size.parse::<Size>().map_err(|e| corrupt(user_id, e.to_string()))?;
    let quantity = Quantity::new(quantity).map_err(|e| corrupt(user_id, e.to_string()))?;

    if !model.supports(size) {
        return Err(corrupt(user_id, format!("size {} stored for {}", size, model)));
    }

    Ok(Settings { model, size, quantity })
}

fn corrupt(user_id: UserId, reason: String) -> StorageError {
    StorageError::Corrupt {
        user_id: user_id.0,
        reason,
    }
}

#[async_trait]
impl SettingsStore for TursoStore {
    async fn get_user(&self, user_id: UserId) -> Result<Option<User>, StorageError> {
        let conn = self.get_connection().await?;
        load_user(&conn, user_id).await
    }

    async fn create_user(&self, user_id: UserId, name: &str) -> Result<User, StorageError> {
        let conn = self.get_connection().await?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate).await?;

        let defaults = Settings::default();
        tx.execute(
            "INSERT OR IGNORE INTO users (user_id, name, joined_at) VALUES (?1, ?2, ?3)",
            params![user_id.0, name, Utc::now().to_rfc3339()],
        )
        .await?;
        tx.execute(
            "INSERT OR IGNORE INTO settings (user_id, model, size, quantity) VALUES (?1, ?2, ?3, ?4)",
            params![
                user_id.0,
                defaults.model.as_str(),
                defaults.size.as_str(),
                i64::from(defaults.quantity)
            ],
        )
        .await?;

        let user = load_user(&tx, user_id)
            .await?
            .ok_or_else(|| StorageError::Other(format!("User {} missing after insert", user_id)))?;
        tx.commit().await?;

        Ok(user)
    }

    async fn get_settings(&self, user_id: UserId) -> Result<Option<Settings>, StorageError> {
        let conn = self.get_connection().await?;
        load_settings(&conn, user_id).await
    }

    async fn update_settings(&self, user_id: UserId, patch: SettingsPatch) -> Result<Option<Settings>, StorageError> {
        let conn = self.get_connection().await?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate).await?;

        let Some(current) = load_settings(&tx, user_id).await? else {
            return Ok(None);
        };
        let next = current.apply(&patch)?;

        tx.execute(
            "UPDATE settings SET model = ?2, size = ?3, quantity = ?4 WHERE user_id = ?1",
            params![
                user_id.0,
                next.model.as_str(),
                next.size.as_str(),
                i64::from(next.quantity)
            ],
        )
        .await?;
        tx.commit().await?;

        Ok(Some(next))
    }
}
