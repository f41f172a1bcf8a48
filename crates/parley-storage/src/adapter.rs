// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the HistoryStore trait.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::OnceCell;
use tracing::debug;

use parley_config::model::StorageConfig;
use parley_core::{
    AdapterType, HealthStatus, HistoryStore, ParleyError, PluginAdapter, Turn, UserId,
};

use crate::cipher::ContentCipher;
use crate::database::{Database, OpenOptions};
use crate::queries;

/// SQLite-backed history store.
///
/// Wraps a [`Database`] handle and delegates to the typed query module. The
/// database is opened on the first call to [`HistoryStore::initialize`].
pub struct SqliteHistory {
    config: StorageConfig,
    cipher: Option<ContentCipher>,
    db: OnceCell<Database>,
}

impl SqliteHistory {
    /// Create a store without content encryption.
    ///
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            cipher: None,
            db: OnceCell::new(),
        }
    }

    /// Create a store from config, enabling encryption when a key is configured.
    pub fn from_config(config: StorageConfig) -> Result<Self, ParleyError> {
        let cipher = config
            .encryption_key
            .as_deref()
            .map(ContentCipher::from_hex)
            .transpose()?;
        Ok(Self {
            config,
            cipher,
            db: OnceCell::new(),
        })
    }

    /// Number of stored turns for `user`.
    pub async fn turn_count(&self, user: &UserId) -> Result<u64, ParleyError> {
        queries::turns::count_user_turns(self.db()?, user.as_str()).await
    }

    fn db(&self) -> Result<&Database, ParleyError> {
        self.db
            .get()
            .ok_or_else(|| ParleyError::storage_msg("storage not initialized -- call initialize() first"))
    }

    fn seal(&self, content: &str) -> Result<String, ParleyError> {
        match &self.cipher {
            Some(cipher) => cipher.seal(content),
            None => Ok(content.to_string()),
        }
    }

    fn unseal(&self, content: String) -> Result<String, ParleyError> {
        match &self.cipher {
            Some(cipher) => cipher.open(&content),
            None => Ok(content),
        }
    }
}

#[async_trait]
impl PluginAdapter for SqliteHistory {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::History
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SqliteHistory {
    async fn initialize(&self) -> Result<(), ParleyError> {
        let opts = OpenOptions {
            wal_mode: self.config.wal_mode,
            busy_timeout: Duration::from_millis(self.config.busy_timeout_ms),
        };
        let db = Database::open(&self.config.database_path, &opts).await?;
        self.db
            .set(db)
            .map_err(|_| ParleyError::storage_msg("storage already initialized"))?;
        debug!(
            path = %self.config.database_path,
            encrypted = self.cipher.is_some(),
            "SQLite history initialized"
        );
        Ok(())
    }

    async fn close(&self) -> Result<(), ParleyError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn append(&self, turn: &Turn) -> Result<i64, ParleyError> {
        let content = self.seal(&turn.content)?;
        queries::turns::insert_turn(
            self.db()?,
            turn.user_id.as_str(),
            &turn.role.to_string(),
            content,
            &turn.created_at,
        )
        .await
    }

    async fn recent_window(&self, user: &UserId, limit: usize) -> Result<Vec<Turn>, ParleyError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        queries::turns::recent_turns(self.db()?, user.as_str(), limit)
            .await?
            .into_iter()
            .map(|mut row| {
                row.content = self.unseal(std::mem::take(&mut row.content))?;
                row.into_turn()
            })
            .collect()
    }

    async fn delete_all(&self, user: &UserId) -> Result<u64, ParleyError> {
        queries::turns::delete_user_turns(self.db()?, user.as_str()).await
    }

    async fn prune(&self, older_than: Duration) -> Result<u64, ParleyError> {
        let age = chrono::Duration::from_std(older_than)
            .map_err(|e| ParleyError::Internal(format!("prune age out of range: {e}")))?;
        let cutoff = Utc::now()
            .checked_sub_signed(age)
            .ok_or_else(|| ParleyError::Internal(format!("prune age {older_than:?} out of range")))?;
        queries::turns::delete_turns_before(self.db()?, &cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::Role;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            ..StorageConfig::default()
        }
    }

    async fn open_store(dir: &tempfile::TempDir) -> SqliteHistory {
        let path = dir.path().join("history.db");
        let store = SqliteHistory::new(make_config(path.to_str().unwrap()));
        store.initialize().await.unwrap();
        store
    }

    #[tokio::test]
    async fn implements_plugin_adapter() {
        let store = SqliteHistory::new(make_config("/tmp/unused.db"));
        assert_eq!(store.name(), "sqlite");
        assert_eq!(store.version(), semver::Version::new(0, 1, 0));
        assert_eq!(store.adapter_type(), AdapterType::History);
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;
        assert!(store.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_before_initialize_fails() {
        let store = SqliteHistory::new(make_config("/tmp/never-opened.db"));
        assert!(store.health_check().await.is_err());
        assert!(store.append(&Turn::now("u".into(), Role::User, "x")).await.is_err());
    }

    #[tokio::test]
    async fn health_check_returns_healthy_when_initialized() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn zero_limit_window_is_empty() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;
        let user = UserId::from("u");
        store.append(&Turn::now(user.clone(), Role::User, "x")).await.unwrap();
        assert!(store.recent_window(&user, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn prune_with_unrepresentable_age_is_an_error() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir).await;
        let user = UserId::from("u");
        store.append(&Turn::now(user.clone(), Role::User, "x")).await.unwrap();

        let result = store.prune(Duration::from_secs(10_000_000_000_000)).await;
        assert!(matches!(result, Err(ParleyError::Internal(_))));
        assert!(store.prune(Duration::MAX).await.is_err());
        assert_eq!(store.turn_count(&user).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn encrypted_content_is_opaque_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sealed.db");
        let mut config = make_config(path.to_str().unwrap());
        config.encryption_key = Some("11".repeat(32));
        let store = SqliteHistory::from_config(config).unwrap();
        store.initialize().await.unwrap();

        let user = UserId::from("u");
        store
            .append(&Turn::now(user.clone(), Role::User, "top secret"))
            .await
            .unwrap();

        let window = store.recent_window(&user, 5).await.unwrap();
        assert_eq!(window[0].content, "top secret");

        let raw = queries::turns::recent_turns(store.db().unwrap(), "u", 5)
            .await
            .unwrap();
        assert_ne!(raw[0].content, "top secret");
    }
}
