// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use bagwatch_config::model::StorageConfig;
use bagwatch_core::{
    AdapterType, BagwatchError, ChatId, HealthStatus, ListingId, NotificationStore,
    PluginAdapter, StorageAdapter, User, UserStore,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is opened on the first call to
/// [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is called.
    ///
    /// [`initialize`]: StorageAdapter::initialize
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, BagwatchError> {
        self.db.get().ok_or_else(|| BagwatchError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, BagwatchError> {
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

    async fn shutdown(&self) -> Result<(), BagwatchError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for SqliteStorage {
    async fn list_users(&self) -> Result<Vec<User>, BagwatchError> {
        queries::users::list_users(self.db()?).await
    }

    async fn get_user(&self, chat_id: ChatId) -> Result<Option<User>, BagwatchError> {
        queries::users::get_user(self.db()?, chat_id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, BagwatchError> {
        queries::users::find_user_by_email(self.db()?, email).await
    }

    async fn insert_user(&self, user: &User) -> Result<(), BagwatchError> {
        if queries::users::insert_user(self.db()?, user).await? {
            Ok(())
        } else {
            Err(BagwatchError::DuplicateRegistration {
                chat_id: user.chat_id,
            })
        }
    }

    async fn delete_user(&self, chat_id: ChatId) -> Result<bool, BagwatchError> {
        queries::users::delete_user(self.db()?, chat_id).await
    }
}

#[async_trait]
impl NotificationStore for SqliteStorage {
    async fn get_notified(&self, chat_id: ChatId) -> Result<HashSet<ListingId>, BagwatchError> {
        queries::notified::get_notified(self.db()?, chat_id).await
    }

    async fn mark_notified(
        &self,
        chat_id: ChatId,
        listing_id: &ListingId,
    ) -> Result<(), BagwatchError> {
        queries::notified::mark_notified(self.db()?, chat_id, listing_id).await
    }

    async fn unmark_notified(
        &self,
        chat_id: ChatId,
        listing_id: &ListingId,
    ) -> Result<(), BagwatchError> {
        queries::notified::unmark_notified(self.db()?, chat_id, listing_id).await
    }

    async fn count_notified(&self, chat_id: ChatId) -> Result<usize, BagwatchError> {
        queries::notified::count_notified(self.db()?, chat_id).await
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), BagwatchError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| BagwatchError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), BagwatchError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
