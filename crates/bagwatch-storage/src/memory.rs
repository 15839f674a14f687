// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Volatile in-memory storage backend.
//!
//! State is lost on restart, so every still-available favorite is announced
//! again after a reboot. Selected with `storage.backend = "memory"` and used
//! by the test harness.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use bagwatch_core::{
    AdapterType, BagwatchError, ChatId, HealthStatus, ListingId, NotificationStore,
    PluginAdapter, StorageAdapter, User, UserStore,
};

#[derive(Default)]
struct State {
    /// Ordered by chat id, matching the SQLite `list_users` order.
    users: BTreeMap<ChatId, User>,
    /// Registration order, for `find_user_by_email`.
    order: Vec<ChatId>,
    notified: HashMap<ChatId, HashSet<ListingId>>,
}

/// In-memory [`StorageAdapter`].
#[derive(Default)]
pub struct MemoryStorage {
    state: RwLock<State>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PluginAdapter for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, BagwatchError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BagwatchError> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStorage {
    async fn list_users(&self) -> Result<Vec<User>, BagwatchError> {
        Ok(self.state.read().await.users.values().cloned().collect())
    }

    async fn get_user(&self, chat_id: ChatId) -> Result<Option<User>, BagwatchError> {
        Ok(self.state.read().await.users.get(&chat_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, BagwatchError> {
        let state = self.state.read().await;
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.users.get(id))
            .find(|u| u.email == email)
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), BagwatchError> {
        let mut state = self.state.write().await;
        if state.users.contains_key(&user.chat_id) {
            return Err(BagwatchError::DuplicateRegistration {
                chat_id: user.chat_id,
            });
        }
        state.users.insert(user.chat_id, user.clone());
        state.order.push(user.chat_id);
        Ok(())
    }

    async fn delete_user(&self, chat_id: ChatId) -> Result<bool, BagwatchError> {
        let mut state = self.state.write().await;
        state.notified.remove(&chat_id);
        state.order.retain(|id| *id != chat_id);
        Ok(state.users.remove(&chat_id).is_some())
    }
}

#[async_trait]
impl NotificationStore for MemoryStorage {
    async fn get_notified(&self, chat_id: ChatId) -> Result<HashSet<ListingId>, BagwatchError> {
        Ok(self
            .state
            .read()
            .await
            .notified
            .get(&chat_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn mark_notified(
        &self,
        chat_id: ChatId,
        listing_id: &ListingId,
    ) -> Result<(), BagwatchError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&chat_id) {
            return Err(BagwatchError::Storage {
                source: format!("no registered user for chat {chat_id}").into(),
            });
        }
        state
            .notified
            .entry(chat_id)
            .or_default()
            .insert(listing_id.clone());
        Ok(())
    }

    async fn unmark_notified(
        &self,
        chat_id: ChatId,
        listing_id: &ListingId,
    ) -> Result<(), BagwatchError> {
        if let Some(set) = self.state.write().await.notified.get_mut(&chat_id) {
            set.remove(listing_id);
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn initialize(&self) -> Result<(), BagwatchError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), BagwatchError> {
        Ok(())
    }
}
