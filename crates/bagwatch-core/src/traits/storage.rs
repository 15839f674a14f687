// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage traits: registered users and per-user notification state.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::BagwatchError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatId, ListingId, User};

/// Registered user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All registered users, ordered by chat id.
    async fn list_users(&self) -> Result<Vec<User>, BagwatchError>;

    /// The user bound to a chat, if any.
    async fn get_user(&self, chat_id: ChatId) -> Result<Option<User>, BagwatchError>;

    /// Any user registered with the given (lower-cased) email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, BagwatchError>;

    /// Inserts a user. Fails with [`BagwatchError::DuplicateRegistration`]
    /// when the chat is already registered.
    async fn insert_user(&self, user: &User) -> Result<(), BagwatchError>;

    /// Deletes a user and all of its notification state.
    /// Returns `false` when no user was registered for the chat.
    async fn delete_user(&self, chat_id: ChatId) -> Result<bool, BagwatchError>;
}

/// The notification state store: which listings have an outstanding
/// notification per user.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// The user's notified-set.
    async fn get_notified(&self, chat_id: ChatId) -> Result<HashSet<ListingId>, BagwatchError>;

    /// Records that a notification was sent. Idempotent.
    async fn mark_notified(
        &self,
        chat_id: ChatId,
        listing_id: &ListingId,
    ) -> Result<(), BagwatchError>;

    /// Clears notification state. Removing an absent entry is a no-op.
    async fn unmark_notified(
        &self,
        chat_id: ChatId,
        listing_id: &ListingId,
    ) -> Result<(), BagwatchError>;

    /// Size of the user's notified-set.
    async fn count_notified(&self, chat_id: ChatId) -> Result<usize, BagwatchError> {
        Ok(self.get_notified(chat_id).await?.len())
    }
}

/// Adapter for storage and persistence backends.
#[async_trait]
pub trait StorageAdapter: PluginAdapter + UserStore + NotificationStore {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), BagwatchError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), BagwatchError>;
}
