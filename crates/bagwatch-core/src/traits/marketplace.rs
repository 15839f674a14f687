// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Marketplace adapter traits: favorites polling and email login.

use async_trait::async_trait;

use crate::error::BagwatchError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Credentials, ListingSnapshot, LoginPoll, PendingLogin};

/// A per-user marketplace session built from stored credentials.
///
/// Sessions are cheap and constructed on demand for each poll; nothing
/// about a user is cached process-wide.
#[async_trait]
pub trait FavoritesSession: Send + Sync {
    /// Fetches the user's favorite listings around the configured search point.
    ///
    /// Fails with [`BagwatchError::Fetch`] on network or auth failure.
    async fn fetch_favorites(&self) -> Result<Vec<ListingSnapshot>, BagwatchError>;
}

/// Adapter for the surprise-bag marketplace API.
#[async_trait]
pub trait MarketplaceAdapter: PluginAdapter {
    /// Opens a session for one user.
    fn open_session(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn FavoritesSession>, BagwatchError>;

    /// Starts an email login. The marketplace mails the user a confirmation link.
    async fn initiate_login(&self, email: &str) -> Result<PendingLogin, BagwatchError>;

    /// Checks whether a pending login has been confirmed.
    async fn poll_login_result(&self, pending: &PendingLogin) -> Result<LoginPoll, BagwatchError>;
}
