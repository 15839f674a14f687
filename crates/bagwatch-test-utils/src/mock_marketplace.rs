// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock marketplace adapter for deterministic testing.
//!
//! Favorites are configured per access token, so each test user can see a
//! different snapshot. Login polls are popped from a FIFO script; once the
//! script runs dry every poll reports [`LoginPoll::Pending`].

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use bagwatch_core::BagwatchError;
use bagwatch_core::traits::adapter::PluginAdapter;
use bagwatch_core::traits::marketplace::{FavoritesSession, MarketplaceAdapter};
use bagwatch_core::types::{
    AdapterType, Credentials, HealthStatus, ListingSnapshot, LoginPoll, PendingLogin,
};

#[derive(Default)]
struct Favorites {
    by_token: HashMap<String, Vec<ListingSnapshot>>,
    failing: HashSet<String>,
    requests: usize,
}

/// A mock marketplace with scripted favorites and login results.
pub struct MockMarketplace {
    favorites: Arc<Mutex<Favorites>>,
    login_script: Mutex<VecDeque<Result<LoginPoll, BagwatchError>>>,
    fail_initiate: AtomicBool,
    login_requests: AtomicUsize,
    login_polls: AtomicUsize,
}

impl MockMarketplace {
    pub fn new() -> Self {
        Self {
            favorites: Arc::new(Mutex::new(Favorites::default())),
            login_script: Mutex::new(VecDeque::new()),
            fail_initiate: AtomicBool::new(false),
            login_requests: AtomicUsize::new(0),
            login_polls: AtomicUsize::new(0),
        }
    }

    /// Sets the favorites returned for sessions opened with `access_token`.
    pub fn set_favorites(&self, access_token: &str, listings: Vec<ListingSnapshot>) {
        let mut favorites = self.favorites.lock().unwrap();
        favorites.failing.remove(access_token);
        favorites.by_token.insert(access_token.to_string(), listings);
    }

    /// Makes every fetch with `access_token` fail.
    pub fn fail_favorites(&self, access_token: &str) {
        self.favorites
            .lock()
            .unwrap()
            .failing
            .insert(access_token.to_string());
    }

    /// Appends results for upcoming `poll_login_result` calls.
    pub fn script_login(&self, polls: Vec<Result<LoginPoll, BagwatchError>>) {
        self.login_script.lock().unwrap().extend(polls);
    }

    /// Makes `initiate_login` fail.
    pub fn fail_initiate_login(&self, fail: bool) {
        self.fail_initiate.store(fail, Ordering::SeqCst);
    }

    /// Number of `initiate_login` calls so far.
    pub fn login_requests(&self) -> usize {
        self.login_requests.load(Ordering::SeqCst)
    }

    /// Number of `poll_login_result` calls so far.
    pub fn login_polls(&self) -> usize {
        self.login_polls.load(Ordering::SeqCst)
    }

    /// Number of favorites fetches so far, failed ones included.
    pub fn favorites_requests(&self) -> usize {
        self.favorites.lock().unwrap().requests
    }
}

impl Default for MockMarketplace {
    fn default() -> Self {
        Self::new()
    }
}

struct MockSession {
    access_token: String,
    favorites: Arc<Mutex<Favorites>>,
}

#[async_trait]
impl FavoritesSession for MockSession {
    async fn fetch_favorites(&self) -> Result<Vec<ListingSnapshot>, BagwatchError> {
        let mut favorites = self.favorites.lock().unwrap();
        favorites.requests += 1;
        if favorites.failing.contains(&self.access_token) {
            return Err(BagwatchError::Fetch {
                message: "mock fetch failure".into(),
                source: None,
            });
        }
        Ok(favorites
            .by_token
            .get(&self.access_token)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl PluginAdapter for MockMarketplace {
    fn name(&self) -> &str {
        "mock-marketplace"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Marketplace
    }

    async fn health_check(&self) -> Result<HealthStatus, BagwatchError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BagwatchError> {
        Ok(())
    }
}

#[async_trait]
impl MarketplaceAdapter for MockMarketplace {
    fn open_session(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn FavoritesSession>, BagwatchError> {
        Ok(Box::new(MockSession {
            access_token: credentials.access_token.clone(),
            favorites: self.favorites.clone(),
        }))
    }

    async fn initiate_login(&self, email: &str) -> Result<PendingLogin, BagwatchError> {
        let n = self.login_requests.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_initiate.load(Ordering::SeqCst) {
            return Err(BagwatchError::Fetch {
                message: "mock login failure".into(),
                source: None,
            });
        }
        Ok(PendingLogin {
            email: email.to_string(),
            polling_id: format!("mock-poll-{n}"),
        })
    }

    async fn poll_login_result(&self, _pending: &PendingLogin) -> Result<LoginPoll, BagwatchError> {
        self.login_polls.fetch_add(1, Ordering::SeqCst);
        self.login_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(LoginPoll::Pending))
    }
}
