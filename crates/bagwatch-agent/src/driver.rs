// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The polling driver.
//!
//! Every cycle walks the registered users in chat-id order, fetches each
//! user's favorites, and reconciles the notified-set. A failure for one user
//! never affects another.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use bagwatch_config::model::PollerConfig;
use bagwatch_core::{
    BagwatchError, ChatId, ListingId, ListingSnapshot, MarketplaceAdapter, StorageAdapter, User,
};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::decision::decide;
use crate::dispatcher::{Delivery, Dispatcher};
use crate::format::render_notification;

/// Counters for one polling cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub users_polled: usize,
    pub fetch_failures: usize,
    pub storage_failures: usize,
    pub notified: usize,
    pub retracted: usize,
    pub stale_removed: usize,
    pub dispatch_failures: usize,
    /// Available listings that could not be rendered and were not announced.
    pub skipped_listings: usize,
}

impl CycleReport {
    fn absorb(&mut self, other: CycleReport) {
        self.users_polled += other.users_polled;
        self.fetch_failures += other.fetch_failures;
        self.storage_failures += other.storage_failures;
        self.notified += other.notified;
        self.retracted += other.retracted;
        self.stale_removed += other.stale_removed;
        self.dispatch_failures += other.dispatch_failures;
        self.skipped_listings += other.skipped_listings;
    }
}

/// Periodically polls every registered user's favorites.
pub struct PollingDriver {
    storage: Arc<dyn StorageAdapter>,
    marketplace: Arc<dyn MarketplaceAdapter>,
    dispatcher: Dispatcher,
    config: PollerConfig,
    /// Listings already warned about as unrenderable. Later skips log at debug.
    skip_warned: Mutex<HashSet<(ChatId, ListingId)>>,
}

impl PollingDriver {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        marketplace: Arc<dyn MarketplaceAdapter>,
        dispatcher: Dispatcher,
        config: PollerConfig,
    ) -> Self {
        Self {
            storage,
            marketplace,
            dispatcher,
            config,
            skip_warned: Mutex::new(HashSet::new()),
        }
    }

    /// Runs cycles until `cancel` fires.
    ///
    /// Waits `first_delay` before the first cycle, then ticks every
    /// `interval`. A cycle that overruns delays the next tick instead of
    /// bursting to catch up.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            interval_secs = self.config.interval_secs,
            first_delay_secs = self.config.first_delay_secs,
            "polling driver started"
        );

        tokio::select! {
            _ = tokio::time::sleep(self.config.first_delay()) => {}
            _ = cancel.cancelled() => {
                info!("polling driver cancelled before first cycle");
                return;
            }
        }

        let mut ticker = tokio::time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.run_cycle().await;
                    info!(
                        users = report.users_polled,
                        notified = report.notified,
                        retracted = report.retracted,
                        stale = report.stale_removed,
                        skipped = report.skipped_listings,
                        fetch_failures = report.fetch_failures,
                        storage_failures = report.storage_failures,
                        dispatch_failures = report.dispatch_failures,
                        "polling cycle complete"
                    );
                }
                _ = cancel.cancelled() => {
                    info!("polling driver stopping");
                    break;
                }
            }
        }
    }

    /// Polls every registered user once.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        let users = match self.storage.list_users().await {
            Ok(users) => users,
            Err(e) => {
                error!(error = %e, "failed to list users, skipping cycle");
                report.storage_failures += 1;
                return report;
            }
        };

        for user in users {
            report.absorb(self.poll_user(&user).await);
        }
        report
    }

    /// Fetches one user's favorites and applies the resulting decision.
    ///
    /// A failed fetch leaves the user's state untouched. A listing is marked
    /// notified only after its message was delivered, so a failed send is
    /// retried on the next cycle.
    pub async fn poll_user(&self, user: &User) -> CycleReport {
        let chat_id = user.chat_id;
        let mut report = CycleReport {
            users_polled: 1,
            ..CycleReport::default()
        };

        let fresh = match self.fetch(user).await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "favorites fetch failed");
                report.fetch_failures += 1;
                return report;
            }
        };

        let notified = match self.storage.get_notified(chat_id).await {
            Ok(notified) => notified,
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "failed to load notified listings");
                report.storage_failures += 1;
                return report;
            }
        };

        let decision = decide(&notified, &fresh);
        if decision.is_empty() {
            debug!(chat_id = %chat_id, listings = fresh.len(), "nothing to do");
            self.forget_skipped(chat_id, &HashSet::new());
            return report;
        }

        for id in &decision.stale {
            match self.storage.unmark_notified(chat_id, id).await {
                Ok(()) => report.stale_removed += 1,
                Err(e) => {
                    error!(chat_id = %chat_id, listing_id = %id, error = %e, "failed to clear stale listing");
                    report.storage_failures += 1;
                }
            }
        }

        for id in &decision.retracted {
            match self.storage.unmark_notified(chat_id, id).await {
                Ok(()) => {
                    debug!(chat_id = %chat_id, listing_id = %id, "listing sold out");
                    report.retracted += 1;
                }
                Err(e) => {
                    error!(chat_id = %chat_id, listing_id = %id, error = %e, "failed to clear sold-out listing");
                    report.storage_failures += 1;
                }
            }
        }

        let mut skipped = HashSet::new();
        for listing in &decision.notify {
            let msg = match render_notification(chat_id, listing) {
                Ok(msg) => msg,
                Err(e) => {
                    self.note_skipped(chat_id, &listing.id, &e);
                    skipped.insert(listing.id.clone());
                    report.skipped_listings += 1;
                    continue;
                }
            };

            match self.dispatcher.deliver(msg).await {
                Ok(delivery) => {
                    if delivery == Delivery::TextFallback {
                        debug!(chat_id = %chat_id, listing_id = %listing.id, "delivered without photo");
                    }
                    match self.storage.mark_notified(chat_id, &listing.id).await {
                        Ok(()) => report.notified += 1,
                        Err(e) => {
                            error!(chat_id = %chat_id, listing_id = %listing.id, error = %e, "failed to record notification");
                            report.storage_failures += 1;
                        }
                    }
                }
                Err(e) => {
                    error!(chat_id = %chat_id, listing_id = %listing.id, error = %e, "notification not delivered");
                    report.dispatch_failures += 1;
                }
            }
        }

        self.forget_skipped(chat_id, &skipped);
        report
    }

    /// Warns the first time a listing cannot be rendered. It is retried every
    /// cycle while in stock, so repeats go to debug.
    fn note_skipped(&self, chat_id: ChatId, id: &ListingId, err: &BagwatchError) {
        let first = self
            .skip_warned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((chat_id, id.clone()));
        if first {
            warn!(chat_id = %chat_id, listing_id = %id, error = %err, "skipping listing");
        } else {
            debug!(chat_id = %chat_id, listing_id = %id, "still skipping listing");
        }
    }

    /// Drops warn-once entries for a user's listings that were not skipped
    /// this cycle, so a listing that breaks again is warned about again.
    fn forget_skipped(&self, chat_id: ChatId, still_skipped: &HashSet<ListingId>) {
        self.skip_warned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(chat, id)| *chat != chat_id || still_skipped.contains(id));
    }

    async fn fetch(&self, user: &User) -> Result<Vec<ListingSnapshot>, BagwatchError> {
        let session = self.marketplace.open_session(&user.credentials)?;
        session.fetch_favorites().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use bagwatch_core::{NotificationStore, UserStore};
    use bagwatch_storage::MemoryStorage;
    use bagwatch_test_utils::{
        MockChannel, MockMarketplace, available, sold_out, test_user, unknown_stock,
    };
    use tracing_test::traced_test;

    struct Fixture {
        storage: Arc<MemoryStorage>,
        market: Arc<MockMarketplace>,
        channel: Arc<MockChannel>,
        driver: PollingDriver,
    }

    fn fixture() -> Fixture {
        let storage = Arc::new(MemoryStorage::new());
        let market = Arc::new(MockMarketplace::new());
        let channel = Arc::new(MockChannel::new());
        let driver = PollingDriver::new(
            storage.clone(),
            market.clone(),
            Dispatcher::new(channel.clone()),
            PollerConfig {
                interval_secs: 60,
                first_delay_secs: 1,
            },
        );
        Fixture {
            storage,
            market,
            channel,
            driver,
        }
    }

    async fn notified(storage: &MemoryStorage, chat: i64) -> HashSet<ListingId> {
        storage.get_notified(ChatId(chat)).await.unwrap()
    }

    fn ids(ids: &[&str]) -> HashSet<ListingId> {
        ids.iter().map(|id| ListingId::from(*id)).collect()
    }

    #[tokio::test]
    async fn new_availability_is_announced_and_marked() {
        let f = fixture();
        f.storage.insert_user(&test_user(1, "tok-1")).await.unwrap();
        f.market.set_favorites("tok-1", vec![available("1", 3)]);

        let report = f.driver.run_cycle().await;
        assert_eq!(report.notified, 1);
        assert_eq!(notified(&f.storage, 1).await, ids(&["1"]));

        let sent = f.channel.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, ChatId(1));
        assert!(sent[0].content.contains("Available: 3"));
    }

    #[tokio::test]
    async fn second_cycle_sends_nothing() {
        let f = fixture();
        f.storage.insert_user(&test_user(1, "tok-1")).await.unwrap();
        f.market.set_favorites("tok-1", vec![available("1", 3)]);

        f.driver.run_cycle().await;
        let report = f.driver.run_cycle().await;
        assert_eq!(report.notified, 0);
        assert_eq!(f.channel.sent_count().await, 1);
    }

    #[tokio::test]
    async fn sold_out_is_retracted_silently() {
        let f = fixture();
        f.storage.insert_user(&test_user(1, "tok-1")).await.unwrap();
        f.storage
            .mark_notified(ChatId(1), &ListingId::from("1"))
            .await
            .unwrap();
        f.market.set_favorites("tok-1", vec![sold_out("1")]);

        let report = f.driver.run_cycle().await;
        assert_eq!(report.retracted, 1);
        assert!(notified(&f.storage, 1).await.is_empty());
        assert_eq!(f.channel.sent_count().await, 0);
    }

    #[tokio::test]
    async fn vanished_listing_is_removed() {
        let f = fixture();
        f.storage.insert_user(&test_user(1, "tok-1")).await.unwrap();
        for id in ["1", "2"] {
            f.storage
                .mark_notified(ChatId(1), &ListingId::from(id))
                .await
                .unwrap();
        }
        f.market.set_favorites("tok-1", vec![available("2", 5)]);

        let report = f.driver.run_cycle().await;
        assert_eq!(report.stale_removed, 1);
        assert_eq!(report.notified, 0);
        assert_eq!(notified(&f.storage, 1).await, ids(&["2"]));
        assert_eq!(f.channel.sent_count().await, 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn fetch_failure_is_isolated_per_user() {
        let f = fixture();
        f.storage.insert_user(&test_user(1, "tok-1")).await.unwrap();
        f.storage.insert_user(&test_user(2, "tok-2")).await.unwrap();
        f.storage
            .mark_notified(ChatId(1), &ListingId::from("old"))
            .await
            .unwrap();
        f.market.fail_favorites("tok-1");
        f.market.set_favorites("tok-2", vec![available("9", 1)]);

        let report = f.driver.run_cycle().await;
        assert_eq!(report.users_polled, 2);
        assert_eq!(report.fetch_failures, 1);
        assert_eq!(report.notified, 1);

        assert_eq!(notified(&f.storage, 1).await, ids(&["old"]));
        assert_eq!(notified(&f.storage, 2).await, ids(&["9"]));
        assert!(logs_contain("favorites fetch failed"));
    }

    #[tokio::test]
    async fn undelivered_listing_is_retried_next_cycle() {
        let f = fixture();
        f.storage.insert_user(&test_user(1, "tok-1")).await.unwrap();
        f.market.set_favorites("tok-1", vec![available("1", 2)]);

        f.channel.fail_all(true);
        let report = f.driver.run_cycle().await;
        assert_eq!(report.dispatch_failures, 1);
        assert!(notified(&f.storage, 1).await.is_empty());

        f.channel.fail_all(false);
        let report = f.driver.run_cycle().await;
        assert_eq!(report.notified, 1);
        assert_eq!(notified(&f.storage, 1).await, ids(&["1"]));
    }

    #[tokio::test]
    async fn photo_failure_still_marks_after_text_fallback() {
        let f = fixture();
        f.storage.insert_user(&test_user(1, "tok-1")).await.unwrap();
        f.market.set_favorites("tok-1", vec![available("1", 2)]);
        f.channel.fail_images(true);

        let report = f.driver.run_cycle().await;
        assert_eq!(report.notified, 1);
        let sent = f.channel.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].image_url.is_none());
    }

    #[tokio::test]
    async fn listing_without_details_is_skipped() {
        let f = fixture();
        f.storage.insert_user(&test_user(1, "tok-1")).await.unwrap();
        let mut broken = available("1", 2);
        broken.details = None;
        f.market.set_favorites("tok-1", vec![broken]);

        let report = f.driver.run_cycle().await;
        assert_eq!(report.skipped_listings, 1);
        assert_eq!(report.notified, 0);
        assert!(notified(&f.storage, 1).await.is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn unrenderable_listing_warns_once() {
        let f = fixture();
        f.storage.insert_user(&test_user(1, "tok-1")).await.unwrap();
        let mut broken = available("1", 2);
        broken.details = None;
        f.market.set_favorites("tok-1", vec![broken]);

        for _ in 0..3 {
            assert_eq!(f.driver.run_cycle().await.skipped_listings, 1);
        }

        logs_assert(|lines: &[&str]| {
            let warnings = lines
                .iter()
                .filter(|line| line.contains("WARN") && line.contains("skipping listing"))
                .count();
            match warnings {
                1 => Ok(()),
                n => Err(format!("expected one warning, got {n}")),
            }
        });
        assert!(logs_contain("still skipping listing"));
    }

    #[tokio::test]
    async fn unknown_stock_neither_clears_nor_renotifies() {
        let f = fixture();
        f.storage.insert_user(&test_user(1, "tok-1")).await.unwrap();

        f.market.set_favorites("tok-1", vec![available("1", 3)]);
        assert_eq!(f.driver.run_cycle().await.notified, 1);

        f.market.set_favorites("tok-1", vec![unknown_stock("1")]);
        let report = f.driver.run_cycle().await;
        assert_eq!(report, CycleReport { users_polled: 1, ..Default::default() });
        assert_eq!(notified(&f.storage, 1).await, ids(&["1"]));

        f.market.set_favorites("tok-1", vec![available("1", 3)]);
        assert_eq!(f.driver.run_cycle().await.notified, 0);

        assert_eq!(f.channel.sent_count().await, 1);
    }

    #[tokio::test]
    async fn unknown_stock_is_not_announced() {
        let f = fixture();
        f.storage.insert_user(&test_user(1, "tok-1")).await.unwrap();
        f.market.set_favorites("tok-1", vec![unknown_stock("1")]);

        f.driver.run_cycle().await;
        assert!(notified(&f.storage, 1).await.is_empty());
        assert_eq!(f.channel.sent_count().await, 0);
    }

    #[tokio::test]
    async fn users_without_favorites_are_polled() {
        let f = fixture();
        f.storage.insert_user(&test_user(3, "tok-3")).await.unwrap();

        let report = f.driver.run_cycle().await;
        assert_eq!(report.users_polled, 1);
        assert_eq!(report, CycleReport { users_polled: 1, ..Default::default() });
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_on_cancel() {
        let f = fixture();
        f.storage.insert_user(&test_user(1, "tok-1")).await.unwrap();
        f.market.set_favorites("tok-1", vec![available("1", 1)]);

        let cancel = CancellationToken::new();
        let driver = Arc::new(f.driver);
        let handle = {
            let driver = driver.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { driver.run(cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(f.channel.sent_count().await, 1);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn cycle_summary_reports_skips_and_storage_failures() {
        let f = fixture();
        f.storage.insert_user(&test_user(1, "tok-1")).await.unwrap();
        let mut broken = available("1", 2);
        broken.details = None;
        f.market.set_favorites("tok-1", vec![broken]);

        let cancel = CancellationToken::new();
        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(2)).await;
                cancel.cancel();
            })
        };
        f.driver.run(cancel).await;
        canceller.await.unwrap();

        assert!(logs_contain("polling cycle complete"));
        assert!(logs_contain("skipped=1"));
        assert!(logs_contain("storage_failures=0"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_first_delay_skips_polling() {
        let f = fixture();
        f.storage.insert_user(&test_user(1, "tok-1")).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        f.driver.run(cancel).await;
        assert_eq!(f.market.favorites_requests(), 0);
    }
}
