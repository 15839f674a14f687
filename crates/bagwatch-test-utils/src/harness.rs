// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` wires a polling driver and a command handler to mock
//! adapters over real storage (a temp SQLite database by default).

use std::sync::Arc;
use std::time::Duration;

use bagwatch_agent::{CommandHandler, CycleReport, Dispatcher, PollingDriver, RetryPolicy};
use bagwatch_config::model::{PollerConfig, StorageBackend, StorageConfig};
use bagwatch_core::{BagwatchError, StorageAdapter};
use bagwatch_storage::{MemoryStorage, SqliteStorage};

use crate::inbound;
use crate::mock_channel::MockChannel;
use crate::mock_marketplace::MockMarketplace;
use crate::sleeper::RecordingSleeper;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    backend: StorageBackend,
    policy: RetryPolicy,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            policy: RetryPolicy {
                max_attempts: 3,
                delay: Duration::from_secs(5),
            },
        }
    }

    /// Use the in-memory backend instead of SQLite.
    pub fn with_memory_storage(mut self) -> Self {
        self.backend = StorageBackend::Memory;
        self
    }

    /// Set the login polling policy used during registration.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build the test harness, initializing storage.
    pub async fn build(self) -> Result<TestHarness, BagwatchError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| BagwatchError::Storage { source: e.into() })?;

        let storage: Arc<dyn StorageAdapter> = match self.backend {
            StorageBackend::Sqlite => {
                let db_path = temp_dir.path().join("test.db");
                Arc::new(SqliteStorage::new(StorageConfig {
                    backend: StorageBackend::Sqlite,
                    database_path: db_path.to_string_lossy().to_string(),
                    wal_mode: true,
                }))
            }
            StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        };
        storage.initialize().await?;

        let market = Arc::new(MockMarketplace::new());
        let channel = Arc::new(MockChannel::new());
        let sleeper = Arc::new(RecordingSleeper::default());

        let driver = PollingDriver::new(
            storage.clone(),
            market.clone(),
            Dispatcher::new(channel.clone()),
            PollerConfig {
                interval_secs: 60,
                first_delay_secs: 0,
            },
        );
        let handler = CommandHandler::new(
            storage.clone(),
            market.clone(),
            channel.clone(),
            sleeper.clone(),
            self.policy,
        );

        Ok(TestHarness {
            storage,
            market,
            channel,
            sleeper,
            driver,
            handler,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    pub storage: Arc<dyn StorageAdapter>,
    pub market: Arc<MockMarketplace>,
    pub channel: Arc<MockChannel>,
    pub sleeper: Arc<RecordingSleeper>,
    pub driver: PollingDriver,
    pub handler: CommandHandler,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Handles a chat message from `chat_id` and returns the replies it produced.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<Vec<String>, BagwatchError> {
        let before = self.channel.sent_count().await;
        self.handler.handle(&inbound(chat_id, text)).await?;
        Ok(self
            .channel
            .sent_messages()
            .await
            .into_iter()
            .skip(before)
            .map(|m| m.content)
            .collect())
    }

    /// Runs one polling cycle.
    pub async fn poll(&self) -> CycleReport {
        self.driver.run_cycle().await
    }
}
