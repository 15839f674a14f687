// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `bagwatch serve` command implementation.
//!
//! Opens storage, builds the marketplace client and the Telegram channel,
//! then runs the polling driver and the inbound command loop side by side
//! until a shutdown signal arrives.

use std::sync::Arc;

use bagwatch_agent::shutdown;
use bagwatch_agent::{CommandHandler, Dispatcher, PollingDriver, RetryPolicy, TokioSleeper};
use bagwatch_config::model::{BagwatchConfig, StorageBackend, TelegramConfig};
use bagwatch_core::{BagwatchError, ChannelAdapter, MarketplaceAdapter, PluginAdapter, StorageAdapter};
use bagwatch_storage::{MemoryStorage, SqliteStorage};
use bagwatch_telegram::TelegramChannel;
use bagwatch_tgtg::TgtgClient;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Runs the `bagwatch serve` command.
pub async fn run_serve(config: BagwatchConfig) -> Result<(), BagwatchError> {
    init_tracing(&config.agent.log_level);

    info!(agent_name = config.agent.name.as_str(), "starting bagwatch serve");

    let storage = open_storage(&config).await?;

    let marketplace: Arc<dyn MarketplaceAdapter> =
        Arc::new(TgtgClient::new(&config.marketplace)?);

    let telegram_config = resolve_telegram_config(
        &config.telegram,
        std::env::var(BOT_TOKEN_ENV).ok(),
    );
    let mut telegram = TelegramChannel::new(telegram_config).inspect_err(|_| {
        eprintln!("error: Telegram bot token required. Set telegram.bot_token or {BOT_TOKEN_ENV}.");
    })?;
    telegram.connect().await?;
    let channel: Arc<dyn ChannelAdapter> = Arc::new(telegram);

    let cancel = shutdown::install_signal_handler();

    let driver = PollingDriver::new(
        storage.clone(),
        marketplace.clone(),
        Dispatcher::new(channel.clone()),
        config.poller.clone(),
    );
    let driver_cancel = cancel.clone();
    let driver_handle = tokio::spawn(async move { driver.run(driver_cancel).await });

    let handler = CommandHandler::new(
        storage.clone(),
        marketplace.clone(),
        channel.clone(),
        Arc::new(TokioSleeper),
        RetryPolicy::from(&config.registration),
    );
    run_inbound_loop(channel.as_ref(), handler, cancel.clone()).await;

    if let Err(e) = driver_handle.await {
        warn!(error = %e, "polling driver task ended abnormally");
    }

    if let Err(e) = channel.shutdown().await {
        warn!(error = %e, "channel shutdown failed");
    }
    storage.close().await?;
    info!("bagwatch stopped");
    Ok(())
}

/// Opens the configured storage backend.
async fn open_storage(config: &BagwatchConfig) -> Result<Arc<dyn StorageAdapter>, BagwatchError> {
    let storage: Arc<dyn StorageAdapter> = match config.storage.backend {
        StorageBackend::Sqlite => Arc::new(SqliteStorage::new(config.storage.clone())),
        StorageBackend::Memory => {
            warn!("in-memory storage selected, registrations are lost on restart");
            Arc::new(MemoryStorage::new())
        }
    };
    storage.initialize().await?;
    info!(backend = storage.name(), "storage ready");
    Ok(storage)
}

/// Fills in the bot token from the environment when the config has none.
fn resolve_telegram_config(config: &TelegramConfig, env_token: Option<String>) -> TelegramConfig {
    let bot_token = config
        .bot_token
        .clone()
        .filter(|token| !token.is_empty())
        .or(env_token);
    TelegramConfig { bot_token }
}

/// Receives chat messages and hands each one to the command handler in its own
/// task, so a registration waiting on a login link never blocks other chats.
async fn run_inbound_loop(
    channel: &dyn ChannelAdapter,
    handler: CommandHandler,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            received = channel.receive() => {
                match received {
                    Ok(msg) => {
                        let handler = handler.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handler.handle(&msg).await {
                                error!(chat_id = %msg.chat_id, error = %e, "command handling failed");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "inbound channel closed");
                        cancel.cancel();
                        break;
                    }
                }
            }
            _ = cancel.cancelled() => {
                info!("inbound loop stopping");
                break;
            }
        }
    }
}

/// Initializes the tracing subscriber. `RUST_LOG` takes precedence over the
/// configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bagwatch={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
