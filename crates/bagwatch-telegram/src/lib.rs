// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for Bagwatch.
//!
//! Implements [`ChannelAdapter`] for the Telegram Bot API via teloxide:
//! long polling for user commands, and photo or text delivery for
//! notifications.

pub mod handler;

use async_trait::async_trait;
use bagwatch_config::model::TelegramConfig;
use bagwatch_core::error::BagwatchError;
use bagwatch_core::traits::{ChannelAdapter, PluginAdapter};
use bagwatch_core::types::{
    AdapterType, HealthStatus, InboundMessage, MessageId, OutboundMessage, ParseMode,
};
use teloxide::prelude::*;
use teloxide::types::{ChatId as TgChatId, InputFile, ParseMode as TgParseMode, Recipient};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Inbound queue depth between the dispatcher and [`ChannelAdapter::receive`].
const INBOUND_BUFFER: usize = 100;

/// Telegram channel adapter implementing [`ChannelAdapter`].
pub struct TelegramChannel {
    bot: Bot,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundMessage>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramChannel {
    /// Creates a new Telegram channel adapter.
    ///
    /// Requires `config.bot_token` to be set; the binary resolves the
    /// `TELEGRAM_BOT_TOKEN` fallback before calling this.
    pub fn new(config: TelegramConfig) -> Result<Self, BagwatchError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            BagwatchError::Config(
                "telegram.bot_token is required (or set TELEGRAM_BOT_TOKEN)".into(),
            )
        })?;

        if token.is_empty() {
            return Err(BagwatchError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let bot = Bot::new(token);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);

        Ok(Self {
            bot,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

fn telegram_parse_mode(mode: ParseMode) -> Option<TgParseMode> {
    match mode {
        ParseMode::Plain => None,
        ParseMode::Html => Some(TgParseMode::Html),
    }
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, BagwatchError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), BagwatchError> {
        debug!("Telegram channel shutting down");
        if let Some(handle) = &self.polling_handle {
            handle.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    async fn connect(&mut self) -> Result<(), BagwatchError> {
        if self.polling_handle.is_some() {
            return Ok(());
        }

        let bot = self.bot.clone();
        let tx = self.inbound_tx.clone();

        info!("starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let handler = Update::filter_message().endpoint(move |msg: Message| {
                let tx = tx.clone();
                async move {
                    if handler::is_from_bot(&msg) {
                        debug!(chat_id = msg.chat.id.0, "ignoring message from bot");
                        return respond(());
                    }

                    match handler::extract_text(&msg) {
                        Some(text) => {
                            let inbound = handler::to_inbound_message(&msg, text);
                            if tx.send(inbound).await.is_err() {
                                warn!("inbound channel closed, dropping message");
                            }
                        }
                        None => {
                            debug!(msg_id = msg.id.0, "ignoring non-text message");
                        }
                    }

                    respond(())
                }
            });

            Dispatcher::builder(bot, handler)
                .default_handler(|_| async {})
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, BagwatchError> {
        let recipient = Recipient::Id(TgChatId(msg.chat_id.0));
        let parse_mode = telegram_parse_mode(msg.parse_mode);

        let sent = match &msg.image_url {
            Some(image_url) => {
                let url = url::Url::parse(image_url)
                    .map_err(|e| BagwatchError::channel("invalid image URL", e))?;
                let mut request = self
                    .bot
                    .send_photo(recipient, InputFile::url(url))
                    .caption(msg.content.as_str());
                if let Some(mode) = parse_mode {
                    request = request.parse_mode(mode);
                }
                request
                    .await
                    .map_err(|e| BagwatchError::channel(format!("failed to send photo: {e}"), e))?
            }
            None => {
                let mut request = self.bot.send_message(recipient, msg.content.as_str());
                if let Some(mode) = parse_mode {
                    request = request.parse_mode(mode);
                }
                request.await.map_err(|e| {
                    BagwatchError::channel(format!("failed to send message: {e}"), e)
                })?
            }
        };

        Ok(MessageId(sent.id.0.to_string()))
    }

    async fn receive(&self) -> Result<InboundMessage, BagwatchError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| BagwatchError::Channel {
            message: "Telegram inbound channel closed".into(),
            source: None,
        })
    }
}
