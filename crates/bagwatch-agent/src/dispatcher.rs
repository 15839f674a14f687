// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification delivery with photo-to-text fallback.

use std::sync::Arc;

use bagwatch_core::types::OutboundMessage;
use bagwatch_core::{BagwatchError, ChannelAdapter};
use tracing::{debug, warn};

/// How a notification reached the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Photo with caption, or text when there was no image to begin with.
    Primary,
    /// The photo failed and the text-only fallback went through.
    TextFallback,
}

/// Delivers rendered notifications through a channel adapter.
#[derive(Clone)]
pub struct Dispatcher {
    channel: Arc<dyn ChannelAdapter>,
}

impl Dispatcher {
    pub fn new(channel: Arc<dyn ChannelAdapter>) -> Self {
        Self { channel }
    }

    /// Sends `msg`. If it carries an image and the photo send fails, the same
    /// content is retried once as a text message.
    ///
    /// Returns the fallback error when both attempts fail.
    pub async fn deliver(&self, msg: OutboundMessage) -> Result<Delivery, BagwatchError> {
        if msg.image_url.is_none() {
            self.channel.send(msg).await?;
            return Ok(Delivery::Primary);
        }

        let text_only = OutboundMessage {
            image_url: None,
            ..msg.clone()
        };
        match self.channel.send(msg).await {
            Ok(_) => Ok(Delivery::Primary),
            Err(e) => {
                warn!(chat_id = %text_only.chat_id, error = %e, "photo delivery failed, falling back to text");
                self.channel.send(text_only).await?;
                debug!("text fallback delivered");
                Ok(Delivery::TextFallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bagwatch_core::ChatId;
    use bagwatch_core::types::ParseMode;
    use bagwatch_test_utils::MockChannel;

    fn photo_message() -> OutboundMessage {
        OutboundMessage {
            chat_id: ChatId(1),
            content: "<b>bag</b>".into(),
            image_url: Some("https://images.example/bag.jpg".into()),
            parse_mode: ParseMode::Html,
        }
    }

    #[tokio::test]
    async fn photo_delivered_directly() {
        let channel = Arc::new(MockChannel::new());
        let dispatcher = Dispatcher::new(channel.clone());

        let delivery = dispatcher.deliver(photo_message()).await.unwrap();
        assert_eq!(delivery, Delivery::Primary);

        let sent = channel.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].image_url.is_some());
    }

    #[tokio::test]
    async fn broken_photo_falls_back_to_text() {
        let channel = Arc::new(MockChannel::new());
        channel.fail_images(true);
        let dispatcher = Dispatcher::new(channel.clone());

        let delivery = dispatcher.deliver(photo_message()).await.unwrap();
        assert_eq!(delivery, Delivery::TextFallback);

        let sent = channel.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].image_url.is_none());
        assert_eq!(sent[0].content, "<b>bag</b>");
        assert_eq!(sent[0].parse_mode, ParseMode::Html);
    }

    #[tokio::test]
    async fn both_attempts_failing_is_an_error() {
        let channel = Arc::new(MockChannel::new());
        channel.fail_all(true);
        let dispatcher = Dispatcher::new(channel.clone());

        let err = dispatcher.deliver(photo_message()).await.unwrap_err();
        assert!(matches!(err, BagwatchError::Channel { .. }));
        assert_eq!(channel.sent_count().await, 0);
    }

    #[tokio::test]
    async fn text_message_skips_fallback() {
        let channel = Arc::new(MockChannel::new());
        let dispatcher = Dispatcher::new(channel.clone());

        let msg = OutboundMessage::text(ChatId(2), "hello");
        assert_eq!(dispatcher.deliver(msg).await.unwrap(), Delivery::Primary);
        assert_eq!(channel.sent_count().await, 1);
    }
}
