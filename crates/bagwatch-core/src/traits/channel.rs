// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for chat platform integrations.

use async_trait::async_trait;

use crate::error::BagwatchError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{InboundMessage, MessageId, OutboundMessage};

/// Adapter for bidirectional chat integrations.
///
/// Channel adapters deliver notifications and replies, and surface
/// user commands as [`InboundMessage`]s.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Establishes a connection to the messaging platform.
    async fn connect(&mut self) -> Result<(), BagwatchError>;

    /// Sends a message through the channel in a single attempt.
    ///
    /// Messages carrying an `image_url` are delivered as a photo with the
    /// content as caption. Fallback handling is the caller's concern.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, BagwatchError>;

    /// Receives the next inbound message from the channel.
    async fn receive(&self) -> Result<InboundMessage, BagwatchError>;
}
