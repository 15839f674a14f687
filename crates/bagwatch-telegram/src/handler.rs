// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound message filtering and conversion.
//!
//! Only text messages matter: commands and email addresses. Everything
//! else is dropped here.

use bagwatch_core::ChatId;
use bagwatch_core::types::InboundMessage;
use teloxide::prelude::*;

/// Returns the trimmed text of a message, or `None` for non-text or blank messages.
pub fn extract_text(msg: &Message) -> Option<String> {
    let text = msg.text()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Returns `true` if the message was sent by another bot.
pub fn is_from_bot(msg: &Message) -> bool {
    msg.from.as_ref().is_some_and(|u| u.is_bot)
}

/// Converts a Telegram message into a channel-agnostic [`InboundMessage`].
pub fn to_inbound_message(msg: &Message, text: String) -> InboundMessage {
    let sender_id = msg
        .from
        .as_ref()
        .map(|u| u.id.0.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    InboundMessage {
        id: msg.id.0.to_string(),
        chat_id: ChatId(msg.chat.id.0),
        sender_id,
        text,
        timestamp: msg.date.to_rfc3339(),
    }
}
