// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Bagwatch integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockChannel`] - Mock messaging channel with message injection and capture
//! - [`MockMarketplace`] - Mock marketplace with scripted favorites and logins
//! - [`RecordingSleeper`] - Sleeper that records delays without waiting
//! - [`TestHarness`] - Driver and command handler over temp storage

pub mod harness;
pub mod mock_channel;
pub mod mock_marketplace;
pub mod sleeper;

pub use harness::TestHarness;
pub use mock_channel::MockChannel;
pub use mock_marketplace::MockMarketplace;
pub use sleeper::RecordingSleeper;

use bagwatch_core::types::{
    Credentials, InboundMessage, ListingDetails, ListingId, ListingSnapshot, Money, PickupWindow,
    User,
};
use bagwatch_core::ChatId;
use chrono::DateTime;

/// A text message from `chat_id`.
pub fn inbound(chat_id: i64, text: &str) -> InboundMessage {
    InboundMessage {
        id: format!("test-{}", uuid::Uuid::new_v4()),
        chat_id: ChatId(chat_id),
        sender_id: chat_id.to_string(),
        text: text.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// A registered user whose credentials carry `access_token`.
pub fn test_user(chat_id: i64, access_token: &str) -> User {
    User {
        chat_id: ChatId(chat_id),
        email: format!("user{chat_id}@example.com"),
        credentials: Credentials {
            access_token: access_token.to_string(),
            refresh_token: format!("refresh-{access_token}"),
            cookie: "datadome=test".to_string(),
        },
    }
}

/// A listing with full display details and `items_available` in stock.
pub fn available(id: &str, items_available: u32) -> ListingSnapshot {
    let start = DateTime::parse_from_rfc3339("2024-01-05T18:00:00+01:00")
        .expect("fixture timestamp");
    let end = DateTime::parse_from_rfc3339("2024-01-05T19:30:00+01:00")
        .expect("fixture timestamp");
    ListingSnapshot {
        id: ListingId::from(id),
        items_available: Some(items_available),
        details: Some(ListingDetails {
            display_name: format!("Bag {id}"),
            description: "Fresh bread and pastries".to_string(),
            store_name: format!("Bakery {id}"),
            price: Money {
                minor_units: 399,
                decimals: 2,
                code: "EUR".to_string(),
            },
            value: Money {
                minor_units: 1200,
                decimals: 2,
                code: "EUR".to_string(),
            },
            pickup: PickupWindow { start, end },
            image_url: Some(format!("https://images.example/{id}.jpg")),
        }),
    }
}

/// A listing with no stock.
pub fn sold_out(id: &str) -> ListingSnapshot {
    available(id, 0)
}

/// A listing the marketplace returned without a stock count.
pub fn unknown_stock(id: &str) -> ListingSnapshot {
    ListingSnapshot {
        items_available: None,
        ..available(id, 0)
    }
}
