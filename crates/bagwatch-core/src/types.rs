// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Bagwatch pipeline.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Chat identifier on the messaging platform. Also the primary key of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable marketplace identifier of a listing (surprise bag).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListingId(pub String);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListingId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Unique identifier for a delivered chat message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Marketplace,
    Storage,
}

/// Opaque marketplace credential bundle stored per user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    pub cookie: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("cookie", &"[REDACTED]")
            .finish()
    }
}

/// A registered user: one chat bound to one marketplace account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub chat_id: ChatId,
    pub email: String,
    pub credentials: Credentials,
}

/// Process-wide geographic search point for favorites lookups.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchArea {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: u32,
}

/// A monetary amount in minor units (e.g. cents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub minor_units: i64,
    pub decimals: u32,
    pub code: String,
}

impl Money {
    /// The amount in major units.
    pub fn amount(&self) -> f64 {
        self.minor_units as f64 / 10f64.powi(self.decimals as i32)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code.as_str() {
            "EUR" => write!(f, "{:.2}€", self.amount()),
            "GBP" => write!(f, "£{:.2}", self.amount()),
            "USD" => write!(f, "${:.2}", self.amount()),
            code => write!(f, "{:.2} {code}", self.amount()),
        }
    }
}

/// Pickup time window, kept in the offset reported by the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickupWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// Display fields of a listing, needed only to announce it.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingDetails {
    pub display_name: String,
    pub description: String,
    pub store_name: String,
    pub price: Money,
    pub value: Money,
    pub pickup: PickupWindow,
    pub image_url: Option<String>,
}

/// Transient per-cycle view of one favorite listing.
///
/// `details` is `None` when the marketplace returned the listing with
/// malformed display fields. Such a listing still counts as present in the
/// favorites set and can be retracted, but it is never announced.
///
/// `items_available` is `None` when the stock count was missing or
/// unreadable. The listing is still present, so its notified state is left
/// exactly as it was.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingSnapshot {
    pub id: ListingId,
    pub items_available: Option<u32>,
    pub details: Option<ListingDetails>,
}

impl ListingSnapshot {
    /// True when the listing is known to have stock.
    pub fn in_stock(&self) -> bool {
        self.items_available.is_some_and(|n| n > 0)
    }

    /// True when the listing is known to be sold out.
    pub fn sold_out(&self) -> bool {
        self.items_available == Some(0)
    }
}

/// Handle for a login started with [`MarketplaceAdapter::initiate_login`].
///
/// [`MarketplaceAdapter::initiate_login`]: crate::traits::MarketplaceAdapter::initiate_login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLogin {
    pub email: String,
    pub polling_id: String,
}

/// Result of polling a pending login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginPoll {
    /// The user clicked the link; credentials are ready.
    Ready(Credentials),
    /// The user has not clicked the link yet.
    Pending,
    /// The pending login is no longer valid.
    Expired,
}

/// Text formatting mode for outbound messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum ParseMode {
    #[default]
    Plain,
    Html,
}

/// An inbound chat message received from a channel adapter.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    pub chat_id: ChatId,
    pub sender_id: String,
    pub text: String,
    pub timestamp: String,
}

/// An outbound chat message to be sent via a channel adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub chat_id: ChatId,
    pub content: String,
    /// Image to attach. The content becomes the image caption.
    pub image_url: Option<String>,
    pub parse_mode: ParseMode,
}

impl OutboundMessage {
    /// A plain-text reply without an image.
    pub fn text(chat_id: ChatId, content: impl Into<String>) -> Self {
        Self {
            chat_id,
            content: content.into(),
            image_url: None,
            parse_mode: ParseMode::Plain,
        }
    }
}
