// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Bagwatch.
//!
//! This crate provides the trait definitions, error type, and domain types
//! shared by the storage, marketplace, chat, and polling crates.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::BagwatchError;
pub use types::{
    AdapterType, ChatId, Credentials, HealthStatus, ListingDetails, ListingId, ListingSnapshot,
    MessageId, Money, User,
};

pub use traits::{
    ChannelAdapter, FavoritesSession, MarketplaceAdapter, NotificationStore, PluginAdapter,
    Sleeper, StorageAdapter, UserStore,
};
