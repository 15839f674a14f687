// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Bagwatch.

use thiserror::Error;

use crate::types::{ChatId, ListingId};

/// The primary error type used across all Bagwatch adapter traits and core operations.
#[derive(Debug, Error)]
pub enum BagwatchError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Chat delivery errors (send failure, broken image reference, rate limiting).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Marketplace errors (network failure, rejected or expired credentials).
    ///
    /// Callers skip the affected user for the current cycle.
    #[error("marketplace fetch error: {message}")]
    Fetch {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A listing snapshot lacks fields needed to build a notification.
    #[error("invalid listing {listing_id}: {reason}")]
    InvalidListing { listing_id: ListingId, reason: String },

    /// The user did not complete the marketplace login in time.
    #[error("registration timed out after {attempts} attempts")]
    RegistrationTimeout { attempts: u32 },

    /// The chat is already bound to a registered user.
    #[error("chat {chat_id} is already registered")]
    DuplicateRegistration { chat_id: ChatId },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BagwatchError {
    /// Builds a [`BagwatchError::Fetch`] from any error source.
    pub fn fetch(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Fetch {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Builds a [`BagwatchError::Channel`] from any error source.
    pub fn channel(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Channel {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
