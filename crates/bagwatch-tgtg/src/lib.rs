// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Too Good To Go marketplace adapter.
//!
//! Fetches a user's favorites around the configured search point and drives
//! the email-link login flow.

pub mod client;
pub mod types;

pub use client::{TgtgClient, TgtgSession};
