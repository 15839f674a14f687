// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the `users` and `notified_listings` tables.

pub mod notified;
pub mod users;
