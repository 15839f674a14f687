// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Injectable delay for bounded retry loops.

use std::time::Duration;

use async_trait::async_trait;

/// Source of delays between retry attempts.
///
/// Production code uses a timer-backed implementation; tests record the
/// requested durations and return immediately.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}
