// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A [`Sleeper`] that records requested delays and returns immediately.
//!
//! It can also be held, which parks every sleep until [`RecordingSleeper::release`]
//! is called. That keeps a registration mid-flight for as long as a test needs.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bagwatch_core::Sleeper;
use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
    held: AtomicBool,
    released: Notify,
}

impl RecordingSleeper {
    /// Every delay requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    /// Parks subsequent sleeps until [`release`](Self::release).
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    /// Wakes parked sleeps and stops holding new ones.
    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.released.notify_waiters();
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        let released = self.released.notified();
        if self.held.load(Ordering::SeqCst) {
            released.await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn records_and_returns() {
        let sleeper = RecordingSleeper::default();
        sleeper.sleep(Duration::from_secs(5)).await;
        sleeper.sleep(Duration::from_secs(7)).await;
        assert_eq!(
            sleeper.sleeps(),
            vec![Duration::from_secs(5), Duration::from_secs(7)]
        );
    }

    #[tokio::test]
    async fn held_sleep_waits_for_release() {
        let sleeper = Arc::new(RecordingSleeper::default());
        sleeper.hold();

        let task = {
            let sleeper = sleeper.clone();
            tokio::spawn(async move { sleeper.sleep(Duration::from_secs(1)).await })
        };
        while sleeper.sleeps().is_empty() {
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        sleeper.release();
        task.await.unwrap();
    }
}
