// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded polling of a pending marketplace login.
//!
//! The delay between attempts goes through [`Sleeper`] so tests can run the
//! whole flow without real time passing.

use std::time::Duration;

use async_trait::async_trait;
use bagwatch_config::model::RegistrationConfig;
use bagwatch_core::types::{LoginPoll, PendingLogin};
use bagwatch_core::{BagwatchError, Credentials, MarketplaceAdapter, Sleeper};
use tracing::{debug, info, warn};

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How many times to poll, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl From<&RegistrationConfig> for RetryPolicy {
    fn from(config: &RegistrationConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: config.poll_delay(),
        }
    }
}

/// Polls `pending` until the user confirms the login link.
///
/// A poll error counts as an attempt and is retried like a pending result.
/// An expired login stops early. Both exhaustion and expiry surface as
/// [`BagwatchError::RegistrationTimeout`].
pub async fn await_credentials(
    marketplace: &dyn MarketplaceAdapter,
    pending: &PendingLogin,
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<Credentials, BagwatchError> {
    for attempt in 1..=policy.max_attempts {
        match marketplace.poll_login_result(pending).await {
            Ok(LoginPoll::Ready(credentials)) => {
                info!(attempt, "login confirmed");
                return Ok(credentials);
            }
            Ok(LoginPoll::Pending) => {
                debug!(attempt, "login still pending");
            }
            Ok(LoginPoll::Expired) => {
                warn!(attempt, "pending login expired");
                return Err(BagwatchError::RegistrationTimeout { attempts: attempt });
            }
            Err(e) => {
                warn!(attempt, error = %e, "login poll failed");
            }
        }

        if attempt < policy.max_attempts {
            sleeper.sleep(policy.delay).await;
        }
    }

    Err(BagwatchError::RegistrationTimeout {
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bagwatch_test_utils::{MockMarketplace, RecordingSleeper};

    fn pending() -> PendingLogin {
        PendingLogin {
            email: "bags@example.com".into(),
            polling_id: "poll-1".into(),
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_secs(5),
        }
    }

    fn creds() -> Credentials {
        Credentials {
            access_token: "a".into(),
            refresh_token: "r".into(),
            cookie: "c".into(),
        }
    }

    #[tokio::test]
    async fn ready_on_third_attempt() {
        let market = MockMarketplace::new();
        market.script_login(vec![
            Ok(LoginPoll::Pending),
            Err(BagwatchError::Fetch {
                message: "flaky".into(),
                source: None,
            }),
            Ok(LoginPoll::Ready(creds())),
        ]);
        let sleeper = RecordingSleeper::default();

        let got = await_credentials(&market, &pending(), policy(5), &sleeper)
            .await
            .unwrap();
        assert_eq!(got, creds());
        assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(5); 2]);
    }

    #[tokio::test]
    async fn exhaustion_is_timeout_without_trailing_sleep() {
        let market = MockMarketplace::new();
        let sleeper = RecordingSleeper::default();

        let err = await_credentials(&market, &pending(), policy(3), &sleeper)
            .await
            .unwrap_err();
        assert!(matches!(err, BagwatchError::RegistrationTimeout { attempts: 3 }));
        assert_eq!(sleeper.sleeps().len(), 2);
        assert_eq!(market.login_polls(), 3);
    }

    #[tokio::test]
    async fn expiry_stops_early() {
        let market = MockMarketplace::new();
        market.script_login(vec![Ok(LoginPoll::Pending), Ok(LoginPoll::Expired)]);
        let sleeper = RecordingSleeper::default();

        let err = await_credentials(&market, &pending(), policy(10), &sleeper)
            .await
            .unwrap_err();
        assert!(matches!(err, BagwatchError::RegistrationTimeout { attempts: 2 }));
        assert_eq!(market.login_polls(), 2);
    }

    #[test]
    fn policy_from_config() {
        let config = RegistrationConfig {
            max_attempts: 3,
            poll_delay_secs: 10,
        };
        assert_eq!(
            RetryPolicy::from(&config),
            RetryPolicy {
                max_attempts: 3,
                delay: Duration::from_secs(10)
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_sleeper_advances_paused_clock() {
        let start = tokio::time::Instant::now();
        TokioSleeper.sleep(Duration::from_secs(30)).await;
        assert!(start.elapsed() >= Duration::from_secs(30));
    }
}
