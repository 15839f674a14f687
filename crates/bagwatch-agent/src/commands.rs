// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat command parsing and handling.
//!
//! Supported input: `/start`, `/status`, `/remove`, and a bare email
//! address, which starts registration.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use bagwatch_core::types::{InboundMessage, OutboundMessage};
use bagwatch_core::{
    BagwatchError, ChannelAdapter, ChatId, MarketplaceAdapter, Sleeper, StorageAdapter, User,
};
use regex::Regex;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::registration::{RetryPolicy, await_credentials};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9-]+(\.[a-z0-9-]+)*\.[a-z]{2,}$")
        .expect("email pattern is valid")
});

pub const HELP_TEXT: &str = "Hi! Here are the available commands:\n\n\
    /start - Show this message\n\
    /status - Check your current status\n\
    /remove - Remove your email and stop notifications\n\n\
    To get started, send me your email!";

const NOT_AN_EMAIL: &str = "🤔 That doesn't look like an email address. Send /start for help.";
const UNKNOWN_COMMAND: &str = "🤔 Unknown command. Send /start for the list of commands.";
const NOT_REGISTERED: &str = "❌ No email registered. Send me your email to get started!";
const REMOVED: &str = "✅ Your email has been removed. You will no longer receive notifications.";
const NOTHING_TO_REMOVE: &str = "❌ No email registered.";
const ALREADY_REGISTERED: &str = "⚠️ You are already registered! Use /remove to change email.";
const IN_PROGRESS: &str = "⏳ A registration is already in progress for this chat.";
const CHECK_EMAIL: &str = "🔄 An email from Too Good To Go is on its way!\n\
    Click the link in the email to complete registration.\n\
    ⚠️ On mobile, open the link in a browser. Opening it in the Too Good To Go app will not work.";
const TIMED_OUT: &str = "⏰ Time's up!\n\
    The link was not clicked in time. Send your email again to retry.";
const LOGIN_FAILED: &str = "❌ Something went wrong during login. Please try again later.";

/// A parsed chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Status,
    Remove,
    /// Registration request with a normalized (trimmed, lower-cased) email.
    Register(String),
    UnknownCommand(String),
    NotAnEmail,
}

/// Parses a message text. Commands may carry a `@botname` suffix and
/// trailing arguments, which are ignored.
pub fn parse_command(text: &str) -> Command {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix('/') {
        let word = rest.split_whitespace().next().unwrap_or_default();
        let name = word.split('@').next().unwrap_or_default();
        return match name.to_ascii_lowercase().as_str() {
            "start" | "help" => Command::Start,
            "status" => Command::Status,
            "remove" => Command::Remove,
            other => Command::UnknownCommand(other.to_string()),
        };
    }

    let email = text.to_lowercase();
    if EMAIL_PATTERN.is_match(&email) {
        Command::Register(email)
    } else {
        Command::NotAnEmail
    }
}

/// Status reply for a registered user.
pub fn status_text(email: &str, notified: usize) -> String {
    format!(
        "📧 Registered email: {email}\n\
         🔔 You currently have {notified} favorite surprise bag(s) available"
    )
}

/// Handles chat commands against storage, the marketplace, and the channel.
#[derive(Clone)]
pub struct CommandHandler {
    storage: Arc<dyn StorageAdapter>,
    marketplace: Arc<dyn MarketplaceAdapter>,
    channel: Arc<dyn ChannelAdapter>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    registering: Arc<Mutex<HashSet<ChatId>>>,
}

impl CommandHandler {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        marketplace: Arc<dyn MarketplaceAdapter>,
        channel: Arc<dyn ChannelAdapter>,
        sleeper: Arc<dyn Sleeper>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            storage,
            marketplace,
            channel,
            sleeper,
            policy,
            registering: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Handles one inbound message to completion, including any login polling.
    ///
    /// Callers spawn this per message so registration never blocks other chats.
    pub async fn handle(&self, msg: &InboundMessage) -> Result<(), BagwatchError> {
        let chat_id = msg.chat_id;
        let command = parse_command(&msg.text);
        debug!(chat_id = %chat_id, command = ?command, "handling command");

        match command {
            Command::Start => self.reply(chat_id, HELP_TEXT).await,
            Command::Status => self.status(chat_id).await,
            Command::Remove => self.remove(chat_id).await,
            Command::Register(email) => self.register(chat_id, &email).await,
            Command::UnknownCommand(_) => self.reply(chat_id, UNKNOWN_COMMAND).await,
            Command::NotAnEmail => self.reply(chat_id, NOT_AN_EMAIL).await,
        }
    }

    async fn reply(&self, chat_id: ChatId, text: impl Into<String>) -> Result<(), BagwatchError> {
        self.channel
            .send(OutboundMessage::text(chat_id, text))
            .await
            .map(|_| ())
    }

    async fn status(&self, chat_id: ChatId) -> Result<(), BagwatchError> {
        match self.storage.get_user(chat_id).await? {
            Some(user) => {
                let count = self.storage.count_notified(chat_id).await?;
                self.reply(chat_id, status_text(&user.email, count)).await
            }
            None => self.reply(chat_id, NOT_REGISTERED).await,
        }
    }

    async fn remove(&self, chat_id: ChatId) -> Result<(), BagwatchError> {
        if self.storage.delete_user(chat_id).await? {
            info!(chat_id = %chat_id, "user removed");
            self.reply(chat_id, REMOVED).await
        } else {
            self.reply(chat_id, NOTHING_TO_REMOVE).await
        }
    }

    async fn register(&self, chat_id: ChatId, email: &str) -> Result<(), BagwatchError> {
        if self.storage.get_user(chat_id).await?.is_some() {
            return self.reply(chat_id, ALREADY_REGISTERED).await;
        }

        if let Some(existing) = self.storage.find_user_by_email(email).await? {
            let user = User {
                chat_id,
                email: email.to_string(),
                credentials: existing.credentials,
            };
            return match self.storage.insert_user(&user).await {
                Ok(()) => {
                    info!(chat_id = %chat_id, from_chat = %existing.chat_id, "credentials shared from existing registration");
                    self.reply(chat_id, format!("✅ Welcome back! Registered successfully for {email}!"))
                        .await
                }
                Err(BagwatchError::DuplicateRegistration { .. }) => {
                    self.reply(chat_id, ALREADY_REGISTERED).await
                }
                Err(e) => Err(e),
            };
        }

        if !self.registering.lock().await.insert(chat_id) {
            return self.reply(chat_id, IN_PROGRESS).await;
        }
        let result = self.login_and_register(chat_id, email).await;
        self.registering.lock().await.remove(&chat_id);
        result
    }

    async fn login_and_register(&self, chat_id: ChatId, email: &str) -> Result<(), BagwatchError> {
        self.reply(chat_id, CHECK_EMAIL).await?;

        let pending = match self.marketplace.initiate_login(email).await {
            Ok(pending) => pending,
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "failed to start login");
                return self.reply(chat_id, LOGIN_FAILED).await;
            }
        };

        let credentials = match await_credentials(
            self.marketplace.as_ref(),
            &pending,
            self.policy,
            self.sleeper.as_ref(),
        )
        .await
        {
            Ok(credentials) => credentials,
            Err(BagwatchError::RegistrationTimeout { attempts }) => {
                warn!(chat_id = %chat_id, attempts, "registration timed out");
                return self.reply(chat_id, TIMED_OUT).await;
            }
            Err(e) => {
                error!(chat_id = %chat_id, error = %e, "login polling failed");
                return self.reply(chat_id, LOGIN_FAILED).await;
            }
        };

        let user = User {
            chat_id,
            email: email.to_string(),
            credentials,
        };
        match self.storage.insert_user(&user).await {
            Ok(()) => {
                info!(chat_id = %chat_id, "user registered");
                self.reply(
                    chat_id,
                    format!(
                        "✅ Registered successfully for {email}!\n\
                         You will be notified when your favorite bags become available."
                    ),
                )
                .await
            }
            Err(BagwatchError::DuplicateRegistration { .. }) => {
                self.reply(chat_id, ALREADY_REGISTERED).await
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use bagwatch_core::types::LoginPoll;
    use bagwatch_core::{Credentials, ListingId, NotificationStore, UserStore};
    use bagwatch_storage::MemoryStorage;
    use bagwatch_test_utils::{MockChannel, MockMarketplace, RecordingSleeper, inbound};

    struct Fixture {
        storage: Arc<MemoryStorage>,
        market: Arc<MockMarketplace>,
        channel: Arc<MockChannel>,
        sleeper: Arc<RecordingSleeper>,
        handler: CommandHandler,
    }

    fn fixture() -> Fixture {
        let storage = Arc::new(MemoryStorage::new());
        let market = Arc::new(MockMarketplace::new());
        let channel = Arc::new(MockChannel::new());
        let sleeper = Arc::new(RecordingSleeper::default());
        let handler = CommandHandler::new(
            storage.clone(),
            market.clone(),
            channel.clone(),
            sleeper.clone(),
            RetryPolicy {
                max_attempts: 3,
                delay: Duration::from_secs(5),
            },
        );
        Fixture {
            storage,
            market,
            channel,
            sleeper,
            handler,
        }
    }

    fn creds(token: &str) -> Credentials {
        Credentials {
            access_token: token.into(),
            refresh_token: "refresh".into(),
            cookie: "cookie".into(),
        }
    }

    async fn last_reply(channel: &MockChannel) -> String {
        channel
            .sent_messages()
            .await
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("/start"), Command::Start);
        assert_eq!(parse_command("/status@BagwatchBot"), Command::Status);
        assert_eq!(parse_command(" /remove now "), Command::Remove);
        assert_eq!(
            parse_command("/frobnicate"),
            Command::UnknownCommand("frobnicate".into())
        );
    }

    #[test]
    fn parses_and_normalizes_email() {
        assert_eq!(
            parse_command("  Jane.Doe+bags@Example.CO.uk "),
            Command::Register("jane.doe+bags@example.co.uk".into())
        );
        assert_eq!(parse_command("hello there"), Command::NotAnEmail);
        assert_eq!(parse_command("a@b"), Command::NotAnEmail);
        assert_eq!(parse_command("two words@example.com"), Command::NotAnEmail);
    }

    #[tokio::test]
    async fn start_replies_with_help() {
        let f = fixture();
        f.handler.handle(&inbound(1, "/start")).await.unwrap();
        assert_eq!(last_reply(&f.channel).await, HELP_TEXT);
    }

    #[tokio::test]
    async fn status_for_unregistered_chat() {
        let f = fixture();
        f.handler.handle(&inbound(1, "/status")).await.unwrap();
        assert_eq!(last_reply(&f.channel).await, NOT_REGISTERED);
    }

    #[tokio::test]
    async fn status_reports_email_and_count() {
        let f = fixture();
        f.storage
            .insert_user(&User {
                chat_id: ChatId(1),
                email: "a@b.com".into(),
                credentials: creds("t"),
            })
            .await
            .unwrap();
        f.storage
            .mark_notified(ChatId(1), &ListingId::from("x"))
            .await
            .unwrap();

        f.handler.handle(&inbound(1, "/status")).await.unwrap();
        assert_eq!(last_reply(&f.channel).await, status_text("a@b.com", 1));
    }

    #[tokio::test]
    async fn remove_deletes_user_and_state() {
        let f = fixture();
        f.storage
            .insert_user(&User {
                chat_id: ChatId(1),
                email: "a@b.com".into(),
                credentials: creds("t"),
            })
            .await
            .unwrap();
        f.storage
            .mark_notified(ChatId(1), &ListingId::from("x"))
            .await
            .unwrap();

        f.handler.handle(&inbound(1, "/remove")).await.unwrap();
        assert_eq!(last_reply(&f.channel).await, REMOVED);
        assert!(f.storage.get_user(ChatId(1)).await.unwrap().is_none());
        assert_eq!(f.storage.count_notified(ChatId(1)).await.unwrap(), 0);

        f.handler.handle(&inbound(1, "/remove")).await.unwrap();
        assert_eq!(last_reply(&f.channel).await, NOTHING_TO_REMOVE);
    }

    #[tokio::test]
    async fn known_email_copies_credentials_without_login() {
        let f = fixture();
        f.storage
            .insert_user(&User {
                chat_id: ChatId(1),
                email: "shared@example.com".into(),
                credentials: creds("original"),
            })
            .await
            .unwrap();

        f.handler
            .handle(&inbound(2, "Shared@Example.com"))
            .await
            .unwrap();

        let copied = f.storage.get_user(ChatId(2)).await.unwrap().unwrap();
        assert_eq!(copied.credentials, creds("original"));
        assert_eq!(copied.email, "shared@example.com");
        assert_eq!(f.market.login_requests(), 0);
        assert!(last_reply(&f.channel).await.contains("Welcome back"));
    }

    #[tokio::test]
    async fn registered_chat_gets_warning() {
        let f = fixture();
        f.storage
            .insert_user(&User {
                chat_id: ChatId(1),
                email: "a@b.com".into(),
                credentials: creds("t"),
            })
            .await
            .unwrap();

        f.handler.handle(&inbound(1, "other@b.com")).await.unwrap();
        assert_eq!(last_reply(&f.channel).await, ALREADY_REGISTERED);
        assert_eq!(f.market.login_requests(), 0);
    }

    #[tokio::test]
    async fn new_email_runs_login_flow() {
        let f = fixture();
        f.market
            .script_login(vec![Ok(LoginPoll::Pending), Ok(LoginPoll::Ready(creds("fresh")))]);

        f.handler.handle(&inbound(5, "new@example.com")).await.unwrap();

        let user = f.storage.get_user(ChatId(5)).await.unwrap().unwrap();
        assert_eq!(user.credentials, creds("fresh"));
        assert_eq!(f.market.login_requests(), 1);
        assert_eq!(f.sleeper.sleeps().len(), 1);

        let replies = f.channel.sent_messages().await;
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].content, CHECK_EMAIL);
        assert!(replies[1].content.contains("Registered successfully for new@example.com"));
    }

    #[tokio::test]
    async fn login_timeout_prompts_retry() {
        let f = fixture();

        f.handler.handle(&inbound(5, "slow@example.com")).await.unwrap();

        assert!(f.storage.get_user(ChatId(5)).await.unwrap().is_none());
        assert_eq!(f.market.login_polls(), 3);
        assert_eq!(last_reply(&f.channel).await, TIMED_OUT);
    }

    #[tokio::test]
    async fn failed_login_start_is_reported() {
        let f = fixture();
        f.market.fail_initiate_login(true);

        f.handler.handle(&inbound(5, "x@example.com")).await.unwrap();
        assert_eq!(last_reply(&f.channel).await, LOGIN_FAILED);
        assert_eq!(f.market.login_polls(), 0);
    }

    #[tokio::test]
    async fn free_text_gets_hint() {
        let f = fixture();
        f.handler.handle(&inbound(1, "hello")).await.unwrap();
        assert_eq!(last_reply(&f.channel).await, NOT_AN_EMAIL);
    }

    #[tokio::test]
    async fn second_email_during_registration_is_refused() {
        let f = fixture();
        f.sleeper.hold();

        let first = {
            let handler = f.handler.clone();
            tokio::spawn(async move { handler.handle(&inbound(4, "first@example.com")).await })
        };
        while f.sleeper.sleeps().is_empty() {
            tokio::task::yield_now().await;
        }

        f.handler.handle(&inbound(4, "second@example.com")).await.unwrap();
        assert_eq!(last_reply(&f.channel).await, IN_PROGRESS);
        assert_eq!(f.market.login_requests(), 1);

        f.sleeper.release();
        first.await.unwrap().unwrap();
        assert_eq!(last_reply(&f.channel).await, TIMED_OUT);

        // The guard is released once the first attempt ends.
        f.handler.handle(&inbound(4, "second@example.com")).await.unwrap();
        assert_eq!(f.market.login_requests(), 2);
    }

    #[tokio::test]
    async fn registrations_in_other_chats_run_concurrently() {
        let f = fixture();
        f.sleeper.hold();

        let first = {
            let handler = f.handler.clone();
            tokio::spawn(async move { handler.handle(&inbound(4, "a@example.com")).await })
        };
        while f.sleeper.sleeps().is_empty() {
            tokio::task::yield_now().await;
        }

        let second = {
            let handler = f.handler.clone();
            tokio::spawn(async move { handler.handle(&inbound(5, "b@example.com")).await })
        };
        while f.market.login_requests() < 2 {
            tokio::task::yield_now().await;
        }

        f.sleeper.release();
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();
        let replies = f.channel.sent_messages().await;
        assert!(replies.iter().all(|m| m.content != IN_PROGRESS));
    }
}
