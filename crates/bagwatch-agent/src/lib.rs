// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Polling, notification, and chat command logic for Bagwatch.
//!
//! - [`decision`] diffs a user's notified-set against fresh favorites
//! - [`format`] renders notification messages
//! - [`dispatcher`] delivers them with a photo-to-text fallback
//! - [`driver`] runs the periodic polling cycle
//! - [`commands`] and [`registration`] handle chat input and email login

pub mod commands;
pub mod decision;
pub mod dispatcher;
pub mod driver;
pub mod format;
pub mod registration;
pub mod shutdown;

pub use commands::{Command, CommandHandler, parse_command};
pub use decision::{Decision, decide};
pub use dispatcher::{Delivery, Dispatcher};
pub use driver::{CycleReport, PollingDriver};
pub use format::{format_pickup_window, render_notification};
pub use registration::{RetryPolicy, TokioSleeper, await_credentials};
pub use shutdown::install_signal_handler;
