// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `bagwatch status` command implementation.
//!
//! Reads the database directly, so it works whether or not `serve` is
//! running. Emails are masked in both output modes.

use std::io::IsTerminal;

use bagwatch_config::model::{BagwatchConfig, StorageBackend};
use bagwatch_core::{BagwatchError, StorageAdapter};
use bagwatch_storage::SqliteStorage;
use serde::Serialize;

/// One registered user in the status report.
#[derive(Debug, Serialize)]
pub struct UserStatus {
    pub chat_id: i64,
    pub email: String,
    pub notified_listings: usize,
}

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub database_path: String,
    pub users: Vec<UserStatus>,
}

/// Masks the local part of an email, keeping its first character.
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first: String = local.chars().take(1).collect();
            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}

/// Collects the report from any storage backend.
pub async fn collect_status(
    storage: &dyn StorageAdapter,
    database_path: &str,
) -> Result<StatusResponse, BagwatchError> {
    let mut users = Vec::new();
    for user in storage.list_users().await? {
        users.push(UserStatus {
            chat_id: user.chat_id.0,
            email: mask_email(&user.email),
            notified_listings: storage.count_notified(user.chat_id).await?,
        });
    }
    Ok(StatusResponse {
        database_path: database_path.to_string(),
        users,
    })
}

/// Run the `bagwatch status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting.
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(config: &BagwatchConfig, json: bool, plain: bool) -> Result<(), BagwatchError> {
    if config.storage.backend == StorageBackend::Memory {
        println!("bagwatch status: in-memory storage has no state outside a running serve process");
        return Ok(());
    }

    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let report = collect_status(&storage, &config.storage.database_path).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_status(&report, use_color);
    }
    Ok(())
}

fn print_status(report: &StatusResponse, use_color: bool) {
    println!();
    println!("  bagwatch status");
    println!("  {}", "-".repeat(35));
    println!("    Database: {}", report.database_path);

    if report.users.is_empty() {
        println!("    Users:    none registered");
        println!();
        return;
    }

    println!("    Users:    {}", report.users.len());
    println!();
    for user in &report.users {
        let count = user.notified_listings.to_string();
        if use_color {
            use colored::Colorize;
            let count = if user.notified_listings > 0 {
                count.green()
            } else {
                count.dimmed()
            };
            println!("    {:>14}  {}  {} available", user.chat_id, user.email.bold(), count);
        } else {
            println!("    {:>14}  {}  {} available", user.chat_id, user.email, count);
        }
    }
    println!();
}
