// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./bagwatch.toml` > `~/.config/bagwatch/bagwatch.toml` > `/etc/bagwatch/bagwatch.toml`
//! with environment variable overrides via `BAGWATCH_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::BagwatchConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/bagwatch/bagwatch.toml";

/// Config file in the working directory.
pub const LOCAL_CONFIG_PATH: &str = "bagwatch.toml";

/// Path of the per-user XDG config file, if a config dir is known.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bagwatch/bagwatch.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/bagwatch/bagwatch.toml` (system-wide)
/// 3. `~/.config/bagwatch/bagwatch.toml` (user XDG config)
/// 4. `./bagwatch.toml` (local directory)
/// 5. `BAGWATCH_*` environment variables
pub fn load_config() -> Result<BagwatchConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<BagwatchConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BagwatchConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BagwatchConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BagwatchConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(BagwatchConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")`: key names contain
/// underscores, so `BAGWATCH_TELEGRAM_BOT_TOKEN` must map to
/// `telegram.bot_token`, not `telegram.bot.token`.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("BAGWATCH_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("telegram_", "telegram.", 1)
            .replacen("marketplace_", "marketplace.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("poller_", "poller.", 1)
            .replacen("registration_", "registration.", 1);
        mapped.into()
    })
}
