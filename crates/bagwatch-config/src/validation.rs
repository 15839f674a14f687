// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as coordinate ranges, non-zero intervals, and a parseable API URL.

use crate::diagnostic::ConfigError;
use crate::model::{BagwatchConfig, StorageBackend};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &BagwatchConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |key: &str, message: String| {
        errors.push(ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        })
    };

    let market = &config.marketplace;
    if !(-90.0..=90.0).contains(&market.latitude) {
        fail(
            "marketplace.latitude",
            format!("must be between -90 and 90, got {}", market.latitude),
        );
    }
    if !(-180.0..=180.0).contains(&market.longitude) {
        fail(
            "marketplace.longitude",
            format!("must be between -180 and 180, got {}", market.longitude),
        );
    }
    if market.radius_km == 0 {
        fail("marketplace.radius_km", "must be at least 1".to_string());
    }
    if market.page_size == 0 {
        fail("marketplace.page_size", "must be at least 1".to_string());
    }
    if market.request_timeout_secs == 0 {
        fail("marketplace.request_timeout_secs", "must be at least 1".to_string());
    }
    match url::Url::parse(&market.base_url) {
        Ok(url) if !url.path().ends_with('/') => fail(
            "marketplace.base_url",
            format!("`{}` must end with `/`", market.base_url),
        ),
        Ok(_) => {}
        Err(e) => fail(
            "marketplace.base_url",
            format!("`{}` is not a valid URL: {e}", market.base_url),
        ),
    }

    if config.storage.backend == StorageBackend::Sqlite
        && config.storage.database_path.trim().is_empty()
    {
        fail("storage.database_path", "must not be empty".to_string());
    }

    if config.poller.interval_secs == 0 {
        fail("poller.interval_secs", "must be at least 1".to_string());
    }

    if config.registration.max_attempts == 0 {
        fail("registration.max_attempts", "must be at least 1".to_string());
    }

    if let Some(token) = &config.telegram.bot_token
        && token.trim().is_empty()
    {
        fail("telegram.bot_token", "must not be empty when set".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| e.key().is_some_and(|key| key.contains(needle)) || e.to_string().contains(needle))
    }

    #[test]
    fn default_config_validates() {
        let config = BagwatchConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_for_sqlite() {
        let mut config = BagwatchConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "database_path"));
    }

    #[test]
    fn empty_database_path_is_fine_for_memory() {
        let mut config = BagwatchConfig::default();
        config.storage.backend = StorageBackend::Memory;
        config.storage.database_path = "".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn out_of_range_coordinates_fail() {
        let mut config = BagwatchConfig::default();
        config.marketplace.latitude = 91.0;
        config.marketplace.longitude = -200.0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "latitude"));
        assert!(has_error(&errors, "longitude"));
    }

    #[test]
    fn zero_interval_and_attempts_fail() {
        let mut config = BagwatchConfig::default();
        config.poller.interval_secs = 0;
        config.registration.max_attempts = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(has_error(&errors, "interval_secs"));
        assert!(has_error(&errors, "max_attempts"));
    }

    #[test]
    fn base_url_must_parse_and_end_with_slash() {
        let mut config = BagwatchConfig::default();
        config.marketplace.base_url = "not a url".to_string();
        assert!(has_error(&validate_config(&config).unwrap_err(), "base_url"));

        config.marketplace.base_url = "https://example.com/api".to_string();
        assert!(has_error(&validate_config(&config).unwrap_err(), "must end with"));
    }

    #[test]
    fn blank_bot_token_fails() {
        let mut config = BagwatchConfig::default();
        config.telegram.bot_token = Some("  ".to_string());
        assert!(has_error(&validate_config(&config).unwrap_err(), "bot_token"));
    }
}
