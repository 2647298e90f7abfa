// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths, positive intervals, and consistent limits.

use crate::diagnostic::ConfigError;
use crate::model::ClaimlineConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ClaimlineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.log.level.to_ascii_lowercase().as_str()) {
        fail(format!(
            "log.level `{}` is not one of {}",
            config.log.level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.queue.lock_timeout_ms == 0 {
        fail("queue.lock_timeout_ms must be greater than 0".to_string());
    }

    if config.queue.stale_head_after_secs == 0 {
        fail("queue.stale_head_after_secs must be greater than 0".to_string());
    }

    if config.queue.pending_expiry_secs == Some(0) {
        fail("queue.pending_expiry_secs must be greater than 0 when set".to_string());
    }

    if config.queue.default_claims_limit == 0 {
        fail("queue.default_claims_limit must be greater than 0".to_string());
    }

    if config.queue.default_claims_limit > config.queue.max_claims_limit {
        fail(format!(
            "queue.default_claims_limit ({}) must not exceed queue.max_claims_limit ({})",
            config.queue.default_claims_limit, config.queue.max_claims_limit
        ));
    }

    if config.queue.notification_buffer == 0 {
        fail("queue.notification_buffer must be greater than 0".to_string());
    }

    if config.sweep.enabled && config.sweep.interval_secs == 0 {
        fail("sweep.interval_secs must be greater than 0".to_string());
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
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

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = ClaimlineConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = ClaimlineConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database_path"));
    }

    #[test]
    fn default_limit_above_max_fails_validation() {
        let mut config = ClaimlineConfig::default();
        config.queue.default_claims_limit = 100;
        config.queue.max_claims_limit = 10;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "default_claims_limit"));
    }

    #[test]
    fn zero_expiry_fails_but_unset_expiry_passes() {
        let mut config = ClaimlineConfig::default();
        config.queue.pending_expiry_secs = Some(0);
        assert!(has_message(
            &validate_config(&config).unwrap_err(),
            "pending_expiry_secs"
        ));

        config.queue.pending_expiry_secs = None;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn disabled_sweep_ignores_interval() {
        let mut config = ClaimlineConfig::default();
        config.sweep.enabled = false;
        config.sweep.interval_secs = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut config = ClaimlineConfig::default();
        config.log.level = "loud".to_string();
        config.queue.lock_timeout_ms = 0;
        config.gateway.host = "not a host!".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3, "got: {errors:?}");
    }
}
