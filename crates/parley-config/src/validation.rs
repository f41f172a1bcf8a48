// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express: non-empty paths,
//! positive and bounded durations, well-formed keys.

use crate::diagnostic::ConfigError;
use crate::model::ParleyConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for every `*_secs` setting (ten years).
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 3600;

/// Upper bound for `delivery.backoff_step_ms` (one hour).
pub const MAX_BACKOFF_STEP_MS: u64 = 3_600_000;

/// Upper bound for `delivery.max_attempts`.
pub const MAX_DELIVERY_ATTEMPTS: u32 = 100;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ParleyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        fail(format!(
            "agent.log_level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.agent.log_level
        ));
    }

    if config.agent.request_timeout_secs == 0 {
        fail("agent.request_timeout_secs must be greater than 0".to_string());
    }

    if config.agent.history_window == 0 {
        fail("agent.history_window must be at least 1".to_string());
    }

    if config.agent.max_reply_chars == 0 {
        fail("agent.max_reply_chars must be at least 1".to_string());
    }

    if config.completion.base_url.trim().is_empty() {
        fail("completion.base_url must not be empty".to_string());
    } else if !config.completion.base_url.starts_with("http://")
        && !config.completion.base_url.starts_with("https://")
    {
        fail(format!(
            "completion.base_url `{}` must start with http:// or https://",
            config.completion.base_url
        ));
    }

    if config.completion.model.trim().is_empty() {
        fail("completion.model must not be empty".to_string());
    }

    if config.completion.timeout_secs == 0 {
        fail("completion.timeout_secs must be greater than 0".to_string());
    }

    if let Some(t) = config.completion.temperature
        && !(0.0..=2.0).contains(&t)
    {
        fail(format!("completion.temperature must be within 0.0..=2.0, got {t}"));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if let Some(key) = &config.storage.encryption_key {
        match hex::decode(key) {
            Ok(bytes) if bytes.len() == 32 => {}
            Ok(bytes) => fail(format!(
                "storage.encryption_key must be 32 bytes (64 hex chars), got {} bytes",
                bytes.len()
            )),
            Err(e) => fail(format!("storage.encryption_key is not valid hex: {e}")),
        }
    }

    if config.pacing.message_cooldown_secs == 0 {
        fail("pacing.message_cooldown_secs must be greater than 0".to_string());
    }

    if config.pacing.command_cooldown_secs == 0 {
        fail("pacing.command_cooldown_secs must be greater than 0".to_string());
    }

    if config.pacing.sweep_interval_secs == 0 {
        fail("pacing.sweep_interval_secs must be greater than 0".to_string());
    }

    if config.retention.prune_interval_secs == 0 {
        fail("retention.prune_interval_secs must be greater than 0".to_string());
    }

    if config.retention.max_age_secs == 0 {
        fail("retention.max_age_secs must be greater than 0".to_string());
    }

    if config.delivery.max_attempts == 0 {
        fail("delivery.max_attempts must be at least 1".to_string());
    } else if config.delivery.max_attempts > MAX_DELIVERY_ATTEMPTS {
        fail(format!(
            "delivery.max_attempts must be at most {MAX_DELIVERY_ATTEMPTS}, got {}",
            config.delivery.max_attempts
        ));
    }

    if config.delivery.backoff_step_ms > MAX_BACKOFF_STEP_MS {
        fail(format!(
            "delivery.backoff_step_ms must be at most {MAX_BACKOFF_STEP_MS}, got {}",
            config.delivery.backoff_step_ms
        ));
    }

    let durations = [
        ("agent.request_timeout_secs", config.agent.request_timeout_secs),
        ("agent.drain_timeout_secs", config.agent.drain_timeout_secs),
        ("completion.timeout_secs", config.completion.timeout_secs),
        ("pacing.message_cooldown_secs", config.pacing.message_cooldown_secs),
        ("pacing.command_cooldown_secs", config.pacing.command_cooldown_secs),
        ("pacing.sweep_interval_secs", config.pacing.sweep_interval_secs),
        ("retention.prune_interval_secs", config.retention.prune_interval_secs),
        ("retention.max_age_secs", config.retention.max_age_secs),
    ];
    for (key, secs) in durations {
        if secs > MAX_DURATION_SECS {
            fail(format!("{key} must be at most {MAX_DURATION_SECS}, got {secs}"));
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

    fn messages(config: &ParleyConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        let config = ParleyConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = ParleyConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))
        ));
    }

    #[test]
    fn zero_cooldowns_fail_validation() {
        let mut config = ParleyConfig::default();
        config.pacing.message_cooldown_secs = 0;
        config.pacing.command_cooldown_secs = 0;
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 2);
        assert!(msgs.iter().any(|m| m.contains("message_cooldown_secs")));
        assert!(msgs.iter().any(|m| m.contains("command_cooldown_secs")));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = ParleyConfig::default();
        config.agent.history_window = 0;
        config.agent.max_reply_chars = 0;
        config.delivery.max_attempts = 0;
        config.completion.model = " ".to_string();
        assert_eq!(messages(&config).len(), 4);
    }

    #[test]
    fn encryption_key_must_be_32_hex_bytes() {
        let mut config = ParleyConfig::default();
        config.storage.encryption_key = Some("abcd".to_string());
        assert!(messages(&config)[0].contains("32 bytes"));

        config.storage.encryption_key = Some("zz".repeat(32));
        assert!(messages(&config)[0].contains("not valid hex"));

        config.storage.encryption_key = Some("ab".repeat(32));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn base_url_needs_scheme() {
        let mut config = ParleyConfig::default();
        config.completion.base_url = "api.example.com".to_string();
        assert!(messages(&config)[0].contains("http://"));
    }

    #[test]
    fn oversized_durations_fail_validation() {
        let mut config = ParleyConfig::default();
        config.retention.max_age_secs = 10_000_000_000_000;
        config.pacing.message_cooldown_secs = u64::MAX;
        config.agent.request_timeout_secs = MAX_DURATION_SECS + 1;
        config.delivery.backoff_step_ms = u64::MAX;
        config.delivery.max_attempts = u32::MAX;
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 5);
        assert!(msgs.iter().any(|m| m.contains("retention.max_age_secs")));
        assert!(msgs.iter().any(|m| m.contains("pacing.message_cooldown_secs")));
        assert!(msgs.iter().any(|m| m.contains("agent.request_timeout_secs")));
        assert!(msgs.iter().any(|m| m.contains("delivery.backoff_step_ms")));
        assert!(msgs.iter().any(|m| m.contains("delivery.max_attempts")));
    }

    #[test]
    fn durations_at_the_bound_validate() {
        let mut config = ParleyConfig::default();
        config.retention.max_age_secs = MAX_DURATION_SECS;
        config.delivery.backoff_step_ms = MAX_BACKOFF_STEP_MS;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = ParleyConfig::default();
        config.agent.log_level = "verbose".to_string();
        assert!(messages(&config)[0].contains("agent.log_level"));
    }
}
