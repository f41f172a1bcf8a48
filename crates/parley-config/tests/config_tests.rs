// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Parley configuration system.

use std::io::Write;

use parley_config::diagnostic::ConfigError;
use parley_config::model::ParleyConfig;
use parley_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};
use serial_test::serial;

/// Valid TOML with all known sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_parley_config() {
    let toml = r#"
[agent]
name = "relay-test"
log_level = "debug"
history_window = 6
max_reply_chars = 2000

[telegram]
bot_token = "123:ABC"

[completion]
api_key = "sk-123"
base_url = "http://localhost:9999"
model = "test-model"
timeout_secs = 30
temperature = 0.7

[storage]
database_path = "/tmp/test.db"
wal_mode = false

[pacing]
message_cooldown_secs = 30
command_cooldown_secs = 5

[retention]
prune_interval_secs = 120
max_age_secs = 3600

[delivery]
max_attempts = 5
backoff_step_ms = 250

[replies]
generic_error = "oops"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "relay-test");
    assert_eq!(config.agent.history_window, 6);
    assert_eq!(config.agent.max_reply_chars, 2000);
    assert_eq!(config.telegram.bot_token.as_deref(), Some("123:ABC"));
    assert_eq!(config.completion.api_key.as_deref(), Some("sk-123"));
    assert_eq!(config.completion.base_url, "http://localhost:9999");
    assert_eq!(config.completion.model, "test-model");
    assert_eq!(config.completion.temperature, Some(0.7));
    assert!(config.completion.max_tokens.is_none());
    assert!(!config.storage.wal_mode);
    assert_eq!(config.pacing.message_cooldown_secs, 30);
    assert_eq!(config.pacing.command_cooldown_secs, 5);
    assert_eq!(config.retention.max_age_secs, 3600);
    assert_eq!(config.delivery.max_attempts, 5);
    assert_eq!(config.replies.generic_error, "oops");
    // Unset reply texts keep their defaults.
    assert!(config.replies.rate_limited_message.contains("{seconds}"));
}

/// Defaults match the documented relay behavior.
#[test]
fn defaults_are_sensible() {
    let config = ParleyConfig::default();

    assert_eq!(config.agent.name, "parley");
    assert_eq!(config.agent.request_timeout_secs, 180);
    assert_eq!(config.agent.history_window, 10);
    assert_eq!(config.agent.max_reply_chars, 4000);
    assert_eq!(config.completion.timeout_secs, 120);
    assert_eq!(config.pacing.message_cooldown_secs, 60);
    assert_eq!(config.pacing.command_cooldown_secs, 10);
    assert_eq!(config.retention.prune_interval_secs, 60);
    assert_eq!(config.retention.max_age_secs, 86_400);
    assert_eq!(config.delivery.max_attempts, 3);
    assert_eq!(config.delivery.backoff_step_ms, 1000);
    assert!(config.storage.wal_mode);
    assert!(config.storage.encryption_key.is_none());
    assert!(config.telegram.bot_token.is_none());
}

/// The `debug` switch overrides the configured log level.
#[test]
fn debug_flag_forces_debug_level() {
    let config = load_config_from_str("[agent]\ndebug = true\nlog_level = \"warn\"\n").unwrap();
    assert_eq!(config.agent.effective_log_level(), "debug");
}

/// Unknown key in a section yields an UnknownKey diagnostic with a suggestion.
#[test]
fn unknown_key_gets_suggestion() {
    let toml = r#"
[pacing]
mesage_cooldown_secs = 5
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "mesage_cooldown_secs"
                && suggestion.as_deref() == Some("message_cooldown_secs")
                && valid_keys.contains("command_cooldown_secs")
        })
    });
    assert!(found, "expected UnknownKey with suggestion, got: {errors:?}");
}

/// Unknown top-level section is rejected.
#[test]
fn deny_unknown_fields_at_top_level() {
    let err = load_config_from_str("[redis]\nurl = \"x\"\n").expect_err("should reject");
    assert!(err.to_string().contains("redis"), "got: {err}");
}

/// Wrong value type is reported as InvalidType.
#[test]
fn invalid_type_is_reported() {
    let toml = r#"
[agent]
history_window = "ten"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("history_window"))),
        "got: {errors:?}"
    );
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_runs_after_parse() {
    let toml = r#"
[delivery]
max_attempts = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("zero attempts should fail");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("max_attempts"))
    ));
}

/// ConfigError renders through miette with code and help.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "bot_tken".to_string(),
        suggestion: Some("bot_token".to_string()),
        valid_keys: "bot_token".to_string(),
        span: None,
        src: None,
    };

    assert!(error.code().is_some());
    let help = error.help().expect("help text").to_string();
    assert!(help.contains("did you mean `bot_token`"), "got: {help}");

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render");
    assert!(buf.contains("bot_tken"));
}

/// An explicit config file is read and PARLEY_* variables override it.
#[test]
#[serial]
fn env_overrides_explicit_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[pacing]\nmessage_cooldown_secs = 30\n\n[telegram]\nbot_token = \"from-file\""
    )
    .unwrap();

    unsafe { std::env::set_var("PARLEY_TELEGRAM_BOT_TOKEN", "from-env") };
    let config = load_and_validate_path(file.path());
    unsafe { std::env::remove_var("PARLEY_TELEGRAM_BOT_TOKEN") };

    let config = config.expect("should load");
    assert_eq!(config.pacing.message_cooldown_secs, 30);
    assert_eq!(config.telegram.bot_token.as_deref(), Some("from-env"));
}

/// A missing explicit file falls back to defaults.
#[test]
#[serial]
fn missing_file_is_skipped() {
    let config = load_and_validate_path(std::path::Path::new("/nonexistent/parley.toml"))
        .expect("missing file should be skipped");
    assert_eq!(config.agent.name, "parley");
}

/// Defaults survive a TOML round-trip.
#[test]
fn defaults_serialize_to_toml() {
    let rendered = toml::to_string(&ParleyConfig::default()).expect("serialize");
    let parsed = load_config_from_str(&rendered).expect("reparse");
    assert_eq!(parsed.pacing.command_cooldown_secs, 10);
    assert_eq!(parsed.replies.reset_done, ParleyConfig::default().replies.reset_done);
}
