// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Parley relay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Parley configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfig {
    /// Process-wide behavior settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Telegram bot integration settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Chat-completion API settings.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Conversation history storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Per-user pacing cooldowns.
    #[serde(default)]
    pub pacing: PacingConfig,

    /// History retention settings.
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Reply delivery retry settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// User-visible reply texts.
    #[serde(default)]
    pub replies: RepliesConfig,
}

/// Process-wide behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name used in logs.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Forces debug logging regardless of `log_level`.
    #[serde(default)]
    pub debug: bool,

    /// Overall deadline for handling one inbound message, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Number of most recent turns sent upstream as context.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Maximum reply length delivered to the user, in UTF-16 code units
    /// (Telegram's measure).
    #[serde(default = "default_max_reply_chars")]
    pub max_reply_chars: usize,

    /// How long shutdown waits for in-flight messages, in seconds.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            debug: false,
            request_timeout_secs: default_request_timeout_secs(),
            history_window: default_history_window(),
            max_reply_chars: default_max_reply_chars(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

impl AgentConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    /// Effective log level after applying the `debug` switch.
    pub fn effective_log_level(&self) -> &str {
        if self.debug { "debug" } else { &self.log_level }
    }
}

fn default_agent_name() -> String {
    "parley".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_secs() -> u64 {
    180
}

fn default_history_window() -> usize {
    10
}

fn default_max_reply_chars() -> usize {
    4000
}

fn default_drain_timeout_secs() -> u64 {
    30
}

/// Telegram bot integration configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Required by `parley serve`.
    #[serde(default)]
    pub bot_token: Option<String>,
}

/// OpenAI-compatible chat-completion API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompletionConfig {
    /// Bearer credential for the API.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL; `/chat/completions` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-call HTTP timeout, in seconds.
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature. Omitted from requests when unset.
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Completion token cap. Omitted from requests when unset.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_completion_timeout_secs(),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl CompletionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String {
    "https://api.deepseek.com".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_completion_timeout_secs() -> u64 {
    120
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// SQLite busy timeout, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Hex-encoded 32-byte key. When set, turn content is encrypted at rest.
    #[serde(default)]
    pub encryption_key: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
            encryption_key: None,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("parley").join("parley.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("parley.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Per-user pacing configuration. Each action class has its own cooldown.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PacingConfig {
    /// Minimum gap between two admitted text messages of one user, in seconds.
    #[serde(default = "default_message_cooldown_secs")]
    pub message_cooldown_secs: u64,

    /// Minimum gap between two admitted commands of one user, in seconds.
    #[serde(default = "default_command_cooldown_secs")]
    pub command_cooldown_secs: u64,

    /// How often expired tickets are swept from the in-process cache, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            message_cooldown_secs: default_message_cooldown_secs(),
            command_cooldown_secs: default_command_cooldown_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl PacingConfig {
    pub fn message_cooldown(&self) -> Duration {
        Duration::from_secs(self.message_cooldown_secs)
    }

    pub fn command_cooldown(&self) -> Duration {
        Duration::from_secs(self.command_cooldown_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn default_message_cooldown_secs() -> u64 {
    60
}

fn default_command_cooldown_secs() -> u64 {
    10
}

fn default_sweep_interval_secs() -> u64 {
    300
}

/// History retention configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Interval between prune cycles, in seconds.
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,

    /// Turns older than this are deleted, in seconds.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            prune_interval_secs: default_prune_interval_secs(),
            max_age_secs: default_max_age_secs(),
        }
    }
}

impl RetentionConfig {
    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_secs)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

fn default_prune_interval_secs() -> u64 {
    60
}

fn default_max_age_secs() -> u64 {
    24 * 60 * 60
}

/// Reply delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Total send attempts per reply.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff unit; the pause after failed attempt `k` is `k * backoff_step_ms`.
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_step_ms: default_backoff_step_ms(),
        }
    }
}

impl DeliveryConfig {
    pub fn backoff_step(&self) -> Duration {
        Duration::from_millis(self.backoff_step_ms)
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_step_ms() -> u64 {
    1000
}

/// User-visible reply texts.
///
/// `{seconds}` in the rate-limit texts is replaced with the remaining wait.
/// Command texts are sent with HTML formatting.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct RepliesConfig {
    pub rate_limited_message: String,
    pub rate_limited_command: String,
    pub generic_error: String,
    pub empty_completion: String,
    pub delivery_failed: String,
    pub reset_done: String,
    pub reset_failed: String,
    pub start: String,
    pub help: String,
    pub about: String,
    pub policy: String,
    pub rules: String,
}

impl Default for RepliesConfig {
    fn default() -> Self {
        Self {
            rate_limited_message:
                "Please wait {seconds} seconds before sending another message.".to_string(),
            rate_limited_command:
                "Please wait {seconds} seconds before using another command.".to_string(),
            generic_error:
                "Sorry, something went wrong while processing your message. Please try again later."
                    .to_string(),
            empty_completion:
                "Sorry, I could not formulate a reply. Please try rephrasing your message."
                    .to_string(),
            delivery_failed: "Sorry, I could not deliver my reply. Please try again.".to_string(),
            reset_done: "Conversation history cleared. Let's start over!".to_string(),
            reset_failed: "Sorry, I could not reset the conversation. Please try again later."
                .to_string(),
            start: "<b>Hello!</b>\n\nSend me a message and I will answer it. \
                    Use /help to see what I can do."
                .to_string(),
            help: "<b>Commands</b>\n\
                   /start - greeting\n\
                   /help - this list\n\
                   /reset - forget the conversation so far\n\
                   /about - about this bot\n\
                   /policy - privacy policy\n\
                   /rules - usage rules"
                .to_string(),
            about: "<b>About</b>\n\nA conversational assistant that relays your messages \
                    to a language model and keeps a short history for context."
                .to_string(),
            policy: "<b>Privacy policy</b>\n\nYour recent messages are stored for up to \
                     24 hours to give the model context. Use /reset to delete them at any time."
                .to_string(),
            rules: "<b>Rules</b>\n\n1. One message per minute.\n\
                    2. No illegal or abusive content.\n\
                    3. Answers may be inaccurate; verify important information."
                .to_string(),
        }
    }
}
