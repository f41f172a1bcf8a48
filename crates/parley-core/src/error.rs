// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parley relay.

use thiserror::Error;

/// The primary error type used across all Parley adapter traits and core operations.
#[derive(Debug, Error)]
pub enum ParleyError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Rate-limit ticket cache errors (unreachable backend, malformed reply).
    #[error("cache error: {message}")]
    Cache {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel adapter errors (connection failure, message format, delivery failure).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Completion provider transport or decoding errors.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The completion API answered with a non-success status.
    #[error("api returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The completion API answered successfully but returned no choices.
    #[error("no choices in response")]
    NoChoices,

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParleyError {
    /// Builds a [`ParleyError::Storage`] from a plain message.
    pub fn storage_msg(message: impl Into<String>) -> Self {
        let message: String = message.into();
        ParleyError::Storage {
            source: message.into(),
        }
    }

    /// Builds a [`ParleyError::Channel`] without an underlying source.
    pub fn channel_msg(message: impl Into<String>) -> Self {
        ParleyError::Channel {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a [`ParleyError::Cache`] without an underlying source.
    pub fn cache_msg(message: impl Into<String>) -> Self {
        ParleyError::Cache {
            message: message.into(),
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_renders_status_and_body() {
        let err = ParleyError::Upstream {
            status: 429,
            body: "slow down".into(),
        };
        assert_eq!(err.to_string(), "api returned status 429: slow down");
    }

    #[test]
    fn storage_msg_keeps_message() {
        let err = ParleyError::storage_msg("disk full");
        assert_eq!(err.to_string(), "storage error: disk full");
    }

    #[test]
    fn no_choices_renders() {
        assert_eq!(ParleyError::NoChoices.to_string(), "no choices in response");
    }
}
