// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parley conversational relay.
//!
//! This crate provides the trait definitions, error type, and common types
//! shared by every other crate in the workspace. Adapters (Telegram channel,
//! completion client, SQLite history, ticket cache) implement traits defined
//! here so the orchestrator can be tested against mocks.

pub mod error;
pub mod traits;
pub mod types;

pub use error::ParleyError;
pub use types::{
    ActionClass, AdapterType, ChatMessage, HealthStatus, InboundMessage, MessageId,
    OutboundMessage, Role, Turn, UserId,
};

pub use traits::{ChannelAdapter, CompletionProvider, HistoryStore, PluginAdapter, TicketCache};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        let variants = [
            AdapterType::Channel,
            AdapterType::Provider,
            AdapterType::History,
        ];

        for variant in &variants {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn health_status_variants() {
        let healthy = HealthStatus::Healthy;
        let unhealthy = HealthStatus::Unhealthy("down".into());

        assert_eq!(healthy, HealthStatus::Healthy);
        assert_ne!(unhealthy, healthy);
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_channel_adapter<T: ChannelAdapter>() {}
        fn _assert_completion_provider<T: CompletionProvider>() {}
        fn _assert_history_store<T: HistoryStore>() {}
        fn _assert_ticket_cache<T: TicketCache>() {}
    }
}
