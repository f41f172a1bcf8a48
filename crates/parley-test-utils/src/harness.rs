// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete relay stack with mock channel and
//! provider, a temp SQLite database, and an in-memory ticket cache. Provides
//! `send_message()` to drive the full orchestrator pipeline in tests.

use std::sync::Arc;
use std::time::Duration;

use parley_agent::{
    ConversationOrchestrator, DeliveryShim, OrchestratorSettings, RelayLoop, TurnReport,
};
use parley_config::model::{RepliesConfig, StorageConfig};
use parley_core::{
    CompletionProvider, HistoryStore, OutboundMessage, ParleyError, TicketCache, Turn, UserId,
};
use parley_pacing::{MemoryTicketCache, PacingGate};
use parley_storage::SqliteHistory;

use crate::mock_channel::{MockChannel, inbound_text};
use crate::mock_provider::MockProvider;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    message_cooldown: Duration,
    command_cooldown: Duration,
    history_window: usize,
    max_reply_chars: usize,
    request_timeout: Duration,
    delivery_attempts: u32,
    backoff_step: Duration,
    provider_delay: Option<Duration>,
    provider: Option<Arc<dyn CompletionProvider>>,
    cache: Option<Arc<dyn TicketCache>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            message_cooldown: Duration::from_secs(60),
            command_cooldown: Duration::from_secs(10),
            history_window: 10,
            max_reply_chars: 4000,
            request_timeout: Duration::from_secs(180),
            delivery_attempts: 3,
            backoff_step: Duration::from_millis(10),
            provider_delay: None,
            provider: None,
            cache: None,
        }
    }

    /// Set mock provider replies.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_cooldowns(mut self, message: Duration, command: Duration) -> Self {
        self.message_cooldown = message;
        self.command_cooldown = command;
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn with_max_reply_chars(mut self, max: usize) -> Self {
        self.max_reply_chars = max;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_delivery(mut self, attempts: u32, backoff_step: Duration) -> Self {
        self.delivery_attempts = attempts;
        self.backoff_step = backoff_step;
        self
    }

    /// Delay every completion call.
    pub fn with_provider_delay(mut self, delay: Duration) -> Self {
        self.provider_delay = Some(delay);
        self
    }

    /// Complete through `provider` instead of the mock provider.
    pub fn with_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Use `cache` instead of a fresh [`MemoryTicketCache`].
    pub fn with_cache(mut self, cache: Arc<dyn TicketCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, ParleyError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| ParleyError::Storage { source: e.into() })?;
        let storage_config = StorageConfig {
            database_path: temp_dir.path().join("test.db").to_string_lossy().into_owned(),
            ..StorageConfig::default()
        };
        let history = Arc::new(SqliteHistory::new(storage_config));
        history.initialize().await?;

        let mut provider = MockProvider::with_responses(self.responses);
        if let Some(delay) = self.provider_delay {
            provider = provider.with_delay(delay);
        }
        let mock_provider = Arc::new(provider);
        let mock_channel = Arc::new(MockChannel::new());

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryTicketCache::new()) as Arc<dyn TicketCache>);
        let gate =
            PacingGate::with_cooldowns(cache.clone(), self.message_cooldown, self.command_cooldown);
        let delivery = DeliveryShim::with_policy(
            mock_channel.clone(),
            self.delivery_attempts,
            self.backoff_step,
        );
        let settings = OrchestratorSettings {
            model: "test-model".to_string(),
            history_window: self.history_window,
            max_reply_chars: self.max_reply_chars,
            request_timeout: self.request_timeout,
            replies: RepliesConfig::default(),
        };
        let orchestrator = Arc::new(ConversationOrchestrator::new(
            gate,
            history.clone(),
            self.provider
                .unwrap_or_else(|| mock_provider.clone() as Arc<dyn CompletionProvider>),
            delivery,
            settings,
        ));

        Ok(TestHarness {
            mock_provider,
            mock_channel,
            history,
            cache,
            orchestrator,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// The mock completion provider.
    pub mock_provider: Arc<MockProvider>,
    /// The mock channel adapter.
    pub mock_channel: Arc<MockChannel>,
    /// SQLite history (temp DB, cleaned up on drop).
    pub history: Arc<SqliteHistory>,
    pub cache: Arc<dyn TicketCache>,
    pub orchestrator: Arc<ConversationOrchestrator>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Runs one message from `user` through the orchestrator, delivery
    /// included.
    pub async fn send_message(&self, user: &str, text: &str) -> TurnReport {
        self.orchestrator.handle_inbound(inbound_text(user, text)).await
    }

    /// Every stored turn of `user`, oldest first.
    pub async fn history_of(&self, user: &str) -> Result<Vec<Turn>, ParleyError> {
        self.history.recent_window(&UserId::from(user), usize::MAX / 2).await
    }

    /// The most recent message the channel accepted.
    pub async fn last_sent(&self) -> Option<OutboundMessage> {
        self.mock_channel.sent_messages().await.pop()
    }

    /// Relay loop over the harness channel and history.
    pub fn relay_loop(&self, drain_timeout: Duration) -> RelayLoop {
        RelayLoop::new(
            self.mock_channel.clone(),
            self.history.clone(),
            self.orchestrator.clone(),
            drain_timeout,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_agent::TurnOutcome;

    #[tokio::test]
    async fn builder_creates_working_environment() {
        let harness = TestHarness::builder().build().await.unwrap();
        assert!(harness.history_of("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn send_message_persists_both_turns() {
        let harness = TestHarness::builder()
            .with_mock_responses(vec!["stored response".to_string()])
            .build()
            .await
            .unwrap();

        let report = harness.send_message("u1", "store me").await;
        assert_eq!(report.outcome, TurnOutcome::Done);
        assert!(report.delivered);

        let turns = harness.history_of("u1").await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "store me");
        assert_eq!(turns[1].content, "stored response");
        assert_eq!(harness.last_sent().await.unwrap().content, "stored response");
    }

    #[tokio::test]
    async fn temp_db_is_unique_per_harness() {
        let h1 = TestHarness::builder().build().await.unwrap();
        let h2 = TestHarness::builder().build().await.unwrap();

        h1.send_message("u", "msg1").await;
        assert_eq!(h1.history_of("u").await.unwrap().len(), 2);
        assert!(h2.history_of("u").await.unwrap().is_empty());
    }
}
