// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation orchestration for the Parley relay.
//!
//! The [`RelayLoop`] is the central coordinator that:
//! - Receives messages from a channel adapter
//! - Hands each message to the [`ConversationOrchestrator`] on its own task
//! - Drains in-flight messages and closes storage on shutdown

pub mod commands;
pub mod delivery;
pub mod orchestrator;
pub mod pruner;
pub mod shutdown;

use std::sync::Arc;
use std::time::Duration;

use parley_core::{ChannelAdapter, HistoryStore, ParleyError};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

pub use commands::{Command, CommandAction, CommandTable, parse_command};
pub use delivery::DeliveryShim;
pub use orchestrator::{
    ConversationOrchestrator, FailureKind, OrchestratorSettings, Reply, TurnOutcome, TurnReport,
    TurnState,
};
pub use pruner::PruneTask;

/// Receives inbound messages and processes each one concurrently.
pub struct RelayLoop {
    channel: Arc<dyn ChannelAdapter>,
    history: Arc<dyn HistoryStore>,
    orchestrator: Arc<ConversationOrchestrator>,
    drain_timeout: Duration,
    tracker: TaskTracker,
}

impl RelayLoop {
    pub fn new(
        channel: Arc<dyn ChannelAdapter>,
        history: Arc<dyn HistoryStore>,
        orchestrator: Arc<ConversationOrchestrator>,
        drain_timeout: Duration,
    ) -> Self {
        info!(channel = channel.name(), history = history.name(), "relay loop initialized");
        Self {
            channel,
            history,
            orchestrator,
            drain_timeout,
            tracker: TaskTracker::new(),
        }
    }

    /// Runs until `cancel` fires or the channel stops delivering messages.
    ///
    /// On exit, waits up to the drain timeout for in-flight messages and then
    /// closes the history store.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), ParleyError> {
        info!("relay loop running");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping relay loop");
                    break;
                }
                msg = self.channel.receive() => {
                    match msg {
                        Ok(inbound) => {
                            debug!(user_id = %inbound.sender, message_id = %inbound.id, "inbound message");
                            let orchestrator = self.orchestrator.clone();
                            self.tracker.spawn(async move {
                                orchestrator.handle_inbound(inbound).await;
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "channel closed, stopping relay loop");
                            break;
                        }
                    }
                }
            }
        }

        shutdown::drain_tasks(&self.tracker, self.drain_timeout).await;
        self.history.close().await?;

        info!("relay loop stopped");
        Ok(())
    }

    /// Number of messages currently being processed.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }
}
