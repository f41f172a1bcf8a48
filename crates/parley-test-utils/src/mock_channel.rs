// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with injectable inbound messages
//! and captured outbound messages for assertion in tests. Sends can be made
//! to fail or panic to exercise the delivery path.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use parley_core::{
    AdapterType, ChannelAdapter, HealthStatus, InboundMessage, MessageId, OutboundMessage,
    ParleyError, PluginAdapter, UserId,
};

/// A mock messaging channel for testing.
///
/// Provides two queues:
/// - **inbound**: Messages injected via `inject_message()` are returned by `receive()`
/// - **sent**: Messages passed to `send()` are captured and retrievable via `sent_messages()`
pub struct MockChannel {
    inbound: Arc<Mutex<VecDeque<InboundMessage>>>,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    notify: Arc<Notify>,
    sent_notify: Arc<Notify>,
    closed: AtomicBool,
    failing_sends: AtomicU32,
    panic_on_send: AtomicBool,
    send_attempts: AtomicUsize,
    typing: AtomicUsize,
}

impl MockChannel {
    /// Create a new mock channel with empty queues.
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            sent_notify: Arc::new(Notify::new()),
            closed: AtomicBool::new(false),
            failing_sends: AtomicU32::new(0),
            panic_on_send: AtomicBool::new(false),
            send_attempts: AtomicUsize::new(0),
            typing: AtomicUsize::new(0),
        }
    }

    /// Inject an inbound message into the receive queue.
    pub async fn inject_message(&self, msg: InboundMessage) {
        self.inbound.lock().await.push_back(msg);
        self.notify.notify_one();
    }

    /// Once the queue is drained, `receive()` returns a channel error.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// The next `n` sends fail with a channel error.
    pub fn fail_next_sends(&self, n: u32) {
        self.failing_sends.store(n, Ordering::SeqCst);
    }

    /// Every send panics while set.
    pub fn set_panic_on_send(&self, panic: bool) {
        self.panic_on_send.store(panic, Ordering::SeqCst);
    }

    /// Get all messages that were sent successfully.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Sends attempted, failed ones included.
    pub fn send_attempts(&self) -> usize {
        self.send_attempts.load(Ordering::SeqCst)
    }

    /// Typing indicators requested.
    pub fn typing_count(&self) -> usize {
        self.typing.load(Ordering::SeqCst)
    }

    /// Waits until at least `n` messages were sent or `timeout` elapses.
    /// Returns whatever was sent by then.
    pub async fn wait_for_sent(&self, n: usize, timeout: Duration) -> Vec<OutboundMessage> {
        let _ = tokio::time::timeout(timeout, async {
            loop {
                let notified = self.sent_notify.notified();
                if self.sent.lock().await.len() >= n {
                    return;
                }
                notified.await;
            }
        })
        .await;
        self.sent_messages().await
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a text message from `user` as the mock channel would deliver it.
pub fn inbound_text(user: &str, text: &str) -> InboundMessage {
    InboundMessage {
        id: uuid::Uuid::new_v4().to_string(),
        channel: "mock".to_string(),
        sender: UserId::from(user),
        text: text.to_string(),
        received_at: chrono::Utc::now(),
        metadata: None,
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    async fn connect(&mut self) -> Result<(), ParleyError> {
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, ParleyError> {
        self.send_attempts.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_send.load(Ordering::SeqCst) {
            panic!("mock channel send panicked");
        }
        let failing = self
            .failing_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(ParleyError::channel_msg("mock send failure"));
        }

        let id = format!("mock-msg-{}", uuid::Uuid::new_v4());
        self.sent.lock().await.push(msg);
        self.sent_notify.notify_waiters();
        Ok(MessageId(id))
    }

    async fn receive(&self) -> Result<InboundMessage, ParleyError> {
        loop {
            let notified = self.notify.notified();
            {
                let mut queue = self.inbound.lock().await;
                if let Some(msg) = queue.pop_front() {
                    return Ok(msg);
                }
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(ParleyError::channel_msg("mock channel closed"));
            }
            notified.await;
        }
    }

    async fn send_typing(
        &self,
        _recipient: &UserId,
        _metadata: Option<&str>,
    ) -> Result<(), ParleyError> {
        self.typing.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
