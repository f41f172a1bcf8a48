// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded-retry delivery of outbound messages.
//!
//! After failed attempt `k` (1-based) the shim sleeps `k * backoff_step`
//! unless `k` was the last attempt. A panic inside the channel's `send` is
//! caught and counted as a failed attempt.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, warn};

use parley_config::model::DeliveryConfig;
use parley_core::{ChannelAdapter, MessageId, OutboundMessage, ParleyError};

/// Sends outbound messages through a channel with linear backoff.
#[derive(Clone)]
pub struct DeliveryShim {
    channel: Arc<dyn ChannelAdapter>,
    max_attempts: u32,
    backoff_step: Duration,
}

impl DeliveryShim {
    pub fn new(channel: Arc<dyn ChannelAdapter>, config: &DeliveryConfig) -> Self {
        Self::with_policy(channel, config.max_attempts, config.backoff_step())
    }

    pub fn with_policy(
        channel: Arc<dyn ChannelAdapter>,
        max_attempts: u32,
        backoff_step: Duration,
    ) -> Self {
        Self {
            channel,
            max_attempts: max_attempts.max(1),
            backoff_step,
        }
    }

    /// Channel the shim delivers through.
    pub fn channel(&self) -> &Arc<dyn ChannelAdapter> {
        &self.channel
    }

    /// Delivers `outbound`, retrying failed sends.
    ///
    /// Returns the last error once every attempt has failed.
    pub async fn deliver(&self, outbound: OutboundMessage) -> Result<MessageId, ParleyError> {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match self.send_once(outbound.clone()).await {
                Ok(id) => {
                    metrics::counter!("parley_deliveries_total", "outcome" => "sent").increment(1);
                    debug!(recipient = %outbound.recipient, attempt, "message delivered");
                    return Ok(id);
                }
                Err(e) => {
                    warn!(
                        recipient = %outbound.recipient,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "delivery attempt failed"
                    );
                    last_error = Some(e);
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.backoff(attempt)).await;
            }
        }

        metrics::counter!("parley_deliveries_total", "outcome" => "failed").increment(1);
        Err(last_error.unwrap_or_else(|| ParleyError::channel_msg("delivery was not attempted")))
    }

    /// Pause after failed attempt `attempt`, saturating on overflow.
    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_step
            .checked_mul(attempt)
            .unwrap_or(Duration::MAX)
    }

    /// One attempt, no retry. A panic in the channel becomes a `Channel` error.
    pub(crate) async fn send_once(&self, outbound: OutboundMessage) -> Result<MessageId, ParleyError> {
        match AssertUnwindSafe(self.channel.send(outbound)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(ParleyError::channel_msg(format!(
                "channel send panicked: {}",
                panic_message(panic.as_ref())
            ))),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
