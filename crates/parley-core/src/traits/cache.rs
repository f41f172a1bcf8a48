// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key/TTL cache trait backing rate-limit tickets.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ParleyError;

/// Minimal cache contract needed by the pacing gate.
#[async_trait]
pub trait TicketCache: Send + Sync + 'static {
    /// Atomically stores `key` with `ttl` unless a live entry already exists.
    /// Returns `true` when the entry was created by this call.
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, ParleyError>;

    /// Remaining lifetime of `key`. `None` when absent or already expired.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, ParleyError>;
}
