// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! History store trait for durable per-user conversation logs.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Turn, UserId};

/// Append-only, per-user conversation log.
///
/// Turns of one user are ordered by `(created_at, insertion order)`.
#[async_trait]
pub trait HistoryStore: PluginAdapter {
    /// Initializes the backend (migrations, connections).
    async fn initialize(&self) -> Result<(), ParleyError>;

    /// Closes the backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), ParleyError>;

    /// Appends one turn and returns its storage id.
    async fn append(&self, turn: &Turn) -> Result<i64, ParleyError>;

    /// Returns at most `limit` newest turns of `user`, oldest first.
    async fn recent_window(&self, user: &UserId, limit: usize)
    -> Result<Vec<Turn>, ParleyError>;

    /// Deletes every turn of `user`. Returns the number of deleted turns;
    /// deleting an empty history is not an error.
    async fn delete_all(&self, user: &UserId) -> Result<u64, ParleyError>;

    /// Deletes all turns, for all users, created before `now - older_than`.
    async fn prune(&self, older_than: Duration) -> Result<u64, ParleyError>;
}
