// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory history store with switchable failures, plus a ticket cache
//! that always fails.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use parley_core::{
    AdapterType, HealthStatus, HistoryStore, ParleyError, PluginAdapter, Role, TicketCache, Turn,
    UserId,
};

/// History kept in a `Vec`, oldest first.
#[derive(Default)]
pub struct MockHistory {
    turns: Mutex<Vec<Turn>>,
    fail_user_appends: AtomicBool,
    fail_assistant_appends: AtomicBool,
    fail_window: AtomicBool,
    fail_delete: AtomicBool,
}

impl MockHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_appends_for(&self, role: Role, fail: bool) {
        match role {
            Role::User => self.fail_user_appends.store(fail, Ordering::SeqCst),
            Role::Assistant => self.fail_assistant_appends.store(fail, Ordering::SeqCst),
        }
    }

    pub fn fail_window(&self, fail: bool) {
        self.fail_window.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Every stored turn of `user`, oldest first.
    pub async fn turns_of(&self, user: &UserId) -> Vec<Turn> {
        self.turns
            .lock()
            .await
            .iter()
            .filter(|t| &t.user_id == user)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PluginAdapter for MockHistory {
    fn name(&self) -> &str {
        "mock-history"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::History
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for MockHistory {
    async fn initialize(&self) -> Result<(), ParleyError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), ParleyError> {
        Ok(())
    }

    async fn append(&self, turn: &Turn) -> Result<i64, ParleyError> {
        let failing = match turn.role {
            Role::User => &self.fail_user_appends,
            Role::Assistant => &self.fail_assistant_appends,
        };
        if failing.load(Ordering::SeqCst) {
            return Err(ParleyError::storage_msg("mock append failure"));
        }
        let mut turns = self.turns.lock().await;
        turns.push(turn.clone());
        Ok(turns.len() as i64)
    }

    async fn recent_window(&self, user: &UserId, limit: usize) -> Result<Vec<Turn>, ParleyError> {
        if self.fail_window.load(Ordering::SeqCst) {
            return Err(ParleyError::storage_msg("mock window failure"));
        }
        let all = self.turns_of(user).await;
        let skip = all.len().saturating_sub(limit);
        Ok(all.into_iter().skip(skip).collect())
    }

    async fn delete_all(&self, user: &UserId) -> Result<u64, ParleyError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(ParleyError::storage_msg("mock delete failure"));
        }
        let mut turns = self.turns.lock().await;
        let before = turns.len();
        turns.retain(|t| &t.user_id != user);
        Ok((before - turns.len()) as u64)
    }

    async fn prune(&self, older_than: Duration) -> Result<u64, ParleyError> {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(older_than)
                .map_err(|e| ParleyError::Internal(e.to_string()))?;
        let mut turns = self.turns.lock().await;
        let before = turns.len();
        turns.retain(|t| t.created_at >= cutoff);
        Ok((before - turns.len()) as u64)
    }
}

/// Ticket cache whose every call fails, as an unreachable backend would.
#[derive(Debug, Default)]
pub struct FailingCache;

#[async_trait]
impl TicketCache for FailingCache {
    async fn set_if_absent(&self, _key: &str, _ttl: Duration) -> Result<bool, ParleyError> {
        Err(ParleyError::cache_msg("cache backend unreachable"))
    }

    async fn ttl(&self, _key: &str) -> Result<Option<Duration>, ParleyError> {
        Err(ParleyError::cache_msg("cache backend unreachable"))
    }
}
