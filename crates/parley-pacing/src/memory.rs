// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process ticket cache backed by a concurrent map of expiry instants.
//!
//! Uses `tokio::time::Instant`, so paused-clock tests can drive expiry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use parley_core::{ParleyError, TicketCache};

/// Longest TTL a ticket is stored with; longer requests are clamped.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Key/TTL cache living in process memory.
///
/// Expired entries are treated as absent immediately and physically removed
/// by [`MemoryTicketCache::sweep`].
#[derive(Debug, Default)]
pub struct MemoryTicketCache {
    entries: DashMap<String, Instant>,
}

impl MemoryTicketCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes expired entries and returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    /// Spawns a task that sweeps every `interval` until `cancel` fires.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = self.sweep();
                        if removed > 0 {
                            trace!(removed, "swept expired pacing tickets");
                        }
                    }
                }
            }
            debug!("pacing ticket sweeper stopped");
        })
    }
}

#[async_trait]
impl TicketCache for MemoryTicketCache {
    async fn set_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, ParleyError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl.min(MAX_TTL))
            .ok_or_else(|| ParleyError::cache_msg(format!("ticket ttl {ttl:?} out of range")))?;
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() > now {
                    Ok(false)
                } else {
                    entry.insert(expires_at);
                    Ok(true)
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(expires_at);
                Ok(true)
            }
        }
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, ParleyError> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .and_then(|expires_at| expires_at.checked_duration_since(now))
            .filter(|remaining| !remaining.is_zero()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn set_if_absent_respects_ttl() {
        let cache = MemoryTicketCache::new();
        let ttl = Duration::from_secs(10);

        assert!(cache.set_if_absent("k", ttl).await.unwrap());
        assert!(!cache.set_if_absent("k", ttl).await.unwrap());
        assert_eq!(cache.ttl("k").await.unwrap(), Some(ttl));

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(cache.ttl("k").await.unwrap(), Some(Duration::from_secs(6)));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.ttl("k").await.unwrap(), None);
        assert!(cache.set_if_absent("k", ttl).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn huge_ttl_is_clamped() {
        let cache = MemoryTicketCache::new();

        assert!(cache.set_if_absent("k", Duration::MAX).await.unwrap());
        assert!(!cache.set_if_absent("k", Duration::MAX).await.unwrap());
        assert_eq!(cache.ttl("k").await.unwrap(), Some(MAX_TTL));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_key_has_no_ttl() {
        let cache = MemoryTicketCache::new();
        assert_eq!(cache.ttl("absent").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_drops_only_expired() {
        let cache = MemoryTicketCache::new();
        cache.set_if_absent("short", Duration::from_secs(1)).await.unwrap();
        cache.set_if_absent("long", Duration::from_secs(60)).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.ttl("long").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_stops_on_cancel() {
        let cache = Arc::new(MemoryTicketCache::new());
        cache.set_if_absent("k", Duration::from_secs(1)).await.unwrap();

        let cancel = CancellationToken::new();
        let handle = cache
            .clone()
            .spawn_sweeper(Duration::from_secs(5), cancel.clone());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(cache.is_empty());

        cancel.cancel();
        handle.await.unwrap();
    }
}
