// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic history retention.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use parley_config::model::RetentionConfig;
use parley_core::{HistoryStore, ParleyError};

/// Deletes turns older than `max_age` every `interval`.
pub struct PruneTask {
    store: Arc<dyn HistoryStore>,
    interval: Duration,
    max_age: Duration,
}

impl PruneTask {
    pub fn new(store: Arc<dyn HistoryStore>, interval: Duration, max_age: Duration) -> Self {
        Self {
            store,
            interval,
            max_age,
        }
    }

    pub fn from_config(store: Arc<dyn HistoryStore>, config: &RetentionConfig) -> Self {
        Self::new(store, config.prune_interval(), config.max_age())
    }

    /// Runs a single prune cycle.
    pub async fn run_once(&self) -> Result<u64, ParleyError> {
        let removed = self.store.prune(self.max_age).await?;
        if removed > 0 {
            info!(removed, max_age_secs = self.max_age.as_secs(), "pruned expired turns");
        } else {
            debug!("prune cycle found nothing to remove");
        }
        Ok(removed)
    }

    /// Prunes on every tick until `cancel` fires. Failed cycles are logged
    /// and the loop keeps going.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.interval.as_secs(),
            max_age_secs = self.max_age.as_secs(),
            "prune task started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        error!(error = %e, "prune cycle failed");
                    }
                }
            }
        }

        debug!("prune task stopped");
    }
}
