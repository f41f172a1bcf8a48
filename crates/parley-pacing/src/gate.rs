// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admission control per user and action class.
//!
//! A ticket with TTL equal to the class cooldown is created atomically on
//! admission. While the ticket lives, further actions of the same class are
//! denied with the remaining TTL. Any cache failure admits the action.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use parley_config::model::PacingConfig;
use parley_core::{ActionClass, ParleyError, TicketCache, UserId};

/// Outcome of [`PacingGate::try_admit`].
#[derive(Debug)]
pub enum Admission {
    /// A fresh ticket was created (or the previous one expired in between).
    Admitted,
    /// A live ticket exists; the caller should wait `retry_after`.
    Denied { retry_after: Duration },
    /// The cache failed; the action is admitted anyway.
    FailedOpen { error: ParleyError },
}

impl Admission {
    /// True unless the action was denied.
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Admission::Denied { .. })
    }

    /// Remaining cooldown; zero unless denied.
    pub fn retry_after(&self) -> Duration {
        match self {
            Admission::Denied { retry_after } => *retry_after,
            _ => Duration::ZERO,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Admission::Admitted => "admitted",
            Admission::Denied { .. } => "denied",
            Admission::FailedOpen { .. } => "failed_open",
        }
    }
}

/// Whole seconds to show a user for `retry_after`: rounded up, at least 1.
pub fn wait_seconds(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

/// Per-user, per-class pacing over a [`TicketCache`].
#[derive(Clone)]
pub struct PacingGate {
    cache: Arc<dyn TicketCache>,
    message_cooldown: Duration,
    command_cooldown: Duration,
}

impl PacingGate {
    pub fn new(cache: Arc<dyn TicketCache>, config: &PacingConfig) -> Self {
        Self::with_cooldowns(cache, config.message_cooldown(), config.command_cooldown())
    }

    pub fn with_cooldowns(
        cache: Arc<dyn TicketCache>,
        message_cooldown: Duration,
        command_cooldown: Duration,
    ) -> Self {
        Self {
            cache,
            message_cooldown,
            command_cooldown,
        }
    }

    /// Cooldown applied to `class`.
    pub fn cooldown(&self, class: ActionClass) -> Duration {
        match class {
            ActionClass::Message => self.message_cooldown,
            ActionClass::Command => self.command_cooldown,
        }
    }

    /// Decides whether `user` may perform an action of `class` now.
    pub async fn try_admit(&self, user: &UserId, class: ActionClass) -> Admission {
        let key = class.ticket_key(user);
        let admission = self.check(&key, self.cooldown(class)).await;

        match &admission {
            Admission::FailedOpen { error } => {
                warn!(user_id = %user, %class, error = %error, "pacing cache unavailable, failing open");
            }
            Admission::Denied { retry_after } => {
                debug!(user_id = %user, %class, ?retry_after, "action denied by pacing gate");
            }
            Admission::Admitted => {}
        }
        metrics::counter!(
            "parley_admissions_total",
            "class" => class.to_string(),
            "outcome" => admission.label()
        )
        .increment(1);

        admission
    }

    async fn check(&self, key: &str, cooldown: Duration) -> Admission {
        match self.cache.set_if_absent(key, cooldown).await {
            Ok(true) => Admission::Admitted,
            Ok(false) => match self.cache.ttl(key).await {
                Ok(Some(remaining)) if !remaining.is_zero() => Admission::Denied {
                    retry_after: remaining,
                },
                // Expired between the two calls.
                Ok(_) => Admission::Admitted,
                Err(error) => Admission::FailedOpen { error },
            },
            Err(error) => Admission::FailedOpen { error },
        }
    }
}
