// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-message conversation flow.
//!
//! For a text message the orchestrator walks through
//! `Admitting -> PersistingUserTurn -> LoadingHistory -> Completing ->
//! PersistingAssistantTurn -> Delivering -> Done`, dropping to `Failed` on the
//! first error. Every error is turned into one of the fixed user-visible
//! replies from `[replies]`; internal detail only reaches the logs.
//!
//! The orchestrator owns no conversation state. History lives in the
//! [`HistoryStore`], tickets in the [`PacingGate`].

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use parley_config::model::{ParleyConfig, RepliesConfig};
use parley_core::{
    ActionClass, ChannelAdapter, ChatMessage, CompletionProvider, HistoryStore, InboundMessage,
    OutboundMessage, ParleyError, Role, Turn, UserId,
};
use parley_pacing::{PacingGate, wait_seconds};

use crate::commands::{CommandAction, CommandTable, parse_command};
use crate::delivery::DeliveryShim;

/// Parse mode used for static command texts.
pub const HTML_PARSE_MODE: &str = "HTML";

/// Stage a message is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Admitting,
    PersistingUserTurn,
    LoadingHistory,
    Completing,
    PersistingAssistantTurn,
    Delivering,
    Done,
    Failed,
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnState::Admitting => write!(f, "admitting"),
            TurnState::PersistingUserTurn => write!(f, "persisting_user_turn"),
            TurnState::LoadingHistory => write!(f, "loading_history"),
            TurnState::Completing => write!(f, "completing"),
            TurnState::PersistingAssistantTurn => write!(f, "persisting_assistant_turn"),
            TurnState::Delivering => write!(f, "delivering"),
            TurnState::Done => write!(f, "done"),
            TurnState::Failed => write!(f, "failed"),
        }
    }
}

/// Why a message ended in [`TurnState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Storage,
    Upstream,
    EmptyCompletion,
    Delivery,
    Timeout,
}

/// How a message was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Answered (completion, static text, or reset confirmation).
    Done,
    /// Turned away by the pacing gate.
    Denied,
    Failed(FailureKind),
}

impl TurnOutcome {
    fn label(&self) -> &'static str {
        match self {
            TurnOutcome::Done => "done",
            TurnOutcome::Denied => "denied",
            TurnOutcome::Failed(FailureKind::Storage) => "storage_error",
            TurnOutcome::Failed(FailureKind::Upstream) => "upstream_error",
            TurnOutcome::Failed(FailureKind::EmptyCompletion) => "empty_completion",
            TurnOutcome::Failed(FailureKind::Delivery) => "delivery_error",
            TurnOutcome::Failed(FailureKind::Timeout) => "timeout",
        }
    }
}

/// Text to send back to the user, with the outcome that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub parse_mode: Option<String>,
    pub outcome: TurnOutcome,
}

impl Reply {
    pub fn plain(text: impl Into<String>, outcome: TurnOutcome) -> Self {
        Self {
            text: text.into(),
            parse_mode: None,
            outcome,
        }
    }

    pub fn html(text: impl Into<String>, outcome: TurnOutcome) -> Self {
        Self {
            text: text.into(),
            parse_mode: Some(HTML_PARSE_MODE.to_string()),
            outcome,
        }
    }

    fn into_outbound(self, inbound: &InboundMessage) -> OutboundMessage {
        OutboundMessage {
            parse_mode: self.parse_mode,
            ..OutboundMessage::reply_to(inbound, self.text)
        }
    }
}

/// Result of [`ConversationOrchestrator::handle_inbound`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub outcome: TurnOutcome,
    /// Whether the reply reached the channel.
    pub delivered: bool,
}

/// Tuning knobs of the orchestrator, usually taken from [`ParleyConfig`].
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub model: String,
    pub history_window: usize,
    pub max_reply_chars: usize,
    pub request_timeout: Duration,
    pub replies: RepliesConfig,
}

impl OrchestratorSettings {
    pub fn from_config(config: &ParleyConfig) -> Self {
        Self {
            model: config.completion.model.clone(),
            history_window: config.agent.history_window,
            max_reply_chars: config.agent.max_reply_chars,
            request_timeout: config.agent.request_timeout(),
            replies: config.replies.clone(),
        }
    }
}

/// Tracks and logs the state of one message.
struct TurnTracker<'a> {
    user: &'a UserId,
    state: TurnState,
}

impl<'a> TurnTracker<'a> {
    fn new(user: &'a UserId) -> Self {
        Self {
            user,
            state: TurnState::Admitting,
        }
    }

    fn advance(&mut self, next: TurnState) {
        debug!(user_id = %self.user, from = %self.state, to = %next, "turn state transition");
        self.state = next;
    }

    fn fail(&mut self, kind: FailureKind, text: &str) -> Reply {
        self.advance(TurnState::Failed);
        Reply::plain(text, TurnOutcome::Failed(kind))
    }
}

/// Trims surrounding whitespace and keeps the longest prefix that fits in
/// `max_units` UTF-16 code units, the unit Telegram measures messages in.
/// Characters outside the BMP count twice and are never split.
pub fn shape_reply(raw: &str, max_units: usize) -> String {
    let mut used = 0;
    raw.trim()
        .chars()
        .take_while(|c| {
            used += c.len_utf16();
            used <= max_units
        })
        .collect()
}

/// Substitutes `{seconds}` in a rate-limit template.
pub fn format_wait(template: &str, retry_after: Duration) -> String {
    template.replace("{seconds}", &wait_seconds(retry_after).to_string())
}

/// Composes pacing, history, completion and delivery for each inbound message.
pub struct ConversationOrchestrator {
    gate: PacingGate,
    history: Arc<dyn HistoryStore>,
    provider: Arc<dyn CompletionProvider>,
    delivery: DeliveryShim,
    commands: CommandTable,
    settings: OrchestratorSettings,
}

impl ConversationOrchestrator {
    pub fn new(
        gate: PacingGate,
        history: Arc<dyn HistoryStore>,
        provider: Arc<dyn CompletionProvider>,
        delivery: DeliveryShim,
        settings: OrchestratorSettings,
    ) -> Self {
        let commands = CommandTable::from_replies(&settings.replies);
        Self {
            gate,
            history,
            provider,
            delivery,
            commands,
            settings,
        }
    }

    fn channel(&self) -> &Arc<dyn ChannelAdapter> {
        self.delivery.channel()
    }

    /// Processes one inbound message end to end, including delivery of the
    /// reply.
    ///
    /// A single deadline of `request_timeout` covers processing and delivery.
    /// When it expires, in-flight work is abandoned (completed writes stay)
    /// and a generic error is sent instead. A timeout too large to represent
    /// as an instant means no deadline.
    pub async fn handle_inbound(&self, inbound: InboundMessage) -> TurnReport {
        let deadline = Instant::now().checked_add(self.settings.request_timeout);
        let user = inbound.sender.clone();

        let work = async {
            let reply = self.route(&inbound).await;
            let outcome = reply.outcome;
            let delivered = self.deliver_reply(&inbound, reply).await;
            let outcome = match (outcome, delivered) {
                (TurnOutcome::Done, false) => TurnOutcome::Failed(FailureKind::Delivery),
                (outcome, _) => outcome,
            };
            TurnReport { outcome, delivered }
        };

        let finished = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, work).await,
            None => Ok(work.await),
        };
        let report = match finished {
            Ok(report) => report,
            Err(_) => {
                let timeout = ParleyError::Timeout {
                    duration: self.settings.request_timeout,
                };
                warn!(user_id = %user, error = %timeout, "message abandoned at deadline");
                let notice = OutboundMessage::reply_to(&inbound, &self.settings.replies.generic_error);
                let delivered = self.send_notice(notice).await;
                TurnReport {
                    outcome: TurnOutcome::Failed(FailureKind::Timeout),
                    delivered,
                }
            }
        };

        metrics::counter!("parley_turns_total", "outcome" => report.outcome.label()).increment(1);
        report
    }

    async fn route(&self, inbound: &InboundMessage) -> Reply {
        if let Some(name) = parse_command(&inbound.text)
            && let Some(reply) = self.on_command(&inbound.sender, name).await
        {
            return reply;
        }
        self.process_text(&inbound.sender, &inbound.text, inbound.metadata.as_deref())
            .await
    }

    async fn deliver_reply(&self, inbound: &InboundMessage, reply: Reply) -> bool {
        match self.delivery.deliver(reply.into_outbound(inbound)).await {
            Ok(_) => true,
            Err(e) => {
                error!(user_id = %inbound.sender, error = %e, "reply delivery failed");
                let notice =
                    OutboundMessage::reply_to(inbound, &self.settings.replies.delivery_failed);
                self.send_notice(notice).await;
                false
            }
        }
    }

    /// One best-effort send, no retry.
    async fn send_notice(&self, notice: OutboundMessage) -> bool {
        let recipient = notice.recipient.clone();
        match self.delivery.send_once(notice).await {
            Ok(_) => true,
            Err(e) => {
                debug!(user_id = %recipient, error = %e, "failure notice not delivered");
                false
            }
        }
    }

    /// Runs the text flow for `text` from `user` and returns the reply to send.
    pub async fn on_text_message(&self, user: &UserId, text: &str) -> Reply {
        self.process_text(user, text, None).await
    }

    async fn process_text(&self, user: &UserId, text: &str, metadata: Option<&str>) -> Reply {
        let replies = &self.settings.replies;
        let mut turn = TurnTracker::new(user);

        if let Some(denied) = self.pace(user, ActionClass::Message).await {
            turn.advance(TurnState::Done);
            return denied;
        }

        if let Err(e) = self.channel().send_typing(user, metadata).await {
            debug!(user_id = %user, error = %e, "typing indicator failed");
        }

        turn.advance(TurnState::PersistingUserTurn);
        if let Err(e) = self.history.append(&Turn::now(user.clone(), Role::User, text)).await {
            error!(user_id = %user, error = %e, "failed to persist user turn");
            return turn.fail(FailureKind::Storage, &replies.generic_error);
        }

        turn.advance(TurnState::LoadingHistory);
        let window = match self
            .history
            .recent_window(user, self.settings.history_window)
            .await
        {
            Ok(window) => window,
            Err(e) => {
                error!(user_id = %user, error = %e, "failed to load conversation window");
                return turn.fail(FailureKind::Storage, &replies.generic_error);
            }
        };
        let messages: Vec<ChatMessage> = window.into_iter().map(ChatMessage::from).collect();

        turn.advance(TurnState::Completing);
        let completion = match self.provider.complete(&self.settings.model, &messages).await {
            Ok(text) => text,
            // The model produced nothing to relay; answer as for empty text.
            Err(ParleyError::NoChoices) => {
                warn!(user_id = %user, "completion returned no choices");
                return turn.fail(FailureKind::EmptyCompletion, &replies.empty_completion);
            }
            Err(e) => {
                log_upstream_error(user, &e);
                return turn.fail(FailureKind::Upstream, &replies.generic_error);
            }
        };

        if completion.trim().is_empty() {
            warn!(user_id = %user, "completion returned empty text");
            return turn.fail(FailureKind::EmptyCompletion, &replies.empty_completion);
        }

        turn.advance(TurnState::PersistingAssistantTurn);
        if let Err(e) = self
            .history
            .append(&Turn::now(user.clone(), Role::Assistant, completion.as_str()))
            .await
        {
            error!(user_id = %user, error = %e, "failed to persist assistant turn");
            return turn.fail(FailureKind::Storage, &replies.generic_error);
        }

        let text = shape_reply(&completion, self.settings.max_reply_chars);
        turn.advance(TurnState::Delivering);
        info!(
            user_id = %user,
            window = messages.len(),
            reply_chars = text.chars().count(),
            "completion ready"
        );
        Reply::plain(text, TurnOutcome::Done)
    }

    /// Runs the reset flow: paced under the class the command table declares
    /// for `reset` (the command class by default), then deletes every turn of
    /// `user`.
    pub async fn on_reset_command(&self, user: &UserId) -> Reply {
        let class = self
            .commands
            .get("reset")
            .map_or(ActionClass::Command, |command| command.class);
        self.reset(user, class).await
    }

    async fn reset(&self, user: &UserId, class: ActionClass) -> Reply {
        let replies = &self.settings.replies;

        if let Some(denied) = self.pace(user, class).await {
            return denied;
        }

        match self.history.delete_all(user).await {
            Ok(removed) => {
                info!(user_id = %user, removed, "conversation reset");
                Reply::plain(&replies.reset_done, TurnOutcome::Done)
            }
            Err(e) => {
                error!(user_id = %user, error = %e, "conversation reset failed");
                Reply::plain(&replies.reset_failed, TurnOutcome::Failed(FailureKind::Storage))
            }
        }
    }

    /// Dispatches a slash command. `None` when `name` is not a known command,
    /// in which case the caller treats the message as text.
    pub async fn on_command(&self, user: &UserId, name: &str) -> Option<Reply> {
        let command = self.commands.get(name)?;

        let reply = match &command.action {
            CommandAction::Reset => self.reset(user, command.class).await,
            CommandAction::Static(text) => match self.pace(user, command.class).await {
                Some(denied) => denied,
                None => Reply::html(text, TurnOutcome::Done),
            },
        };

        debug!(user_id = %user, command = name, outcome = reply.outcome.label(), "command handled");
        Some(reply)
    }

    /// Admits `user` under `class`, or returns the wait reply for that class.
    async fn pace(&self, user: &UserId, class: ActionClass) -> Option<Reply> {
        let admission = self.gate.try_admit(user, class).await;
        if admission.is_admitted() {
            return None;
        }
        let replies = &self.settings.replies;
        let template = match class {
            ActionClass::Message => &replies.rate_limited_message,
            ActionClass::Command => &replies.rate_limited_command,
        };
        Some(Reply::plain(
            format_wait(template, admission.retry_after()),
            TurnOutcome::Denied,
        ))
    }
}

fn log_upstream_error(user: &UserId, e: &ParleyError) {
    match e {
        ParleyError::Upstream { status, body } => {
            error!(user_id = %user, status, body = %body, "completion API returned an error status");
        }
        other => {
            error!(user_id = %user, error = %other, "completion failed");
        }
    }
}
