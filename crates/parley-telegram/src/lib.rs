// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram channel adapter for the Parley relay.
//!
//! Implements [`ChannelAdapter`] for the Telegram Bot API via teloxide
//! long polling. Only private text messages are forwarded.

pub mod handler;

use async_trait::async_trait;
use parley_config::model::TelegramConfig;
use parley_core::{
    AdapterType, ChannelAdapter, HealthStatus, InboundMessage, MessageId, OutboundMessage,
    ParleyError, PluginAdapter, UserId,
};
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ChatId, ParseMode, Recipient};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Capacity of the queue between the polling task and `receive()`.
const INBOUND_QUEUE: usize = 100;

/// Telegram channel adapter implementing [`ChannelAdapter`].
pub struct TelegramChannel {
    bot: Bot,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundMessage>>,
    inbound_tx: mpsc::Sender<InboundMessage>,
    polling_handle: Option<tokio::task::JoinHandle<()>>,
}

impl TelegramChannel {
    /// Creates a new Telegram channel adapter.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: &TelegramConfig) -> Result<Self, ParleyError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            ParleyError::Config("telegram.bot_token is required for the Telegram channel".into())
        })?;

        if token.trim().is_empty() {
            return Err(ParleyError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);

        Ok(Self {
            bot: Bot::new(token),
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx,
            polling_handle: None,
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

impl Drop for TelegramChannel {
    fn drop(&mut self) {
        if let Some(handle) = self.polling_handle.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl PluginAdapter for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        debug!("Telegram channel shutting down");
        if let Some(handle) = &self.polling_handle {
            handle.abort();
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for TelegramChannel {
    async fn connect(&mut self) -> Result<(), ParleyError> {
        if self.polling_handle.is_some() {
            return Ok(());
        }

        let bot = self.bot.clone();
        let tx = self.inbound_tx.clone();

        info!("starting Telegram long polling");

        let handle = tokio::spawn(async move {
            let handler = Update::filter_message().endpoint(move |msg: Message| {
                let tx = tx.clone();
                async move {
                    match handler::to_inbound_message(&msg) {
                        Some(inbound) => {
                            if tx.send(inbound).await.is_err() {
                                warn!("inbound channel closed, dropping message");
                            }
                        }
                        None => {
                            debug!(chat_id = msg.chat.id.0, msg_id = msg.id.0, "ignoring message");
                        }
                    }
                    respond(())
                }
            });

            Dispatcher::builder(bot, handler)
                .default_handler(|_| async {})
                .build()
                .dispatch()
                .await;
        });

        self.polling_handle = Some(handle);
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, ParleyError> {
        let chat_id = resolve_chat_id(&msg.recipient, msg.metadata.as_deref())?;

        let request = self.bot.send_message(Recipient::Id(chat_id), &msg.content);
        let result = match msg.parse_mode.as_deref() {
            Some(mode) if mode.eq_ignore_ascii_case("html") => {
                request.parse_mode(ParseMode::Html).await
            }
            _ => request.await,
        };

        let sent = result.map_err(|e| ParleyError::Channel {
            message: format!("failed to send message: {e}"),
            source: Some(Box::new(e)),
        })?;

        Ok(MessageId(sent.id.0.to_string()))
    }

    async fn receive(&self) -> Result<InboundMessage, ParleyError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| ParleyError::channel_msg("Telegram inbound channel closed"))
    }

    async fn send_typing(
        &self,
        recipient: &UserId,
        metadata: Option<&str>,
    ) -> Result<(), ParleyError> {
        let chat_id = resolve_chat_id(recipient, metadata)?;

        self.bot
            .send_chat_action(chat_id, ChatAction::Typing)
            .await
            .map_err(|e| ParleyError::Channel {
                message: format!("failed to send typing indicator: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(())
    }
}

/// Chat to answer in: the `chat_id` from metadata, else the recipient's user
/// id (equal to the chat id in private chats).
fn resolve_chat_id(recipient: &UserId, metadata: Option<&str>) -> Result<ChatId, ParleyError> {
    if let Some(id) = handler::chat_id_from_metadata(metadata) {
        return Ok(ChatId(id));
    }

    recipient
        .as_str()
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| ParleyError::channel_msg(format!("no valid chat_id for recipient {recipient}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>) -> TelegramConfig {
        TelegramConfig {
            bot_token: token.map(str::to_string),
        }
    }

    #[test]
    fn new_requires_bot_token() {
        assert!(TelegramChannel::new(&config(None)).is_err());
    }

    #[test]
    fn new_rejects_empty_token() {
        assert!(TelegramChannel::new(&config(Some("  "))).is_err());
    }

    #[test]
    fn new_accepts_valid_token() {
        assert!(TelegramChannel::new(&config(Some("123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11"))).is_ok());
    }

    #[test]
    fn chat_id_prefers_metadata() {
        let id = resolve_chat_id(&UserId::from("1"), Some(r#"{"chat_id":"12345"}"#)).unwrap();
        assert_eq!(id.0, 12345);
    }

    #[test]
    fn chat_id_falls_back_to_recipient() {
        let id = resolve_chat_id(&UserId::from("777"), None).unwrap();
        assert_eq!(id.0, 777);
    }

    #[test]
    fn chat_id_fails_without_valid_id() {
        assert!(resolve_chat_id(&UserId::from("alice"), None).is_err());
    }

    #[test]
    fn plugin_adapter_metadata() {
        let channel = TelegramChannel::new(&config(Some("test:token"))).unwrap();
        assert_eq!(channel.name(), "telegram");
        assert_eq!(channel.version(), semver::Version::new(0, 1, 0));
        assert_eq!(channel.adapter_type(), AdapterType::Channel);
    }
}
