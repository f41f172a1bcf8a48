// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion provider trait for OpenAI-compatible chat-completion APIs.

use async_trait::async_trait;

use crate::error::ParleyError;
use crate::traits::adapter::PluginAdapter;
use crate::types::ChatMessage;

/// Stateless adapter to a chat-completion API.
#[async_trait]
pub trait CompletionProvider: PluginAdapter {
    /// Sends `messages` (oldest first) to `model` and returns the text of the
    /// first choice.
    ///
    /// An empty string is a valid answer and is returned as `Ok("")`.
    /// Implementations do not retry.
    async fn complete(&self, model: &str, messages: &[ChatMessage])
    -> Result<String, ParleyError>;
}
