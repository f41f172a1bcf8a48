// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible completion provider for the Parley relay.
//!
//! Implements [`CompletionProvider`] over `POST {base_url}/chat/completions`.
//! Works with any endpoint speaking that dialect (OpenAI, DeepSeek, local
//! gateways).

pub mod client;
pub mod types;

use async_trait::async_trait;
use parley_config::model::CompletionConfig;
use parley_core::{
    AdapterType, ChatMessage, CompletionProvider, HealthStatus, ParleyError, PluginAdapter,
};
use tracing::{debug, info, warn};

use crate::client::OpenAiClient;
use crate::types::{ChatRequest, ChatResponse};

/// Environment fallback for the API key when the config leaves it unset.
pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

/// Chat-completion provider implementing [`CompletionProvider`].
pub struct OpenAiProvider {
    client: OpenAiClient,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAiProvider {
    /// Creates a provider from the completion config.
    ///
    /// API key resolution: `completion.api_key`, then `OPENAI_API_KEY`.
    pub fn new(config: &CompletionConfig) -> Result<Self, ParleyError> {
        let api_key = resolve_api_key(config.api_key.as_deref())?;
        let client = OpenAiClient::new(&api_key, &config.base_url, config.timeout())?;

        info!(
            endpoint = client.endpoint(),
            model = %config.model,
            "completion provider initialized"
        );

        Ok(Self {
            client,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

fn resolve_api_key(configured: Option<&str>) -> Result<String, ParleyError> {
    if let Some(key) = configured.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }
    std::env::var(API_KEY_ENV_VAR)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            ParleyError::Config(format!(
                "completion API key missing: set completion.api_key or {API_KEY_ENV_VAR}"
            ))
        })
}

/// Extracts the reply text from a decoded response.
///
/// Zero choices is an error (carrying the provider's message when present);
/// a choice with null or empty content is a valid empty reply.
pub fn first_choice_text(response: ChatResponse) -> Result<String, ParleyError> {
    if let Some(usage) = response.usage {
        debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "completion usage"
        );
    }

    match response.choices.into_iter().next() {
        Some(choice) => Ok(choice.message.content.unwrap_or_default()),
        None => match response.error.filter(|e| !e.message.is_empty()) {
            Some(err) => Err(ParleyError::Provider {
                message: format!("api error: {}", err.message),
                source: None,
            }),
            None => Err(ParleyError::NoChoices),
        },
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ParleyError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ParleyError> {
        Ok(())
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, ParleyError> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self.client.chat(&request).await.inspect_err(|e| {
            warn!(model, error = %e, "completion request failed");
        })?;
        first_choice_text(response)
    }
}
