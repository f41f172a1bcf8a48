// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests of the completion provider against a mock HTTP server.

use parley_config::model::CompletionConfig;
use parley_core::{ChatMessage, CompletionProvider, ParleyError, Role};
use parley_openai::OpenAiProvider;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer, temperature: Option<f32>) -> OpenAiProvider {
    let config = CompletionConfig {
        api_key: Some("sk-test".into()),
        base_url: server.uri(),
        model: "unused-default".into(),
        timeout_secs: 5,
        temperature,
        max_tokens: Some(512),
    };
    OpenAiProvider::new(&config).expect("provider should build")
}

fn window() -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: Role::User,
            content: "What is 2+2?".into(),
        },
        ChatMessage {
            role: Role::Assistant,
            content: "4".into(),
        },
        ChatMessage {
            role: Role::User,
            content: "And 3+3?".into(),
        },
    ]
}

#[tokio::test]
async fn forwards_model_window_and_sampling_params() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": "deepseek-chat",
            "temperature": 0.5,
            "max_tokens": 512,
            "messages": [
                {"role": "user", "content": "What is 2+2?"},
                {"role": "assistant", "content": "4"},
                {"role": "user", "content": "And 3+3?"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "6"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 20, "completion_tokens": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = provider(&server, Some(0.5))
        .complete("deepseek-chat", &window())
        .await
        .unwrap();
    assert_eq!(reply, "6");
}

#[tokio::test]
async fn zero_choices_maps_to_no_choices() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = provider(&server, None)
        .complete("m", &window())
        .await
        .unwrap_err();
    assert!(matches!(err, ParleyError::NoChoices));
}

#[tokio::test]
async fn empty_reply_is_ok_and_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": ""}}]
        })))
        .mount(&server)
        .await;

    let reply = provider(&server, None).complete("m", &window()).await.unwrap();
    assert!(reply.is_empty());
}

#[tokio::test]
async fn http_error_keeps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error":"bad key"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let err = provider(&server, None)
        .complete("m", &window())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), r#"api returned status 401: {"error":"bad key"}"#);
}
