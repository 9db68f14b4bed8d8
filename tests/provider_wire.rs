//! Wire-format and error-classification tests against mock HTTP servers.

use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use atelier_engine::providers::{DeepSeekClient, GeminiClient, OpenAiClient, Provider};
use atelier_engine::{AppConfig, EngineError, GenerationRequest};

fn config_for(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::default();
    config.gemini_api_key = "test-key".to_string();
    config.gemini_base_url = server.uri();
    config.deepseek_api_key = "test-key".to_string();
    config.deepseek_base_url = server.uri();
    config.openai_api_key = "test-key".to_string();
    config.openai_base_url = server.uri();
    config
}

const GEMINI_CHAT_PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

#[tokio::test]
async fn gemini_parses_structured_artifact_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GEMINI_CHAT_PATH))
        .and(body_partial_json(serde_json::json!({
            "generationConfig": { "responseMimeType": "application/json" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "text": "{\"response\": \"Done!\", \"artifact\": \"<form></form>\"}"
                    }]
                },
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::new(&config_for(&server));
    let reply = client
        .generate(&GenerationRequest::text_only("make a form"))
        .await
        .expect("generate");

    assert_eq!(reply.text, "Done!");
    assert_eq!(reply.artifact.as_deref(), Some("<form></form>"));
}

#[tokio::test]
async fn gemini_rejects_non_object_replies() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GEMINI_CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Sure, here you go!" }] },
                "finishReason": "STOP"
            }]
        })))
        .mount(&server)
        .await;

    let client = GeminiClient::new(&config_for(&server));
    let err = client
        .generate(&GenerationRequest::text_only("make a form"))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidResponseShape { .. }));
}

#[tokio::test]
async fn gemini_block_reason_is_content_blocked() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GEMINI_CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [],
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;

    let client = GeminiClient::new(&config_for(&server));
    let err = client
        .extract_text(&[], "transcribe")
        .await
        .unwrap_err();

    match err {
        EngineError::ContentBlocked { reason, .. } => assert_eq!(reason, "SAFETY"),
        other => panic!("expected ContentBlocked, got {:?}", other),
    }
}

#[tokio::test]
async fn gemini_abnormal_stop_with_no_text_is_incomplete() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GEMINI_CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "finishReason": "MAX_TOKENS" }]
        })))
        .mount(&server)
        .await;

    let client = GeminiClient::new(&config_for(&server));
    let err = client.extract_text(&[], "transcribe").await.unwrap_err();
    assert!(matches!(err, EngineError::IncompleteGeneration { .. }));
}

#[tokio::test]
async fn gemini_normal_stop_with_no_text_is_empty_ok() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GEMINI_CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [] }, "finishReason": "STOP" }]
        })))
        .mount(&server)
        .await;

    let client = GeminiClient::new(&config_for(&server));
    let text = client.extract_text(&[], "transcribe").await.expect("ok");
    assert!(text.is_empty());
}

#[tokio::test]
async fn gemini_429_is_quota_exceeded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GEMINI_CHAT_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let client = GeminiClient::new(&config_for(&server));
    let err = client
        .generate(&GenerationRequest::text_only("hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::QuotaExceeded { provider: "gemini" }));
}

#[tokio::test]
async fn deepseek_5xx_is_provider_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let client = DeepSeekClient::new(&config_for(&server));
    let err = client
        .generate(&GenerationRequest::text_only("hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ProviderUnavailable { provider: "deepseek", .. }));
}

#[tokio::test]
async fn deepseek_returns_plain_text_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "model": "deepseek-chat",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "안녕하세요!" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DeepSeekClient::new(&config_for(&server));
    let reply = client
        .generate(&GenerationRequest::text_only("인사해줘"))
        .await
        .expect("generate");

    assert_eq!(reply.text, "안녕하세요!");
    assert!(reply.artifact.is_none());
}

#[tokio::test]
async fn openai_sends_history_and_system_instruction() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "messages": [
                { "role": "system", "content": "You are terse." },
                { "role": "user", "content": "first question" },
                { "role": "assistant", "content": "first answer" },
                { "role": "user", "content": "second question" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "second answer" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiClient::new(&config_for(&server));

    let mut request = GenerationRequest::text_only("second question");
    request.system_instruction = "You are terse.".to_string();
    request.history = vec![
        atelier_engine::ChatTurn::new(atelier_engine::Role::User, "first question"),
        atelier_engine::ChatTurn::new(atelier_engine::Role::Assistant, "first answer"),
    ];

    let reply = client.generate(&request).await.expect("generate");
    assert_eq!(reply.text, "second answer");
}

#[tokio::test]
async fn openai_empty_choices_is_invalid_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
        )
        .mount(&server)
        .await;

    let client = OpenAiClient::new(&config_for(&server));
    let err = client
        .generate(&GenerationRequest::text_only("hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidResponseShape { .. }));
}
