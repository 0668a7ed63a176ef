//! Integration tests for the OpenAI provider using wiremock.

use parley::{
    Action, ActionRegistry, FinishReason, Message, Provider, ProviderError, SinkFrame,
};
use parley_provider_openai::{ChatCompletionMessage, OpenAi};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse(events: &[serde_json::Value]) -> String {
    let mut body: String = events.iter().map(|e| format!("data: {e}\n\n")).collect();
    body.push_str("data: [DONE]\n\n");
    body
}

fn text_stream(parts: &[&str]) -> String {
    let mut events: Vec<serde_json::Value> = parts
        .iter()
        .map(|p| json!({"object": "chat.completion.chunk", "choices": [{"index": 0, "delta": {"content": p}}]}))
        .collect();
    events.push(json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]}));
    sse(&events)
}

fn history(client: &OpenAi, messages: &[Message]) -> Vec<ChatCompletionMessage> {
    messages.iter().map(|m| client.from_message(m)).collect()
}

fn add_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry
        .register(
            Action::from_fn("add", "Add two integers", |_p, _c| Ok(None)).with_schema(json!({
                "type": "object",
                "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
                "required": ["a", "b"]
            })),
        )
        .unwrap();
    registry
}

#[tokio::test]
async fn streams_text_and_forwards_chunks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(text_stream(&["2 + 2", " = 4"]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAi::new("test-key").base_url(server.uri());
    let history = history(&client, &[Message::user("What's 2+2?")]);
    let mut frames: Vec<SinkFrame> = Vec::new();

    let response = client.prompt(&history, Some(&mut frames)).await.unwrap();

    assert_eq!(response.message.as_deref(), Some("2 + 2 = 4"));
    assert_eq!(response.finish_reason, FinishReason::Completed);
    assert!(response.actions.is_empty());
    assert_eq!(
        frames,
        vec![
            SinkFrame::Start,
            SinkFrame::MessageChunk { content: "2 + 2".into() },
            SinkFrame::MessageChunk { content: " = 4".into() },
        ]
    );
}

#[tokio::test]
async fn request_body_carries_stream_model_and_tools() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "stream": true,
            "messages": [{"role": "system", "content": "be brief"}, {"role": "user", "content": "hi"}],
            "tools": [{
                "type": "function",
                "function": {"name": "add", "description": "Add two integers"}
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(text_stream(&["hi"]), "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAi::new("k")
        .model("gpt-4o-mini")
        .base_url(server.uri())
        .with_actions(add_registry());
    let history = history(&client, &[Message::system("be brief"), Message::user("hi")]);

    let response = client.prompt(&history, None).await.unwrap();
    assert_eq!(response.message.as_deref(), Some("hi"));
}

#[tokio::test]
async fn empty_registry_sends_no_tools() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(text_stream(&["ok"]), "text/event-stream"))
        .mount(&server)
        .await;

    let client = OpenAi::new("k").base_url(server.uri());
    client
        .prompt(&history(&client, &[Message::user("hi")]), None)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("tools").is_none());
    assert_eq!(body["stream"], json!(true));
}

#[tokio::test]
async fn assembles_fragmented_tool_calls() {
    let server = MockServer::start().await;
    let body = sse(&[
        json!({"choices": [{"index": 0, "delta": {"role": "assistant", "content": null, "tool_calls": [
            {"index": 0, "id": "call_a", "type": "function", "function": {"name": "add", "arguments": ""}}
        ]}}]}),
        json!({"choices": [{"index": 0, "delta": {"tool_calls": [
            {"index": 1, "id": "call_b", "type": "function", "function": {"name": "add", "arguments": "{\"a\":10,"}}
        ]}}]}),
        json!({"choices": [{"index": 0, "delta": {"tool_calls": [{"index": 0, "function": {"arguments": "{\"a\":2,"}}]}}]}),
        json!({"choices": [{"index": 0, "delta": {"tool_calls": [{"index": 0, "function": {"arguments": "\"b\":2}"}}]}}]}),
        json!({"choices": [{"index": 0, "delta": {"tool_calls": [{"index": 1, "function": {"arguments": "\"b\":20}"}}]}}]}),
        json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]}),
    ]);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = OpenAi::new("k").base_url(server.uri()).with_actions(add_registry());
    let response = client
        .prompt(&history(&client, &[Message::user("2+2 and 10+20")]), None)
        .await
        .unwrap();

    assert_eq!(response.finish_reason, FinishReason::ToolCall);
    assert_eq!(response.message, None);
    assert_eq!(response.actions.len(), 2);
    assert_eq!(response.actions[0].id, "call_a");
    assert_eq!(response.actions[0].params["b"], json!(2));
    assert_eq!(response.actions[1].id, "call_b");
    assert_eq!(response.actions[1].params["a"], json!(10));
}

#[tokio::test]
async fn azure_uses_deployment_path_and_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/deployments/prod-gpt4o/chat/completions"))
        .and(query_param("api-version", "2025-02-01-preview"))
        .and(header("api-key", "azure-key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(text_stream(&["ok"]), "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAi::new("azure-key")
        .base_url(server.uri())
        .azure("prod-gpt4o", "2025-02-01-preview");
    let response = client
        .prompt(&history(&client, &[Message::user("hi")]), None)
        .await
        .unwrap();
    assert_eq!(response.message.as_deref(), Some("ok"));
}

#[tokio::test]
async fn organization_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("openai-organization", "org-abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(text_stream(&["ok"]), "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAi::new("k").base_url(server.uri()).organization("org-abc123");
    client
        .prompt(&history(&client, &[Message::user("hi")]), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn http_errors_map_to_provider_errors() {
    let cases: [(u16, &str); 4] = [
        (401, "invalid api key"),
        (404, "DeploymentNotFound"),
        (429, "Please retry after 7 seconds"),
        (503, "overloaded"),
    ];
    for (status, body) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;

        let client = OpenAi::new("k").base_url(server.uri());
        let err = client
            .prompt(&history(&client, &[Message::user("hi")]), None)
            .await
            .unwrap_err();
        match (status, err) {
            (401, ProviderError::Authentication(msg)) => assert_eq!(msg, body),
            (404, ProviderError::ModelNotFound(_)) => {}
            (429, ProviderError::RateLimit { retry_after }) => {
                assert_eq!(retry_after, Some(std::time::Duration::from_secs(7)));
            }
            (503, ProviderError::ServiceUnavailable(_)) => {}
            (status, other) => panic!("status {status} mapped to {other:?}"),
        }
    }
}

#[tokio::test]
async fn error_payload_in_stream_fails_the_call() {
    let server = MockServer::start().await;
    let body = sse(&[
        json!({"choices": [{"index": 0, "delta": {"content": "partial"}}]}),
        json!({"error": {"message": "The server had an error while processing your request."}}),
    ]);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = OpenAi::new("k").base_url(server.uri());
    let err = client
        .prompt(&history(&client, &[Message::user("hi")]), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Stream(msg) if msg.contains("server had an error")));
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let client = OpenAi::new("k").base_url("http://127.0.0.1:1");
    let err = client
        .prompt(&history(&client, &[Message::user("hi")]), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Network(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn slow_response_reports_configured_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(text_stream(&["late"]), "text/event-stream")
                .set_delay(std::time::Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = OpenAi::new("k")
        .base_url(server.uri())
        .timeout(std::time::Duration::from_millis(100));
    let err = client
        .prompt(&history(&client, &[Message::user("hi")]), None)
        .await
        .unwrap_err();
    match err {
        ProviderError::Timeout(limit) => assert_eq!(limit, std::time::Duration::from_millis(100)),
        other => panic!("expected Timeout, got {other:?}"),
    }
}
