//! A real `Conversation` driving the OpenAI provider against a mock server.

use parley::{Action, Conversation, Message, Outcome, Provider, SinkFrame, SseSink};
use parley_provider_openai::OpenAi;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse(events: &[serde_json::Value]) -> String {
    let mut body: String = events.iter().map(|e| format!("data: {e}\n\n")).collect();
    body.push_str("data: [DONE]\n\n");
    body
}

fn add_action() -> Action {
    Action::from_fn("add", "Add two integers", |params, _ctx| {
        let a = params.get("a").and_then(|v| v.as_i64()).unwrap_or(0);
        let b = params.get("b").and_then(|v| v.as_i64()).unwrap_or(0);
        Ok(Some((a + b).to_string()))
    })
    .with_schema(json!({
        "type": "object",
        "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
        "required": ["a", "b"]
    }))
}

async fn mount_add_exchange(server: &MockServer) {
    let tool_call = sse(&[
        json!({"choices": [{"index": 0, "delta": {"tool_calls": [
            {"index": 0, "id": "call_1", "type": "function", "function": {"name": "add", "arguments": ""}}
        ]}}]}),
        json!({"choices": [{"index": 0, "delta": {"tool_calls": [{"index": 0, "function": {"arguments": "{\"a\": 2, "}}]}}]}),
        json!({"choices": [{"index": 0, "delta": {"tool_calls": [{"index": 0, "function": {"arguments": "\"b\": 2}"}}]}}]}),
        json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]}),
    ]);
    let answer = sse(&[
        json!({"choices": [{"index": 0, "delta": {"content": "2 + 2"}}]}),
        json!({"choices": [{"index": 0, "delta": {"content": " is 4"}}]}),
        json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}]}),
    ]);

    // Once a tool result is in the history, answer; otherwise ask for the tool.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("tool_call_id"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(answer, "text/event-stream"))
        .with_priority(1)
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(tool_call, "text/event-stream"))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn tool_call_exchange_over_http() {
    let server = MockServer::start().await;
    mount_add_exchange(&server).await;

    let mut client = OpenAi::new("test-key").base_url(server.uri());
    client.actions_mut().register(add_action()).unwrap();
    let mut conversation = Conversation::with_history(client, [Message::system("You add numbers.")]);

    let outcome = conversation.on_messaged(Message::user("What's 2+2?")).await;

    assert!(matches!(outcome, Outcome::Completed { iterations: 2 }));
    let messages = conversation.messages().unwrap();
    assert_eq!(messages.len(), 5);
    let call = &messages[2].as_chat().unwrap().actions[0];
    assert_eq!(call.id, "call_1");
    assert_eq!(call.params["a"], json!(2));
    assert_eq!(messages[3], Message::action_result("call_1", "4"));
    assert_eq!(messages[4].text(), Some("2 + 2 is 4"));

    // The second request replays the assistant's tool call and our result.
    let requests = server.received_requests().await.unwrap();
    let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    let wire = &second["messages"];
    assert_eq!(wire[2]["role"], "assistant");
    assert_eq!(wire[2]["tool_calls"][0]["id"], "call_1");
    assert_eq!(wire[3], json!({"role": "tool", "content": "4", "tool_call_id": "call_1"}));
}

#[tokio::test]
async fn sse_sink_sees_text_of_every_request() {
    let server = MockServer::start().await;
    mount_add_exchange(&server).await;

    let mut client = OpenAi::new("test-key").base_url(server.uri());
    client.actions_mut().register(add_action()).unwrap();
    let (sink, mut rx) = SseSink::channel();
    let mut conversation = Conversation::new(client).with_sink(sink);

    conversation.on_messaged(Message::user("What's 2+2?")).await;
    drop(conversation);

    let mut frames = Vec::new();
    while let Some(bytes) = rx.recv().await {
        frames.push(String::from_utf8(bytes.to_vec()).unwrap());
    }
    let start = SinkFrame::Start.to_sse();
    assert_eq!(frames.iter().filter(|f| **f == start).count(), 2);
    assert!(frames.iter().any(|f| f.contains("\"content\":\" is 4\"")));
    assert!(frames.iter().all(|f| f.starts_with("data: ") && f.ends_with("\n\n")));
}

#[tokio::test]
async fn http_failure_ends_the_loop() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let client = OpenAi::new("test-key").base_url(server.uri());
    let mut conversation = Conversation::new(client);

    let outcome = conversation.on_messaged(Message::user("hi")).await;

    assert!(matches!(
        outcome,
        Outcome::Failed { iterations: 1, error: parley::LoopError::Provider(parley::ProviderError::ServiceUnavailable(_)) }
    ));
    assert_eq!(conversation.len(), 1);
}
