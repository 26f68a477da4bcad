use std::time::{Duration, Instant};

use integration_tests::{
    TestServer,
    llms::{AnthropicMock, OpenRouterMock},
};
use serde_json::{Value, json};

async fn error_body(response: reqwest::Response) -> (u16, Value) {
    let status = response.status().as_u16();
    let content_type = response.headers().get("content-type").cloned();

    assert_eq!(
        content_type.as_ref().and_then(|value| value.to_str().ok()),
        Some("application/json")
    );

    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn no_provider_configured() {
    let server = TestServer::start("").await;
    let llm = server.llm_client("/ai");

    let request = json!({
        "model": "claude-haiku-4-5-20251001",
        "messages": [{ "role": "user", "content": "Hello!" }]
    });

    let (status, body) = error_body(llm.completions_response(&request).await).await;

    assert_eq!(status, 503);

    insta::assert_json_snapshot!(body, @r#"
    {
      "error": {
        "message": "Service unavailable: no provider configured for model 'claude-haiku-4-5-20251001', set an Anthropic or OpenRouter API key",
        "type": "service_unavailable",
        "code": 503
      }
    }
    "#);
}

#[tokio::test]
async fn namespaced_model_without_openrouter() {
    let mock = AnthropicMock::new();
    let requests = mock.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(mock).await;

    let server = builder.build("").await;
    let llm = server.llm_client("/ai");

    let request = json!({
        "model": "openai/gpt-4o",
        "messages": [{ "role": "user", "content": "Hello!" }]
    });

    let (status, body) = error_body(llm.completions_response(&request).await).await;

    assert_eq!(status, 503);
    assert_eq!(body["error"]["type"], "service_unavailable");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn empty_messages() {
    let mock = AnthropicMock::new();
    let requests = mock.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(mock).await;

    let server = builder.build("").await;
    let llm = server.llm_client("/ai");

    let request = json!({ "model": "claude-haiku-4-5-20251001", "messages": [] });
    let (status, body) = error_body(llm.completions_response(&request).await).await;

    assert_eq!(status, 400);

    insta::assert_json_snapshot!(body, @r#"
    {
      "error": {
        "message": "Invalid request: messages must contain at least one message",
        "type": "invalid_request_error",
        "code": 400
      }
    }
    "#);

    assert!(requests.is_empty());
}

#[tokio::test]
async fn out_of_range_parameters() {
    let mock = AnthropicMock::new();
    let requests = mock.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(mock).await;

    let server = builder.build("").await;
    let llm = server.llm_client("/ai");

    let messages = json!([{ "role": "user", "content": "Hi" }]);

    for request in [
        json!({ "model": "claude-haiku-4-5-20251001", "messages": messages, "max_tokens": 0 }),
        json!({ "model": "claude-haiku-4-5-20251001", "messages": messages, "max_tokens": 128001 }),
        json!({ "model": "claude-haiku-4-5-20251001", "messages": messages, "temperature": 2.5 }),
        json!({ "model": "claude-haiku-4-5-20251001", "messages": messages, "temperature": -1 }),
    ] {
        let (status, body) = error_body(llm.completions_response(&request).await).await;

        assert_eq!(status, 400, "accepted {request}");
        assert_eq!(body["error"]["type"], "invalid_request_error");
    }

    assert!(requests.is_empty());
}

#[tokio::test]
async fn malformed_json() {
    let mut builder = TestServer::builder();
    builder.spawn_llm(AnthropicMock::new()).await;

    let server = builder.build("").await;

    let response = server
        .client
        .request(reqwest::Method::POST, "/ai/v1/chat/completions")
        .header("content-type", "application/json")
        .body(r#"{"model": "claude-haiku-4-5-20251001", "messages": "#)
        .send()
        .await
        .unwrap();

    let (status, body) = error_body(response).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"]["type"], "invalid_request_error");
    assert_eq!(body["error"]["code"], 400);
}

#[tokio::test]
async fn upstream_error_keeps_raw_body() {
    let upstream = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;

    let mut builder = TestServer::builder();
    builder.spawn_llm(AnthropicMock::new().with_error(529, upstream)).await;

    let server = builder.build("").await;
    let llm = server.llm_client("/ai");

    let request = json!({
        "model": "claude-haiku-4-5-20251001",
        "messages": [{ "role": "user", "content": "Hello!" }]
    });

    let (status, body) = error_body(llm.completions_response(&request).await).await;

    assert_eq!(status, 502);
    assert_eq!(body["error"]["type"], "api_error");
    assert_eq!(body["error"]["code"], 502);
    assert_eq!(body["error"]["message"], format!("Upstream error (529): {upstream}"));
}

#[tokio::test]
async fn upstream_error_before_stream_starts() {
    let mut builder = TestServer::builder();
    builder.spawn_llm(OpenRouterMock::new().with_error(402, "Insufficient credits")).await;

    let server = builder.build("").await;
    let llm = server.llm_client("/ai");

    let request = json!({
        "model": "openai/gpt-4o",
        "messages": [{ "role": "user", "content": "Hello!" }],
        "stream": true
    });

    let (status, body) = error_body(llm.completions_response(&request).await).await;

    assert_eq!(status, 502);
    assert_eq!(body["error"]["message"], "Upstream error (402): Insufficient credits");
}

#[tokio::test]
async fn unreachable_upstream() {
    let config = indoc::indoc! {r#"
        [llm.anthropic]
        api_key = "test-key"
        base_url = "http://127.0.0.1:1/v1"
    "#};

    let server = TestServer::start(config).await;
    let llm = server.llm_client("/ai");

    let request = json!({
        "model": "claude-haiku-4-5-20251001",
        "messages": [{ "role": "user", "content": "Hello!" }]
    });

    let (status, body) = error_body(llm.completions_response(&request).await).await;

    assert_eq!(status, 502);
    assert_eq!(body["error"]["type"], "api_error");
    assert!(body["error"]["message"].as_str().unwrap().starts_with("Connection error: "));
}

#[tokio::test]
async fn stalled_upstream_times_out() {
    let mut builder = TestServer::builder();
    builder
        .spawn_llm(AnthropicMock::new().with_response_delay(Duration::from_secs(3)))
        .await;

    let config = indoc::indoc! {r#"
        [llm]
        timeout = "1s"
    "#};

    let server = builder.build(config).await;
    let llm = server.llm_client("/ai");

    let request = json!({
        "model": "claude-haiku-4-5-20251001",
        "messages": [{ "role": "user", "content": "Hello!" }]
    });

    let started = Instant::now();
    let (status, body) = error_body(llm.completions_response(&request).await).await;

    assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
    assert_eq!(status, 502);
    assert_eq!(body["error"]["type"], "api_error");
    assert!(body["error"]["message"].as_str().unwrap().starts_with("Connection error: "));
}

#[tokio::test]
async fn stalled_stream_times_out_before_headers() {
    let mut builder = TestServer::builder();
    builder
        .spawn_llm(AnthropicMock::new().with_response_delay(Duration::from_secs(3)))
        .await;

    let config = indoc::indoc! {r#"
        [llm]
        timeout = "1s"
    "#};

    let server = builder.build(config).await;
    let llm = server.llm_client("/ai");

    let request = json!({
        "model": "claude-haiku-4-5-20251001",
        "messages": [{ "role": "user", "content": "Hello!" }],
        "stream": true
    });

    let (status, body) = error_body(llm.completions_response(&request).await).await;

    assert_eq!(status, 502);
    assert_eq!(body["error"]["type"], "api_error");
}
