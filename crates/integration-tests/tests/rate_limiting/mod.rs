//! Integration tests for rate limiting of chat completions.

use indoc::indoc;
use integration_tests::{TestServer, llms::AnthropicMock};
use serde_json::{Value, json};

/// Rejected by validation, so it consumes quota without reaching a provider.
fn empty_request() -> Value {
    json!({ "model": "claude-haiku-4-5-20251001", "messages": [] })
}

fn valid_request() -> Value {
    json!({
        "model": "claude-haiku-4-5-20251001",
        "messages": [{ "role": "user", "content": "Hello!" }]
    })
}

#[tokio::test]
async fn sixty_first_request_is_rejected() {
    let mock = AnthropicMock::new();
    let requests = mock.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(mock).await;

    let config = indoc! {r#"
        [llm.rate_limits]
        per_ip = { limit = 60, duration = "60s" }
    "#};

    let server = builder.build(config).await;
    let llm = server.llm_client("/ai");

    for i in 1..=60 {
        let response = llm.completions_response(&empty_request()).await;
        assert_eq!(response.status(), 400, "request {i} was throttled");
    }

    let response = llm.completions_response(&valid_request()).await;

    assert_eq!(response.status(), 429);

    let retry_after: u64 = response
        .headers()
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .unwrap();

    assert!((1..=60).contains(&retry_after), "retry-after was {retry_after}");

    let body: Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "error": {
        "message": "Rate limit exceeded: too many requests from 127.0.0.1",
        "type": "rate_limit_error",
        "code": 429
      }
    }
    "#);

    // Throttled requests never reach the provider.
    assert!(requests.is_empty());
}

#[tokio::test]
async fn global_limit() {
    let mut builder = TestServer::builder();
    builder.spawn_llm(AnthropicMock::new()).await;

    let config = indoc! {r#"
        [llm.rate_limits]
        global = { limit = 2, duration = "1h" }
    "#};

    let server = builder.build(config).await;
    let llm = server.llm_client("/ai");

    let statuses = [
        llm.completions_response(&valid_request()).await.status().as_u16(),
        llm.completions_response(&valid_request()).await.status().as_u16(),
    ];

    assert_eq!(statuses, [200, 200]);

    let response = llm.completions_response(&valid_request()).await;
    assert_eq!(response.status(), 429);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Rate limit exceeded: too many requests across all clients");
}

#[tokio::test]
async fn models_are_not_rate_limited() {
    let mut builder = TestServer::builder();
    builder.spawn_llm(AnthropicMock::new()).await;

    let config = indoc! {r#"
        [llm.rate_limits]
        per_ip = { limit = 1, duration = "1h" }
    "#};

    let server = builder.build(config).await;
    let llm = server.llm_client("/ai");

    assert_eq!(llm.completions_response(&valid_request()).await.status(), 200);
    assert_eq!(llm.completions_response(&valid_request()).await.status(), 429);

    for _ in 0..5 {
        let body = llm.list_models().await;
        assert_eq!(body["object"], "list");
    }
}

#[tokio::test]
async fn disabled_rate_limits() {
    let mut builder = TestServer::builder();
    builder.spawn_llm(AnthropicMock::new()).await;

    let config = indoc! {r#"
        [llm.rate_limits]
        enabled = false
        per_ip = { limit = 1, duration = "1h" }
    "#};

    let server = builder.build(config).await;
    let llm = server.llm_client("/ai");

    for _ in 0..5 {
        assert_eq!(llm.completions_response(&valid_request()).await.status(), 200);
    }
}
