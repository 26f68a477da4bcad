use integration_tests::{TestServer, llms::AnthropicMock};
use serde_json::json;

#[tokio::test]
async fn chat_completion() {
    let mut builder = TestServer::builder();
    builder.spawn_llm(AnthropicMock::new()).await;

    let server = builder.build("").await;
    let llm = server.llm_client("/ai");

    let request = json!({
        "model": "claude-haiku-4-5-20251001",
        "messages": [{ "role": "user", "content": "Hello!" }]
    });

    let body = llm.completions(request).await;

    insta::assert_json_snapshot!(body, {
        ".created" => "[created]"
    }, @r#"
    {
      "id": "msg_01XFDUDYJgAACzvnptvVoYEL",
      "object": "chat.completion",
      "created": "[created]",
      "model": "claude-haiku-4-5-20251001",
      "choices": [
        {
          "index": 0,
          "message": {
            "role": "assistant",
            "content": "Test response to: Hello!"
          },
          "finish_reason": "end_turn"
        }
      ],
      "usage": {
        "prompt_tokens": 10,
        "completion_tokens": 15,
        "total_tokens": 25
      }
    }
    "#);
}

#[tokio::test]
async fn system_message_is_sent_separately() {
    let mock = AnthropicMock::new();
    let requests = mock.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(mock).await;

    let server = builder.build("").await;
    let llm = server.llm_client("/ai");

    let request = json!({
        "model": "claude-haiku-4-5-20251001",
        "messages": [
            { "role": "system", "content": "You are a pirate." },
            { "role": "user", "content": "How are you?" }
        ]
    });

    let body = llm.completions(request).await;
    assert_eq!(body["choices"][0]["message"]["content"], "Test response to: How are you?");

    insta::assert_json_snapshot!(requests.last().body, @r#"
    {
      "model": "claude-haiku-4-5-20251001",
      "messages": [
        {
          "role": "user",
          "content": "How are you?"
        }
      ],
      "system": "You are a pirate.",
      "max_tokens": 1024
    }
    "#);
}

#[tokio::test]
async fn parameters_and_roles() {
    let mock = AnthropicMock::new();
    let requests = mock.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(mock).await;

    let server = builder.build("").await;
    let llm = server.llm_client("/ai");

    let request = json!({
        "model": "claude-sonnet-4-5-20250929",
        "messages": [
            { "role": "user", "content": "What is 6 * 7?" },
            { "role": "assistant", "content": "Let me check." },
            { "role": "tool", "content": "42" }
        ],
        "temperature": 0.5,
        "max_tokens": 100
    });

    llm.completions(request).await;

    insta::assert_json_snapshot!(requests.last().body, @r#"
    {
      "model": "claude-sonnet-4-5-20250929",
      "messages": [
        {
          "role": "user",
          "content": "What is 6 * 7?"
        },
        {
          "role": "assistant",
          "content": "Let me check."
        },
        {
          "role": "user",
          "content": "42"
        }
      ],
      "max_tokens": 100,
      "temperature": 0.5
    }
    "#);
}

#[tokio::test]
async fn authentication_headers() {
    let mock = AnthropicMock::new();
    let requests = mock.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(mock).await;

    let server = builder.build("").await;
    let llm = server.llm_client("/ai");

    let request = json!({
        "model": "claude-haiku-4-5-20251001",
        "messages": [{ "role": "user", "content": "Hi" }]
    });

    llm.completions(request).await;

    let request = requests.last();

    assert_eq!(request.header("x-api-key"), Some("test-key"));
    assert_eq!(request.header("anthropic-version"), Some("2023-06-01"));
    assert_eq!(request.header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn default_model_is_used_when_missing() {
    let mock = AnthropicMock::new();
    let requests = mock.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(mock).await;

    let server = builder.build("").await;
    let llm = server.llm_client("/ai");

    let body = llm
        .completions(json!({ "messages": [{ "role": "user", "content": "Hi" }] }))
        .await;

    assert_eq!(body["model"], "claude-haiku-4-5-20251001");
    assert_eq!(requests.last().body["model"], "claude-haiku-4-5-20251001");
}

#[tokio::test]
async fn configured_default_model() {
    let mock = AnthropicMock::new();
    let requests = mock.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(mock).await;

    let config = indoc::indoc! {r#"
        [llm]
        default_model = "claude-opus-4-5-20251101"
    "#};

    let server = builder.build(config).await;
    let llm = server.llm_client("/ai");

    let body = llm
        .completions(json!({ "model": "", "messages": [{ "role": "user", "content": "Hi" }] }))
        .await;

    assert_eq!(body["model"], "claude-opus-4-5-20251101");
    assert_eq!(requests.last().body["model"], "claude-opus-4-5-20251101");
}
