use integration_tests::{TestServer, llms::OpenRouterMock};
use serde_json::json;

#[tokio::test]
async fn chat_completion() {
    let mut builder = TestServer::builder();
    builder.spawn_llm(OpenRouterMock::new()).await;

    let server = builder.build("").await;
    let llm = server.llm_client("/ai");

    let request = json!({
        "model": "openai/gpt-4o",
        "messages": [{ "role": "user", "content": "Hello!" }]
    });

    let body = llm.completions(request).await;

    insta::assert_json_snapshot!(body, @r#"
    {
      "id": "gen-1700000000-abcdef",
      "object": "chat.completion",
      "created": 1700000000,
      "model": "openai/gpt-4o",
      "choices": [
        {
          "index": 0,
          "message": {
            "role": "assistant",
            "content": "Test response to: Hello!"
          },
          "finish_reason": "stop"
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
async fn messages_are_forwarded_verbatim() {
    let mock = OpenRouterMock::new();
    let requests = mock.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(mock).await;

    let server = builder.build("").await;
    let llm = server.llm_client("/ai");

    let request = json!({
        "model": "mistralai/mistral-large",
        "messages": [
            { "role": "system", "content": "Be brief." },
            { "role": "user", "content": "Hi" }
        ]
    });

    llm.completions(request).await;

    insta::assert_json_snapshot!(requests.last().body, @r#"
    {
      "model": "mistralai/mistral-large",
      "messages": [
        {
          "role": "system",
          "content": "Be brief."
        },
        {
          "role": "user",
          "content": "Hi"
        }
      ]
    }
    "#);
}

#[tokio::test]
async fn attribution_headers() {
    let mock = OpenRouterMock::new();
    let requests = mock.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(mock).await;

    let server = builder.build("").await;
    let llm = server.llm_client("/ai");

    llm.completions(json!({
        "model": "openai/gpt-4o",
        "messages": [{ "role": "user", "content": "Hi" }],
        "max_tokens": 10
    }))
    .await;

    let request = requests.last();

    assert_eq!(request.header("authorization"), Some("Bearer test-key"));
    assert_eq!(request.header("http-referer"), Some("https://api-gateway.local"));
    assert_eq!(request.header("x-title"), Some("API Gateway"));
    assert_eq!(request.body["max_tokens"], 10);
}

#[tokio::test]
async fn sparse_upstream_response_is_normalized() {
    let upstream = json!({
        "model": "deepseek/deepseek-chat",
        "choices": [
            { "index": 3, "message": { "role": "assistant", "content": null } },
            { "index": 7, "message": { "content": "second" }, "finish_reason": "length" }
        ]
    });

    let mut builder = TestServer::builder();
    builder.spawn_llm(OpenRouterMock::new().with_response(upstream)).await;

    let server = builder.build("").await;
    let llm = server.llm_client("/ai");

    let body = llm
        .completions(json!({
            "model": "deepseek/deepseek-chat",
            "messages": [{ "role": "user", "content": "Hi" }]
        }))
        .await;

    assert!(body["id"].as_str().unwrap().starts_with("chatcmpl-"));
    assert!(body["created"].as_u64().unwrap() > 0);
    assert!(body.get("usage").is_none());

    insta::assert_json_snapshot!(body["choices"], @r#"
    [
      {
        "index": 0,
        "message": {
          "role": "assistant",
          "content": ""
        },
        "finish_reason": "stop"
      },
      {
        "index": 1,
        "message": {
          "role": "assistant",
          "content": "second"
        },
        "finish_reason": "length"
      }
    ]
    "#);
}
