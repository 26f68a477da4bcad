use indoc::indoc;
use integration_tests::{
    TestServer,
    llms::{AnthropicMock, OpenRouterMock},
};
use serde_json::json;

fn hello(model: &str) -> serde_json::Value {
    json!({
        "model": model,
        "messages": [{ "role": "user", "content": "Hello!" }]
    })
}

#[tokio::test]
async fn claude_prefers_anthropic() {
    let anthropic = AnthropicMock::new();
    let openrouter = OpenRouterMock::new();

    let anthropic_requests = anthropic.requests();
    let openrouter_requests = openrouter.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(anthropic).await;
    builder.spawn_llm(openrouter).await;

    let server = builder.build("").await;
    let llm = server.llm_client("/ai");

    let body = llm.completions(hello("claude-haiku-4-5-20251001")).await;

    assert_eq!(body["model"], "claude-haiku-4-5-20251001");
    assert_eq!(anthropic_requests.len(), 1);
    assert!(openrouter_requests.is_empty());
}

#[tokio::test]
async fn claude_falls_back_to_openrouter() {
    let openrouter = OpenRouterMock::new();
    let requests = openrouter.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(openrouter).await;

    let server = builder.build("").await;
    let llm = server.llm_client("/ai");

    let body = llm.completions(hello("claude-haiku-4-5-20251001")).await;

    assert_eq!(requests.last().body["model"], "anthropic/claude-haiku-4-5-20251001");

    // The client sees the model it asked for.
    assert_eq!(body["model"], "claude-haiku-4-5-20251001");
}

#[tokio::test]
async fn namespaced_models_go_to_openrouter() {
    let anthropic = AnthropicMock::new();
    let openrouter = OpenRouterMock::new();

    let anthropic_requests = anthropic.requests();
    let openrouter_requests = openrouter.requests();

    let mut builder = TestServer::builder();
    builder.spawn_llm(anthropic).await;
    builder.spawn_llm(openrouter).await;

    let server = builder.build("").await;
    let llm = server.llm_client("/ai");

    llm.completions(hello("openai/gpt-4o")).await;
    llm.completions(hello("anthropic/claude-haiku-4-5-20251001")).await;

    assert!(anthropic_requests.is_empty());
    assert_eq!(openrouter_requests.len(), 2);
    assert_eq!(openrouter_requests.last().body["model"], "anthropic/claude-haiku-4-5-20251001");
}

#[tokio::test]
async fn list_models_from_all_providers() {
    let mut builder = TestServer::builder();
    builder.spawn_llm(OpenRouterMock::new()).await;
    builder.spawn_llm(AnthropicMock::new()).await;

    let server = builder.build("").await;
    let llm = server.llm_client("/ai");

    let body = llm.list_models().await;

    insta::assert_json_snapshot!(body, @r#"
    {
      "object": "list",
      "data": [
        {
          "id": "claude-opus-4-5-20251101",
          "object": "model",
          "owned_by": "anthropic"
        },
        {
          "id": "claude-sonnet-4-5-20250929",
          "object": "model",
          "owned_by": "anthropic"
        },
        {
          "id": "claude-haiku-4-5-20251001",
          "object": "model",
          "owned_by": "anthropic"
        },
        {
          "id": "openai/gpt-4o",
          "object": "model",
          "owned_by": "openai"
        }
      ]
    }
    "#);
}

#[tokio::test]
async fn list_models_only_shows_configured_providers() {
    let mut builder = TestServer::builder();
    builder.spawn_llm(OpenRouterMock::new()).await;

    let server = builder.build("").await;
    let body = server.llm_client("/ai").list_models().await;

    let ids: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|model| model["id"].as_str().unwrap())
        .collect();

    assert_eq!(ids, ["openai/gpt-4o"]);
}

#[tokio::test]
async fn list_models_without_providers() {
    let server = TestServer::start("").await;
    let body = server.llm_client("/ai").list_models().await;

    insta::assert_json_snapshot!(body, @r#"
    {
      "object": "list",
      "data": []
    }
    "#);
}

#[tokio::test]
async fn custom_path() {
    let mut builder = TestServer::builder();
    builder.spawn_llm(AnthropicMock::new()).await;

    let config = indoc! {r#"
        [llm]
        path = "/gateway/"
    "#};

    let server = builder.build(config).await;

    let body = server
        .llm_client("/gateway")
        .completions(hello("claude-haiku-4-5-20251001"))
        .await;

    assert_eq!(body["object"], "chat.completion");

    let response = server.client.get("/ai/v1/models").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn root_path() {
    let mut builder = TestServer::builder();
    builder.spawn_llm(AnthropicMock::new()).await;

    let config = indoc! {r#"
        [llm]
        path = "/"
    "#};

    let server = builder.build(config).await;
    let body = server.llm_client("").list_models().await;

    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}
