use indoc::indoc;
use integration_tests::TestServer;
use reqwest::Method;

async fn preflight(server: &TestServer, origin: &str) -> reqwest::Response {
    server
        .client
        .request(Method::OPTIONS, "/ai/v1/chat/completions")
        .header("Origin", origin)
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .unwrap()
}

fn header<'a>(response: &'a reqwest::Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|value| value.to_str().ok())
}

#[tokio::test]
async fn default_origins_are_allowed() {
    let server = TestServer::start("").await;
    let response = preflight(&server, "http://localhost:3000").await;

    assert_eq!(response.status(), 200);
    assert_eq!(header(&response, "access-control-allow-origin"), Some("http://localhost:3000"));
    assert_eq!(header(&response, "access-control-allow-credentials"), Some("true"));
    assert_eq!(header(&response, "access-control-allow-methods"), Some("POST"));
}

#[tokio::test]
async fn unknown_origin_gets_no_cors_headers() {
    let server = TestServer::start("").await;
    let response = preflight(&server, "https://evil.example").await;

    assert_eq!(header(&response, "access-control-allow-origin"), None);
}

#[tokio::test]
async fn configured_origins() {
    let config = indoc! {r#"
        [server.cors]
        allow_origins = ["https://app.example"]
        allow_credentials = false
    "#};

    let server = TestServer::start(config).await;

    let allowed = preflight(&server, "https://app.example").await;
    assert_eq!(header(&allowed, "access-control-allow-origin"), Some("https://app.example"));
    assert_eq!(header(&allowed, "access-control-allow-credentials"), None);

    let denied = preflight(&server, "http://localhost:3000").await;
    assert_eq!(header(&denied, "access-control-allow-origin"), None);
}
