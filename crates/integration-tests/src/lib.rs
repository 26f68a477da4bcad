//! Test harness running the real gateway against mock upstream providers.

pub mod llms;

use std::net::SocketAddr;

use config::Config;
use llms::{LlmClient, TestLlmProvider};
use tokio::net::TcpListener;

/// Test client for making HTTP requests to the test server
#[derive(Clone)]
pub struct TestClient {
    base_url: String,
    client: reqwest::Client,
}

impl TestClient {
    /// Create a new test client for the given base URL
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Start a request to the given path, for tests that need custom headers or bodies
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    /// Send a POST request to the given path with JSON body
    pub async fn post(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await
            .unwrap()
    }

    /// Send a GET request to the given path
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.request(reqwest::Method::GET, path).send().await.unwrap()
    }
}

/// Collects mock providers before starting the gateway.
#[derive(Default)]
pub struct TestServerBuilder {
    provider_config: String,
}

impl TestServerBuilder {
    /// Start a mock provider and point the gateway configuration at it.
    pub async fn spawn_llm(&mut self, provider: impl TestLlmProvider) {
        let config = provider.spawn().await.unwrap();

        self.provider_config.push('\n');
        self.provider_config.push_str(&config.generate_config());
    }

    /// Start the gateway with the given TOML configuration plus the spawned providers.
    pub async fn build(self, config_toml: &str) -> TestServer {
        let config_toml = format!("{config_toml}\n{}", self.provider_config);
        let config: Config = config_toml.parse().unwrap();

        config.validate().unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            if let Err(e) = server::serve_listener(listener, config).await {
                eprintln!("Server failed: {e}");
            }
        });

        TestServer {
            client: TestClient::new(format!("http://{address}")),
            address,
            handle,
        }
    }
}

/// Test server that manages the lifecycle of a server instance
pub struct TestServer {
    pub client: TestClient,
    pub address: SocketAddr,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Builder for a server with mock providers.
    pub fn builder() -> TestServerBuilder {
        TestServerBuilder::default()
    }

    /// Start a new test server with the given TOML configuration and no providers
    pub async fn start(config_toml: &str) -> Self {
        Self::builder().build(config_toml).await
    }

    /// Client for the chat endpoints mounted at `path`.
    pub fn llm_client(&self, path: &str) -> LlmClient {
        LlmClient::new(self.client.clone(), path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
