use std::{future::Future, net::SocketAddr};

use indoc::formatdoc;

#[derive(Clone, Debug, Copy)]
pub enum ProviderType {
    Anthropic,
    OpenRouter,
}

/// Address and kind of a running mock provider.
pub struct LlmProviderConfig {
    pub address: SocketAddr,
    pub provider_type: ProviderType,
}

impl LlmProviderConfig {
    /// The gateway configuration section pointing at this mock.
    pub fn generate_config(&self) -> String {
        let (section, base_url_path) = match self.provider_type {
            ProviderType::Anthropic => ("anthropic", "/v1"),
            ProviderType::OpenRouter => ("openrouter", ""),
        };

        formatdoc! {r#"
            [llm.{section}]
            api_key = "test-key"
            base_url = "http://{address}{base_url_path}"
        "#, section = section, address = self.address, base_url_path = base_url_path}
    }
}

/// Trait for test LLM providers
pub trait TestLlmProvider: Send + 'static {
    /// Start the mock server and return its configuration
    fn spawn(self) -> impl Future<Output = anyhow::Result<LlmProviderConfig>> + Send;
}
