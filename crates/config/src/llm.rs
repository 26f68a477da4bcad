//! Configuration for the AI chat gateway and its upstream providers.

use std::{borrow::Cow, time::Duration};

use duration_str::deserialize_duration;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::rate_limit::RateLimitConfig;

/// Model used when a chat request leaves `model` empty.
const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

/// AI chat gateway configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmConfig {
    /// Whether the chat gateway endpoints are exposed.
    enabled: bool,

    /// The path where the chat gateway endpoints are mounted.
    pub path: Cow<'static, str>,

    /// Model id substituted when a request does not name one.
    pub default_model: String,

    /// Upper bound for a single upstream call, streaming or not.
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,

    /// Anthropic Messages API settings.
    pub anthropic: Option<AnthropicConfig>,

    /// OpenRouter chat completions API settings.
    pub openrouter: Option<OpenRouterConfig>,

    /// Request throttling for the completion endpoint.
    pub rate_limits: RateLimitConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: Cow::Borrowed("/ai"),
            default_model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
            anthropic: None,
            openrouter: None,
            rate_limits: RateLimitConfig::default(),
        }
    }
}

impl LlmConfig {
    /// Whether the chat gateway is enabled.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// The Anthropic settings, if a non-empty credential is configured.
    pub fn anthropic(&self) -> Option<&AnthropicConfig> {
        self.anthropic.as_ref().filter(|config| has_credential(&config.api_key))
    }

    /// The OpenRouter settings, if a non-empty credential is configured.
    pub fn openrouter(&self) -> Option<&OpenRouterConfig> {
        self.openrouter.as_ref().filter(|config| has_credential(&config.api_key))
    }

    /// Whether at least one upstream provider has a usable credential.
    pub fn has_providers(&self) -> bool {
        self.anthropic().is_some() || self.openrouter().is_some()
    }
}

/// Anthropic Messages API settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// API key sent in the `x-api-key` header. Empty or missing disables the provider.
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Custom base URL for the API, e.g. a local mock.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// OpenRouter chat completions API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenRouterConfig {
    /// Bearer token. Empty or missing disables the provider.
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Custom base URL for the API, e.g. a local mock.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Value of the `HTTP-Referer` attribution header.
    #[serde(default = "default_referer")]
    pub referer: String,

    /// Value of the `X-Title` attribution header.
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            referer: default_referer(),
            title: default_title(),
        }
    }
}

fn default_referer() -> String {
    "https://api-gateway.local".to_string()
}

fn default_title() -> String {
    "API Gateway".to_string()
}

fn has_credential(api_key: &Option<SecretString>) -> bool {
    api_key
        .as_ref()
        .is_some_and(|key| !key.expose_secret().trim().is_empty())
}
