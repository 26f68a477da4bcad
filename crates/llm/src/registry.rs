//! Lazily built provider instances and model routing.

use std::sync::Arc;

use config::LlmConfig;
use tokio::sync::OnceCell;

use crate::{
    error::LlmError,
    provider::{
        Provider,
        anthropic::{self, AnthropicProvider},
        openrouter::{self, OpenRouterProvider},
    },
};

/// Where a request goes: the provider and the model id to send upstream.
pub(crate) struct Route {
    pub(crate) provider: Arc<dyn Provider>,
    pub(crate) model: String,
}

/// Holds at most one instance per provider kind.
///
/// An instance is created on first use, and only when its credential is set.
/// Concurrent first uses wait for the same initialization.
pub(crate) struct ProviderRegistry {
    config: LlmConfig,
    anthropic: OnceCell<Arc<dyn Provider>>,
    openrouter: OnceCell<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            anthropic: OnceCell::new(),
            openrouter: OnceCell::new(),
        }
    }

    /// The Anthropic provider, `None` if it has no API key.
    pub async fn anthropic(&self) -> crate::Result<Option<Arc<dyn Provider>>> {
        let Some(config) = self.config.anthropic() else {
            return Ok(None);
        };

        let provider = self
            .anthropic
            .get_or_try_init(|| async {
                log::debug!("Initializing Anthropic provider");
                let provider = AnthropicProvider::new(config, self.config.timeout)?;

                Ok::<_, LlmError>(Arc::new(provider) as Arc<dyn Provider>)
            })
            .await?;

        Ok(Some(provider.clone()))
    }

    /// The OpenRouter provider, `None` if it has no API key.
    pub async fn openrouter(&self) -> crate::Result<Option<Arc<dyn Provider>>> {
        let Some(config) = self.config.openrouter() else {
            return Ok(None);
        };

        let provider = self
            .openrouter
            .get_or_try_init(|| async {
                log::debug!("Initializing OpenRouter provider");
                let provider = OpenRouterProvider::new(config, self.config.timeout)?;

                Ok::<_, LlmError>(Arc::new(provider) as Arc<dyn Provider>)
            })
            .await?;

        Ok(Some(provider.clone()))
    }

    /// All configured providers, Anthropic first.
    pub async fn configured(&self) -> crate::Result<Vec<Arc<dyn Provider>>> {
        let anthropic = self.anthropic().await?;
        let openrouter = self.openrouter().await?;

        Ok(anthropic.into_iter().chain(openrouter).collect())
    }

    /// Pick the provider for a model.
    ///
    /// Claude models prefer the native Anthropic API and fall back to
    /// OpenRouter under the `anthropic/` namespace. Everything else goes to
    /// OpenRouter.
    pub async fn resolve(&self, model: &str) -> crate::Result<Route> {
        if anthropic::is_native_model(model) {
            if let Some(provider) = self.anthropic().await? {
                return Ok(Route {
                    provider,
                    model: model.to_string(),
                });
            }

            if let Some(provider) = self.openrouter().await? {
                let alias = openrouter::claude_alias(model);
                log::debug!("Anthropic is not configured, routing {model} to OpenRouter as {alias}");

                return Ok(Route { provider, model: alias });
            }

            return Err(LlmError::ServiceUnavailable(format!(
                "no provider configured for model '{model}', set an Anthropic or OpenRouter API key"
            )));
        }

        match self.openrouter().await? {
            Some(provider) => Ok(Route {
                provider,
                model: model.to_string(),
            }),
            None => Err(LlmError::ServiceUnavailable(format!(
                "no provider configured for model '{model}', set an OpenRouter API key"
            ))),
        }
    }
}
