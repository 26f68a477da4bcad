use std::{net::IpAddr, sync::Arc};

use config::LlmConfig;
use rate_limit::{RateLimitManager, RateLimitRequest};

use crate::{
    messages::{ChatCompletionRequest, ChatCompletionResponse, ModelsResponse, ObjectType},
    provider::ChatCompletionStream,
    registry::{ProviderRegistry, Route},
};

#[derive(Clone)]
pub(crate) struct LlmServer {
    shared: Arc<LlmServerInner>,
}

struct LlmServerInner {
    registry: ProviderRegistry,
    rate_limits: RateLimitManager,
    default_model: String,
}

impl LlmServer {
    pub fn new(config: LlmConfig) -> Self {
        if !config.has_providers() {
            log::warn!("No LLM provider is configured, chat completions will return 503");
        }

        let rate_limits = RateLimitManager::new(config.rate_limits.clone());
        let default_model = config.default_model.clone();

        Self {
            shared: Arc::new(LlmServerInner {
                registry: ProviderRegistry::new(config),
                rate_limits,
                default_model,
            }),
        }
    }

    /// Reject the request early when the client is over its quota.
    pub async fn check_rate_limit(&self, ip: Option<IpAddr>) -> crate::Result<()> {
        if !self.shared.rate_limits.is_enabled() {
            return Ok(());
        }

        let request = match ip {
            Some(ip) => RateLimitRequest::builder().ip(ip).build(),
            None => RateLimitRequest::default(),
        };

        self.shared.rate_limits.check_request(&request).await?;

        Ok(())
    }

    /// Process a chat completion request.
    pub async fn completions(&self, request: ChatCompletionRequest) -> crate::Result<ChatCompletionResponse> {
        let (route, request) = self.route(request).await?;
        let requested_model = request.model.clone();

        log::debug!("Routing {requested_model} to {}", route.provider.name());

        let mut response = route.provider.chat_completion(route.upstream(request)).await?;

        // Clients see the model they asked for, not the upstream alias.
        response.model = requested_model;

        Ok(response)
    }

    /// Process a streaming chat completion request.
    ///
    /// Upstream errors before the first byte are returned here, so the client
    /// still gets a regular error response.
    pub async fn completions_stream(&self, request: ChatCompletionRequest) -> crate::Result<ChatCompletionStream> {
        let (route, request) = self.route(request).await?;

        log::debug!("Streaming {} from {}", request.model, route.provider.name());

        route.provider.chat_completion_stream(route.upstream(request)).await
    }

    /// The union of the catalogs of all configured providers.
    pub async fn list_models(&self) -> crate::Result<ModelsResponse> {
        let providers = self.shared.registry.configured().await?;

        let data = providers
            .iter()
            .flat_map(|provider| provider.list_models())
            .collect();

        Ok(ModelsResponse {
            object: ObjectType::List,
            data,
        })
    }

    /// Validate the request, fill in the default model and resolve its provider.
    async fn route(&self, mut request: ChatCompletionRequest) -> crate::Result<(Route, ChatCompletionRequest)> {
        request.validate()?;

        if request.model.trim().is_empty() {
            request.model = self.shared.default_model.clone();
        }

        let route = self.shared.registry.resolve(&request.model).await?;

        Ok((route, request))
    }
}

impl Route {
    /// The request as sent upstream, with the model id of this route.
    fn upstream(&self, mut request: ChatCompletionRequest) -> ChatCompletionRequest {
        request.model = self.model.clone();
        request
    }
}
