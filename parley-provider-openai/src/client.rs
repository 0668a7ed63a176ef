//! Chat Completions client, builder and [`Provider`] implementation.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use futures::StreamExt;
use parley::{
    ActionRegistry, ConversionError, DeltaAccumulator, GenerationResponse, LiveSink, Message,
    Provider, ProviderError,
};

use crate::error::{map_http_status, map_reqwest_error};
use crate::mapping;
use crate::streaming::parse_sse_stream;
use crate::types::{ChatCompletionMessage, ChatCompletionRequest};

/// Model sent when none is configured.
const DEFAULT_MODEL: &str = "gpt-4o";

/// OpenAI API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Limit on one request, body stream included, unless overridden.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Azure API version used when `AZURE_OPENAI_VERSION` is unset.
const DEFAULT_AZURE_API_VERSION: &str = "2025-02-01-preview";

/// An Azure OpenAI deployment target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AzureDeployment {
    pub(crate) deployment: String,
    pub(crate) api_version: String,
}

/// Streaming client for OpenAI-compatible chat completions.
///
/// Works against api.openai.com, compatible proxies, and Azure OpenAI
/// deployments (see [`azure`](Self::azure)). The client owns the action
/// registry it advertises as `tools`.
///
/// # Example
///
/// ```no_run
/// use parley_provider_openai::OpenAi;
///
/// let client = OpenAi::new("sk-...")
///     .model("gpt-4o-mini")
///     .organization("org-...");
/// ```
pub struct OpenAi {
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) organization: Option<String>,
    pub(crate) azure: Option<AzureDeployment>,
    pub(crate) timeout: Duration,
    actions: ActionRegistry,
    client: reqwest::Client,
}

impl OpenAi {
    /// Create a client for api.openai.com with default model `gpt-4o`.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
            organization: None,
            azure: None,
            timeout: DEFAULT_TIMEOUT,
            actions: ActionRegistry::new(),
            client: reqwest::Client::new(),
        }
    }

    /// Configure from `OPENAI_API_KEY` and the optional `OPENAI_BASE_URL`,
    /// `OPENAI_MODEL` and `OPENAI_ORGANIZATION`.
    pub fn from_env() -> Result<Self, ProviderError> {
        let mut client = Self::new(required_env("OPENAI_API_KEY")?);
        if let Some(url) = optional_env("OPENAI_BASE_URL") {
            client = client.base_url(url);
        }
        if let Some(model) = optional_env("OPENAI_MODEL") {
            client = client.model(model);
        }
        if let Some(org) = optional_env("OPENAI_ORGANIZATION") {
            client = client.organization(org);
        }
        Ok(client)
    }

    /// Configure an Azure deployment from `AZURE_OPENAI_API_KEY`,
    /// `AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_DEPLOYMENT` and the optional
    /// `AZURE_OPENAI_VERSION`.
    pub fn azure_from_env(model: impl Into<String>) -> Result<Self, ProviderError> {
        let api_key = required_env("AZURE_OPENAI_API_KEY")?;
        let endpoint = required_env("AZURE_OPENAI_ENDPOINT")?;
        let deployment = required_env("AZURE_OPENAI_DEPLOYMENT")?;
        let api_version = optional_env("AZURE_OPENAI_VERSION")
            .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string());
        Ok(Self::new(api_key)
            .model(model)
            .base_url(endpoint)
            .azure(deployment, api_version))
    }

    /// Set the model sent with every request.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the base URL, e.g. for a proxy or a mock server.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Send `OpenAI-Organization` with every request.
    #[must_use]
    pub fn organization(mut self, org: impl Into<String>) -> Self {
        self.organization = Some(org.into());
        self
    }

    /// Target an Azure OpenAI deployment.
    ///
    /// Requests go to `{base}/openai/deployments/{deployment}/chat/completions`
    /// and authenticate with the `api-key` header.
    #[must_use]
    pub fn azure(mut self, deployment: impl Into<String>, api_version: impl Into<String>) -> Self {
        self.azure = Some(AzureDeployment {
            deployment: deployment.into(),
            api_version: api_version.into(),
        });
        self
    }

    /// Replace the advertised actions.
    #[must_use]
    pub fn with_actions(mut self, registry: ActionRegistry) -> Self {
        self.actions = registry;
        self
    }

    /// Limit each request, from sending until the last streamed byte.
    ///
    /// Applied per request, so it takes precedence over any timeout set on
    /// the HTTP client.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a preconfigured HTTP client (proxies, TLS, pooling).
    #[must_use]
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub(crate) fn completions_url(&self) -> String {
        match &self.azure {
            Some(azure) => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.base_url, azure.deployment, azure.api_version
            ),
            None => format!("{}/v1/chat/completions", self.base_url),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.azure.is_some() {
            return request.header("api-key", &self.api_key);
        }
        let request = request.bearer_auth(&self.api_key);
        match &self.organization {
            Some(org) => request.header("OpenAI-Organization", org),
            None => request,
        }
    }
}

impl fmt::Debug for OpenAi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAi")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("organization", &self.organization)
            .field("azure", &self.azure)
            .field("timeout", &self.timeout)
            .field("actions", &self.actions)
            .finish_non_exhaustive()
    }
}

impl Provider for OpenAi {
    type Native = ChatCompletionMessage;

    fn prompt<'a>(
        &'a self,
        history: &'a [ChatCompletionMessage],
        sink: Option<&'a mut dyn LiveSink>,
    ) -> impl Future<Output = Result<GenerationResponse, ProviderError>> + Send + 'a {
        async move {
            let url = self.completions_url();
            let body = ChatCompletionRequest {
                model: &self.model,
                messages: history,
                stream: true,
                tools: mapping::tool_specs(&self.actions),
            };

            tracing::debug!(
                url = %url,
                model = %self.model,
                messages = history.len(),
                tools = body.tools.len(),
                "sending chat completion request"
            );

            let timeout = self.timeout;
            let response = self
                .authorize(self.client.post(&url))
                .timeout(timeout)
                .json(&body)
                .send()
                .await
                .map_err(|e| map_reqwest_error(e, timeout))?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                tracing::debug!(status = %status, "chat completion request rejected");
                return Err(map_http_status(status, &text));
            }

            let bytes = response
                .bytes_stream()
                .map(move |chunk| chunk.map_err(|e| map_reqwest_error(e, timeout)));
            DeltaAccumulator::new(sink)
                .collect(parse_sse_stream(bytes))
                .await
        }
    }

    fn from_message(&self, message: &Message) -> ChatCompletionMessage {
        mapping::from_message(message)
    }

    fn to_message(&self, native: &ChatCompletionMessage) -> Result<Message, ConversionError> {
        mapping::to_message(native)
    }

    fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    fn actions_mut(&mut self) -> &mut ActionRegistry {
        &mut self.actions
    }
}

fn required_env(name: &str) -> Result<String, ProviderError> {
    optional_env(name)
        .ok_or_else(|| ProviderError::InvalidRequest(format!("environment variable {name} is not set")))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
