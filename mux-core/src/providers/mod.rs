//! Vendor adapters behind one completion interface.
//!
//! Each adapter resolves its credential when constructed, speaks its
//! vendor's HTTP API directly and prices the call from the usage the vendor
//! reports.

pub mod anthropic;
pub mod google;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use google::GoogleProvider;
pub use openai::OpenAiProvider;

use crate::cost::{CostCalculator, ModelPricing};
use crate::error::{MuxError, Result};
use crate::models::{self, ProviderKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

const COMPLETION_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    /// Vendor-specific parameters merged into the request body.
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            system_prompt: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            extra: Map::new(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub text: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cached_tokens: u64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelDescription {
    pub provider: ProviderKind,
    pub model: String,
    pub display_name: String,
    pub context_window: Option<u32>,
    pub pricing: Option<ModelPricing>,
}

#[async_trait]
pub trait Provider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn complete(&self, request: &CompletionRequest) -> Result<ProviderResponse>;

    /// Run [`complete`](Provider::complete) to completion on a private
    /// current-thread runtime. Must not be called from inside a runtime.
    fn complete_blocking(&self, request: &CompletionRequest) -> Result<ProviderResponse> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.complete(request))
    }

    fn describe_model(&self, model: &str) -> ModelDescription;
}

/// First non-empty of the explicit key and the environment value.
pub fn resolve_credential(
    explicit: Option<String>,
    env_value: Option<String>,
    provider: ProviderKind,
) -> Result<String> {
    explicit
        .filter(|key| !key.trim().is_empty())
        .or_else(|| env_value.filter(|key| !key.trim().is_empty()))
        .ok_or(MuxError::MissingCredential {
            provider,
            env_var: provider.env_var(),
        })
}

fn credential_from_env(explicit: Option<String>, provider: ProviderKind) -> Result<String> {
    resolve_credential(explicit, std::env::var(provider.env_var()).ok(), provider)
}

/// Adapter for `kind`, with the key taken from `api_key` or the environment.
pub fn build_provider(
    kind: ProviderKind,
    api_key: Option<String>,
    pricing: Arc<CostCalculator>,
) -> Result<Arc<dyn Provider>> {
    Ok(match kind {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(api_key, pricing)?),
        ProviderKind::Google => Arc::new(GoogleProvider::new(api_key, pricing)?),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(api_key, pricing)?),
    })
}

/// Shared by all adapters. Idle connections are not pooled: a client may be
/// driven by several short-lived runtimes in turn.
fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(COMPLETION_TIMEOUT)
        .pool_max_idle_per_host(0)
        .build()?)
}

async fn send_json(provider: ProviderKind, request: reqwest::RequestBuilder, body: &Value) -> Result<Value> {
    let response = request.json(body).send().await?;
    let status = response.status();
    if !status.is_success() {
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(MuxError::provider(
            provider,
            Some(status.as_u16()),
            format!("{}: {}", status.as_u16(), text),
        ));
    }
    Ok(response.json().await?)
}

fn parse_body<T: serde::de::DeserializeOwned>(provider: ProviderKind, body: Value) -> Result<T> {
    serde_json::from_value(body)
        .map_err(|err| MuxError::provider(provider, None, format!("unexpected response shape: {}", err)))
}

fn describe(
    provider: ProviderKind,
    model: &str,
    pricing: &CostCalculator,
    context_window: Option<u32>,
) -> ModelDescription {
    let info = models::model_info(model);
    ModelDescription {
        provider,
        model: model.to_string(),
        display_name: models::display_name(model).to_string(),
        context_window: info.map(|m| m.context_window).or(context_window),
        pricing: pricing
            .pricing_table()
            .get_model_pricing(provider.as_str(), model)
            .map(|resolved| resolved.pricing),
    }
}
