use super::{
    credential_from_env, describe, http_client, parse_body, send_json, CompletionRequest, ModelDescription,
    Provider, ProviderResponse, DEFAULT_TEMPERATURE,
};
use crate::cost::CostCalculator;
use crate::error::{MuxError, Result};
use crate::log_provider;
use crate::models::ProviderKind;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    cached_content_token_count: u64,
}

pub struct GoogleProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    pricing: Arc<CostCalculator>,
}

impl GoogleProvider {
    pub fn new(api_key: Option<String>, pricing: Arc<CostCalculator>) -> Result<Self> {
        Ok(Self {
            api_key: credential_from_env(api_key, ProviderKind::Google)?,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: http_client()?,
            pricing,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request_body(request: &CompletionRequest) -> Value {
        // No separate system role here; it rides in front of the prompt.
        let text = match request.system_prompt.as_deref().filter(|s| !s.is_empty()) {
            Some(system) => format!("{}\n\n{}", system, request.prompt),
            None => request.prompt.clone(),
        };

        let mut body = Map::new();
        body.insert("contents".into(), json!([{"role": "user", "parts": [{"text": text}]}]));

        let custom_temperature = (request.temperature - DEFAULT_TEMPERATURE).abs() > f64::EPSILON;
        if custom_temperature || request.max_tokens.is_some() || !request.extra.is_empty() {
            let mut config = Map::new();
            if custom_temperature {
                config.insert("temperature".into(), json!(request.temperature));
            }
            if let Some(max_tokens) = request.max_tokens {
                config.insert("maxOutputTokens".into(), json!(max_tokens));
            }
            config.extend(request.extra.clone());
            body.insert("generationConfig".into(), Value::Object(config));
        }
        Value::Object(body)
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<ProviderResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);
        log_provider!(debug, self.kind(), model = %request.model, "sending generateContent");

        // Header rather than query string so the key never shows up in a URL.
        let http = self.client.post(&url).header("x-goog-api-key", &self.api_key);
        let body = send_json(self.kind(), http, &Self::request_body(request)).await?;
        let response: GenerateContentResponse = parse_body(self.kind(), body)?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
            .ok_or_else(|| MuxError::provider(self.kind(), None, "response contained no candidates"))?;

        let usage = response.usage_metadata.unwrap_or_default();
        let cost = self.pricing.estimate_for_provider(
            self.kind(),
            &request.model,
            usage.prompt_token_count,
            usage.candidates_token_count,
            usage.cached_content_token_count,
        )?;

        Ok(ProviderResponse {
            text,
            model: request.model.clone(),
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
            cached_tokens: usage.cached_content_token_count,
            cost,
        })
    }

    fn describe_model(&self, model: &str) -> ModelDescription {
        describe(self.kind(), model, &self.pricing, Some(1_000_000))
    }
}
