use super::{
    credential_from_env, describe, http_client, parse_body, send_json, CompletionRequest, ModelDescription,
    Provider, ProviderResponse, DEFAULT_SYSTEM_PROMPT,
};
use crate::cost::CostCalculator;
use crate::error::{MuxError, Result};
use crate::log_provider;
use crate::models::ProviderKind;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    prompt_tokens_details: Option<PromptTokensDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct PromptTokensDetails {
    #[serde(default)]
    cached_tokens: u64,
}

pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    pricing: Arc<CostCalculator>,
}

impl OpenAiProvider {
    pub fn new(api_key: Option<String>, pricing: Arc<CostCalculator>) -> Result<Self> {
        Ok(Self {
            api_key: credential_from_env(api_key, ProviderKind::OpenAi)?,
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
        let system_prompt = request
            .system_prompt
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);

        let mut body = Map::new();
        body.insert("model".into(), json!(request.model));
        body.insert(
            "messages".into(),
            json!([
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": request.prompt},
            ]),
        );
        // The gpt-5 family rejects a temperature parameter.
        if !request.model.starts_with("gpt-5") {
            body.insert("temperature".into(), json!(request.temperature));
        }
        if let Some(max_tokens) = request.max_tokens {
            body.insert("max_tokens".into(), json!(max_tokens));
        }
        body.extend(request.extra.clone());
        Value::Object(body)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<ProviderResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        log_provider!(debug, self.kind(), model = %request.model, "sending chat completion");

        let http = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key));
        let body = send_json(self.kind(), http, &Self::request_body(request)).await?;
        let completion: ChatCompletion = parse_body(self.kind(), body)?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| MuxError::provider(self.kind(), None, "response contained no choices"))?;

        let usage = completion.usage.unwrap_or_default();
        let cached_tokens = usage.prompt_tokens_details.map_or(0, |d| d.cached_tokens);
        let cost = self.pricing.estimate_for_provider(
            self.kind(),
            &request.model,
            usage.prompt_tokens,
            usage.completion_tokens,
            cached_tokens,
        )?;

        Ok(ProviderResponse {
            text,
            model: request.model.clone(),
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            cached_tokens,
            cost,
        })
    }

    fn describe_model(&self, model: &str) -> ModelDescription {
        let context_window = if model.starts_with("gpt-5") { 128_000 } else { 8_192 };
        describe(self.kind(), model, &self.pricing, Some(context_window))
    }
}
