use super::{
    credential_from_env, describe, http_client, parse_body, send_json, CompletionRequest, ModelDescription,
    Provider, ProviderResponse, DEFAULT_SYSTEM_PROMPT,
};
use crate::cost::CostCalculator;
use crate::error::Result;
use crate::log_provider;
use crate::models::ProviderKind;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
    #[serde(default)]
    cache_read_input_tokens: Option<u64>,
    #[serde(default)]
    cache_creation_input_tokens: Option<u64>,
}

impl Usage {
    /// `input_tokens` excludes cache reads and writes; fold them back in so
    /// cached tokens are a subset of the input.
    fn total_input_tokens(&self) -> u64 {
        self.input_tokens
            .saturating_add(self.cache_read_input_tokens.unwrap_or(0))
            .saturating_add(self.cache_creation_input_tokens.unwrap_or(0))
    }
}

pub struct AnthropicProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    pricing: Arc<CostCalculator>,
}

impl AnthropicProvider {
    pub fn new(api_key: Option<String>, pricing: Arc<CostCalculator>) -> Result<Self> {
        Ok(Self {
            api_key: credential_from_env(api_key, ProviderKind::Anthropic)?,
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
            "max_tokens".into(),
            json!(request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
        );
        body.insert("messages".into(), json!([{"role": "user", "content": request.prompt}]));
        body.insert("system".into(), json!(system_prompt));
        body.insert("temperature".into(), json!(request.temperature));
        body.extend(request.extra.clone());
        Value::Object(body)
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<ProviderResponse> {
        let url = format!("{}/messages", self.base_url);
        log_provider!(debug, self.kind(), model = %request.model, "sending message");

        let http = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION);
        let body = send_json(self.kind(), http, &Self::request_body(request)).await?;
        let response: MessagesResponse = parse_body(self.kind(), body)?;

        let text: String = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        let usage = response.usage.unwrap_or_default();
        let input_tokens = usage.total_input_tokens();
        let cached_tokens = usage.cache_read_input_tokens.unwrap_or(0);
        let cost = self.pricing.estimate_for_provider(
            self.kind(),
            &request.model,
            input_tokens,
            usage.output_tokens,
            cached_tokens,
        )?;

        Ok(ProviderResponse {
            text,
            model: request.model.clone(),
            input_tokens,
            output_tokens: usage.output_tokens,
            cached_tokens,
            cost,
        })
    }

    fn describe_model(&self, model: &str) -> ModelDescription {
        describe(self.kind(), model, &self.pricing, Some(200_000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_max_tokens_and_system() {
        let body = AnthropicProvider::request_body(&CompletionRequest::new("hi", "claude-3-haiku-20240307"));
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["system"], DEFAULT_SYSTEM_PROMPT);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["temperature"], 0.7);
    }

    #[test]
    fn test_text_blocks_only() {
        let response: MessagesResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Hello, "},
                {"type": "tool_use", "id": "x", "name": "y", "input": {}},
                {"type": "text", "text": "world"}
            ],
            "usage": {"input_tokens": 5, "output_tokens": 3}
        }))
        .unwrap();
        let text: String = response
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect();
        assert_eq!(text, "Hello, world");
    }

    #[test]
    fn test_cache_counts_fold_into_input() {
        let usage: Usage = serde_json::from_value(json!({
            "input_tokens": 50,
            "output_tokens": 0,
            "cache_read_input_tokens": 100_000,
            "cache_creation_input_tokens": 25
        }))
        .unwrap();
        assert_eq!(usage.total_input_tokens(), 100_075);

        let plain: Usage = serde_json::from_value(json!({"input_tokens": 7, "output_tokens": 1})).unwrap();
        assert_eq!(plain.total_input_tokens(), 7);
    }
}
