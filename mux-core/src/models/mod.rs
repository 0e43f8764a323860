pub mod catalog;

pub use catalog::{CostTier, ModelAlias, ModelSpec, Speed, ALIASES, MODELS, PREMIUM_MODEL};

use crate::error::{MuxError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    Google,
    Anthropic,
}

impl ProviderKind {
    /// Lookup order used by [`normalize`].
    pub const ALL: [ProviderKind; 3] = [ProviderKind::OpenAi, ProviderKind::Google, ProviderKind::Anthropic];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Google => "google",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    pub fn vendor_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Google => "Google Gemini",
            ProviderKind::Anthropic => "Anthropic",
        }
    }

    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Google => "GOOGLE_AI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    /// Fraction knocked off the input price for tokens served from the
    /// vendor's prompt cache. Vendors apply one policy across their catalog.
    pub fn cache_discount(&self) -> f64 {
        match self {
            ProviderKind::OpenAi => 0.90,
            ProviderKind::Google => 0.75,
            ProviderKind::Anthropic => 0.90,
        }
    }

    /// Model whose pricing stands in for models missing from the table.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-5.2",
            ProviderKind::Google => "gemini-3-flash-preview",
            ProviderKind::Anthropic => "claude-sonnet-4-5-20250929",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = MuxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "google" | "gemini" => Ok(ProviderKind::Google),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            other => Err(MuxError::InvalidInput(format!("unknown provider: {}", other))),
        }
    }
}

/// Resolve a user-facing model name or alias to `(provider, canonical id)`.
///
/// Providers are searched in [`ProviderKind::ALL`] order, canonical names
/// before aliases within each provider.
pub fn normalize(name: &str) -> Result<(ProviderKind, &'static str)> {
    for provider in ProviderKind::ALL {
        if let Some(spec) = MODELS.iter().find(|m| m.provider == provider && m.id == name) {
            return Ok((provider, spec.id));
        }
        if let Some(alias) = ALIASES.iter().find(|a| a.provider == provider && a.alias == name) {
            let target = MODELS
                .iter()
                .find(|m| m.provider == provider && m.id == alias.target)
                .ok_or_else(|| MuxError::UnknownModel(name.to_string()))?;
            return Ok((provider, target.id));
        }
    }
    Err(MuxError::UnknownModel(name.to_string()))
}

pub fn provider_for_model(name: &str) -> Option<ProviderKind> {
    normalize(name).ok().map(|(provider, _)| provider)
}

/// Catalog entry for a canonical model id.
pub fn model_info(canonical: &str) -> Option<&'static ModelSpec> {
    MODELS.iter().find(|m| m.id == canonical)
}

pub fn display_name(canonical: &str) -> &str {
    model_info(canonical).map(|m| m.display_name).unwrap_or(canonical)
}

pub fn list_models(provider: ProviderKind) -> Vec<&'static str> {
    MODELS
        .iter()
        .filter(|m| m.provider == provider)
        .map(|m| m.id)
        .collect()
}

pub fn list_aliases() -> &'static [ModelAlias] {
    ALIASES
}

/// True when `name` resolves to the premium tier.
pub fn is_premium(name: &str) -> bool {
    name == PREMIUM_MODEL || matches!(normalize(name), Ok((_, id)) if id == PREMIUM_MODEL)
}
