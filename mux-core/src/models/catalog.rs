/// Static model registry

use super::ProviderKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speed {
    Fast,
    Medium,
    Slow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostTier {
    Low,
    Medium,
    High,
}

impl Speed {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speed::Fast => "fast",
            Speed::Medium => "medium",
            Speed::Slow => "slow",
        }
    }
}

impl CostTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostTier::Low => "low",
            CostTier::Medium => "medium",
            CostTier::High => "high",
        }
    }
}

/// A canonical model as the vendor's API names it.
#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    pub provider: ProviderKind,
    pub id: &'static str,
    pub display_name: &'static str,
    pub speed: Speed,
    pub cost_tier: CostTier,
    pub context_window: u32,
    pub description: &'static str,
}

/// User-facing shorthand pointing at a canonical id of the same provider.
#[derive(Debug, Clone, Copy)]
pub struct ModelAlias {
    pub provider: ProviderKind,
    pub alias: &'static str,
    pub target: &'static str,
}

const fn spec(
    provider: ProviderKind,
    id: &'static str,
    display_name: &'static str,
    speed: Speed,
    cost_tier: CostTier,
    context_window: u32,
    description: &'static str,
) -> ModelSpec {
    ModelSpec {
        provider,
        id,
        display_name,
        speed,
        cost_tier,
        context_window,
        description,
    }
}

const fn alias(provider: ProviderKind, alias: &'static str, target: &'static str) -> ModelAlias {
    ModelAlias {
        provider,
        alias,
        target,
    }
}

use CostTier::{High, Low, Medium as Mid};
use ProviderKind::{Anthropic, Google, OpenAi};
use Speed::{Fast, Medium, Slow};

pub const MODELS: &[ModelSpec] = &[
    spec(OpenAi, "gpt-5.2-chat-latest", "GPT-5.2 Instant", Fast, Low, 128_000, "Fast workhorse for everyday tasks"),
    spec(OpenAi, "gpt-5.2", "GPT-5.2 Thinking", Medium, Mid, 128_000, "Thinking model for complex reasoning"),
    spec(OpenAi, "gpt-5.2-pro", "GPT-5.2 Pro", Slow, High, 128_000, "Premium model with highest quality"),
    spec(OpenAi, "gpt-4o", "GPT-4o", Medium, Mid, 128_000, "Previous generation GPT model"),
    spec(OpenAi, "gpt-4", "GPT-4", Slow, High, 8_192, "Legacy GPT-4 model"),
    spec(Google, "gemini-3-flash-preview", "Gemini 3 Flash", Fast, Low, 1_000_000, "Fast, cheap Gemini model"),
    spec(Google, "gemini-2.0-flash-exp", "Gemini 2.0 Flash (Experimental)", Fast, Low, 1_000_000, "Experimental Gemini 2.0"),
    spec(Google, "gemini-pro", "Gemini Pro", Medium, Low, 1_000_000, "Standard Gemini model"),
    spec(Anthropic, "claude-sonnet-4-5-20250929", "Claude Sonnet 4.5", Fast, Mid, 200_000, "Latest Claude Sonnet"),
    spec(Anthropic, "claude-3-5-sonnet-20241022", "Claude 3.5 Sonnet", Fast, Mid, 200_000, "Previous Claude Sonnet"),
    spec(Anthropic, "claude-3-opus-20240229", "Claude 3 Opus", Slow, High, 200_000, "Most capable Claude model"),
    spec(Anthropic, "claude-3-haiku-20240307", "Claude 3 Haiku", Fast, Low, 200_000, "Fast, cheap Claude model"),
];

pub const ALIASES: &[ModelAlias] = &[
    alias(OpenAi, "gpt", "gpt-5.2"),
    alias(OpenAi, "gpt-5", "gpt-5.2"),
    alias(OpenAi, "gpt-instant", "gpt-5.2-chat-latest"),
    // Older releases shipped this name before the API id settled.
    alias(OpenAi, "gpt-5.2-instant", "gpt-5.2-chat-latest"),
    alias(Google, "gemini", "gemini-3-flash-preview"),
    alias(Anthropic, "claude", "claude-sonnet-4-5-20250929"),
];

/// Model that always triggers a cost warning.
pub const PREMIUM_MODEL: &str = "gpt-5.2-pro";
