pub mod merge;

use crate::error::MuxError;
use crate::models::ProviderKind;
use serde::{Deserialize, Serialize};

pub use merge::merge_outcomes;

/// Result of one routed completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// Model name as the caller asked for it.
    pub model: String,
    pub provider: ProviderKind,
    pub canonical_model: String,
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cached_tokens: u64,
    pub cost: f64,
    /// Served from the response cache; no provider call was made.
    pub cached: bool,
}

#[derive(Debug)]
pub struct ModelOutcome {
    pub model: String,
    pub result: Result<Completion, MuxError>,
}

/// Per-model outcomes of a fan-out, in the order the models were given.
#[derive(Debug, Default)]
pub struct MultiCompletion {
    pub outcomes: Vec<ModelOutcome>,
}

impl MultiCompletion {
    pub fn new(outcomes: Vec<ModelOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn get(&self, model: &str) -> Option<&Result<Completion, MuxError>> {
        self.outcomes.iter().find(|o| o.model == model).map(|o| &o.result)
    }

    pub fn successes(&self) -> impl Iterator<Item = &Completion> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &MuxError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.model.as_str(), e)))
    }

    /// Cost of the successful calls.
    pub fn total_cost(&self) -> f64 {
        self.successes().map(|c| c.cost).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedResponse {
    pub content: String,
    pub sources: Vec<String>,
    pub total_cost: f64,
}
