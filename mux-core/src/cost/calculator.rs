use super::pricing::{ModelPricing, PricingTable, ResolvedPricing};
use crate::error::{MuxError, Result};
use crate::models::{self, ProviderKind};
use serde::Serialize;

const TOKENS_PER_UNIT: f64 = 1_000_000.0;
const MODERATE_COST: f64 = 0.10;

/// Rough token count: four characters per token, at least one for
/// non-empty text.
pub fn estimate_tokens(text: &str) -> u64 {
    if text.is_empty() {
        return 0;
    }
    (text.chars().count() as u64 / 4).max(1)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cached_tokens: u64,
    pub estimated_cost: f64,
    pub is_estimated: bool,
}

impl CostBreakdown {
    pub fn formatted(&self) -> String {
        format!("${:.4}", self.estimated_cost)
    }
}

pub struct CostCalculator {
    pricing_table: PricingTable,
}

impl CostCalculator {
    pub fn new(pricing_table: PricingTable) -> Self {
        Self { pricing_table }
    }

    pub fn pricing_table(&self) -> &PricingTable {
        &self.pricing_table
    }

    /// Cost in USD for a request against `model` (name or alias).
    ///
    /// `cached_tokens` is clamped to `input_tokens`.
    pub fn estimate_cost(
        &self,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
        cached_tokens: u64,
    ) -> Result<f64> {
        let (provider, canonical) = models::normalize(model)?;
        self.estimate_for_provider(provider, canonical, input_tokens, output_tokens, cached_tokens)
    }

    /// Same as [`estimate_cost`](Self::estimate_cost) for a model id that
    /// is already canonical.
    pub fn estimate_for_provider(
        &self,
        provider: ProviderKind,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
        cached_tokens: u64,
    ) -> Result<f64> {
        let resolved = self.resolve(provider, model)?;
        Ok(compute_cost(
            &resolved.pricing,
            provider.cache_discount(),
            input_tokens,
            output_tokens,
            cached_tokens,
        ))
    }

    pub fn estimate_cost_from_text(
        &self,
        model: &str,
        text: &str,
        expected_output_tokens: u64,
        cached_ratio: f64,
    ) -> Result<CostBreakdown> {
        // Written to reject NaN as well.
        if !(0.0..=1.0).contains(&cached_ratio) {
            return Err(MuxError::InvalidRatio(cached_ratio));
        }

        let (provider, canonical) = models::normalize(model)?;
        let resolved = self.resolve(provider, canonical)?;

        let input_tokens = estimate_tokens(text);
        let cached_tokens = (input_tokens as f64 * cached_ratio).floor() as u64;
        let estimated_cost = compute_cost(
            &resolved.pricing,
            provider.cache_discount(),
            input_tokens,
            expected_output_tokens,
            cached_tokens,
        );

        Ok(CostBreakdown {
            model: canonical.to_string(),
            input_tokens,
            output_tokens: expected_output_tokens,
            cached_tokens,
            estimated_cost,
            is_estimated: resolved.is_estimated(),
        })
    }

    /// Multi-line warning with a tier label and the billing rates.
    pub fn format_warning(&self, model: &str, cost: f64, operation: &str) -> String {
        let level = if models::is_premium(model) {
            "EXPENSIVE"
        } else if cost > MODERATE_COST {
            "Moderate cost"
        } else {
            "Low cost"
        };

        let rates = models::normalize(model)
            .ok()
            .and_then(|(provider, canonical)| self.resolve(provider, canonical).ok())
            .map(|resolved| resolved.pricing);
        let (input, output) = rates.map_or((0.0, 0.0), |p| (p.input, p.output));

        format!(
            "{level}: {operation}\n\
             Model: {model}\n\
             Estimated cost: ${cost:.4}\n\
             \n\
             Billing rates (per 1M tokens):\n  \
             Input:  ${input:.2}\n  \
             Output: ${output:.2}\n"
        )
    }

    fn resolve(&self, provider: ProviderKind, model: &str) -> Result<ResolvedPricing> {
        self.pricing_table
            .get_model_pricing(provider.as_str(), model)
            .ok_or_else(|| MuxError::UnknownPricing {
                provider: provider.as_str().to_string(),
                model: model.to_string(),
            })
    }
}

impl Default for CostCalculator {
    fn default() -> Self {
        Self::new(PricingTable::embedded())
    }
}

/// Whether a cost deserves a warning before the call is made.
pub fn should_warn(model: &str, cost: f64, threshold: f64) -> bool {
    models::is_premium(model) || cost > threshold
}

fn compute_cost(
    pricing: &ModelPricing,
    cache_discount: f64,
    input_tokens: u64,
    output_tokens: u64,
    cached_tokens: u64,
) -> f64 {
    let cached_tokens = cached_tokens.min(input_tokens);
    let uncached_tokens = input_tokens - cached_tokens;

    let input_cost = (uncached_tokens as f64 / TOKENS_PER_UNIT) * pricing.input;
    let cached_cost = (cached_tokens as f64 / TOKENS_PER_UNIT) * (pricing.input * (1.0 - cache_discount));
    let output_cost = (output_tokens as f64 / TOKENS_PER_UNIT) * pricing.output;

    input_cost + cached_cost + output_cost
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens(&"x".repeat(4000)), 1000);
    }

    #[test]
    fn test_compute_cost_components() {
        let pricing = ModelPricing {
            input: 2.0,
            output: 8.0,
            is_estimated: false,
        };
        // 600 uncached + 400 cached at 25% of input + 100 output.
        let cost = compute_cost(&pricing, 0.75, 1000, 100, 400);
        let expected = 600.0 / 1e6 * 2.0 + 400.0 / 1e6 * 0.5 + 100.0 / 1e6 * 8.0;
        assert!(close(cost, expected));
    }

    #[test]
    fn test_alias_priced_as_canonical() {
        let calc = CostCalculator::default();
        let via_alias = calc.estimate_cost("gpt", 1000, 500, 0).unwrap();
        let direct = calc.estimate_cost("gpt-5.2", 1000, 500, 0).unwrap();
        assert_eq!(via_alias, direct);
    }

    #[test]
    fn test_breakdown_from_text() {
        let calc = CostCalculator::default();
        let text = "a".repeat(4000);
        let breakdown = calc.estimate_cost_from_text("claude", &text, 200, 0.5).unwrap();

        assert_eq!(breakdown.model, "claude-sonnet-4-5-20250929");
        assert_eq!(breakdown.input_tokens, 1000);
        assert_eq!(breakdown.cached_tokens, 500);
        assert_eq!(breakdown.output_tokens, 200);
        assert!(breakdown.is_estimated);
        assert!(breakdown.estimated_cost > 0.0);
    }

    #[test]
    fn test_nan_ratio_rejected() {
        let calc = CostCalculator::default();
        let err = calc.estimate_cost_from_text("gpt-5.2", "hello", 10, f64::NAN).unwrap_err();
        assert!(matches!(err, MuxError::InvalidRatio(_)));
    }

    #[test]
    fn test_empty_table_prices_from_embedded_defaults() {
        let calc = CostCalculator::new(PricingTable {
            providers: Default::default(),
            metadata: None,
        });
        let cost = calc.estimate_cost("gpt-4o", 1_000_000, 0, 0).unwrap();
        assert!(close(cost, 1.75));
    }

    #[test]
    fn test_format_warning_levels() {
        let calc = CostCalculator::default();
        let premium = calc.format_warning("gpt-5.2-pro", 0.01, "review");
        assert!(premium.starts_with("EXPENSIVE: review"));
        assert!(premium.contains("Input:  $21.00"));
        assert!(premium.contains("Output: $84.00"));

        assert!(calc.format_warning("gpt-5.2", 0.5, "plan").starts_with("Moderate cost"));
        let low = calc.format_warning("gemini", 0.001, "review");
        assert!(low.starts_with("Low cost"));
        assert!(low.contains("Estimated cost: $0.0010"));

        let unknown = calc.format_warning("llama", 0.0, "x");
        assert!(unknown.contains("Input:  $0.00"));
    }
}
