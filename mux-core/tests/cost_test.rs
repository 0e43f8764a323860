/// Cost estimation against the embedded pricing table

#[cfg(test)]
mod tests {
    use mux_core::cost::{should_warn, CostCalculator};
    use mux_core::error::MuxError;
    use mux_core::models::ProviderKind;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_known_cost() {
        let calc = CostCalculator::default();
        let cost = calc.estimate_cost("gpt-5.2", 1000, 500, 0).unwrap();
        assert!(close(cost, 0.00875), "got {}", cost);
    }

    #[test]
    fn test_cost_is_monotonic() {
        let calc = CostCalculator::default();
        for model in ["gpt-5.2", "gemini", "claude", "gpt-5.2-pro"] {
            let mut previous = 0.0;
            for tokens in [0u64, 1, 10, 1_000, 50_000, 2_000_000] {
                let cost = calc.estimate_cost(model, tokens, tokens / 2, 0).unwrap();
                assert!(cost >= previous, "{} not monotonic at {}", model, tokens);
                previous = cost;
            }

            let uncached = calc.estimate_cost(model, 10_000, 100, 0).unwrap();
            let half = calc.estimate_cost(model, 10_000, 100, 5_000).unwrap();
            let all = calc.estimate_cost(model, 10_000, 100, 10_000).unwrap();
            assert!(uncached >= half && half >= all);
        }
    }

    #[test]
    fn test_higher_rate_model_costs_strictly_more() {
        let calc = CostCalculator::default();
        let pairs = [
            ("gpt-5.2-pro", "gpt-5.2"),
            ("gpt-5.2", "gpt-5.2-chat-latest"),
            ("claude-3-opus-20240229", "claude-3-haiku-20240307"),
            ("gemini-pro", "gemini-3-flash-preview"),
            ("claude", "gemini"),
        ];
        for (expensive, cheap) in pairs {
            for (input, output) in [(1u64, 0u64), (0, 1), (1_000, 500), (250_000, 4_000)] {
                let high = calc.estimate_cost(expensive, input, output, 0).unwrap();
                let low = calc.estimate_cost(cheap, input, output, 0).unwrap();
                assert!(
                    high > low,
                    "{} ({}) should cost more than {} ({}) at {}/{}",
                    expensive, high, cheap, low, input, output
                );
            }
        }
    }

    #[test]
    fn test_cache_discount_per_provider() {
        let calc = CostCalculator::default();
        let table = calc.pricing_table();
        for provider in ProviderKind::ALL {
            let model = provider.default_model();
            let input_price = table
                .get_model_pricing(provider.as_str(), model)
                .unwrap()
                .pricing
                .input;

            let cost = calc.estimate_cost(model, 1_000_000, 0, 1_000_000).unwrap();
            let expected = input_price * (1.0 - provider.cache_discount());
            assert!(close(cost, expected), "{}: {} != {}", provider, cost, expected);
        }
        assert_eq!(ProviderKind::OpenAi.cache_discount(), 0.90);
        assert_eq!(ProviderKind::Google.cache_discount(), 0.75);
        assert_eq!(ProviderKind::Anthropic.cache_discount(), 0.90);
    }

    #[test]
    fn test_cached_tokens_clamped_to_input() {
        let calc = CostCalculator::default();
        let over = calc.estimate_cost("gemini", 100, 10, 500).unwrap();
        let exact = calc.estimate_cost("gemini", 100, 10, 100).unwrap();
        assert_eq!(over, exact);
    }

    #[test]
    fn test_invalid_cached_ratio() {
        let calc = CostCalculator::default();
        for ratio in [1.5, -0.1] {
            let err = calc.estimate_cost_from_text("gpt-5.2", "some text", 100, ratio).unwrap_err();
            assert!(matches!(err, MuxError::InvalidRatio(r) if r == ratio));
        }
        assert!(calc.estimate_cost_from_text("gpt-5.2", "some text", 100, 1.0).is_ok());
        assert!(calc.estimate_cost_from_text("gpt-5.2", "some text", 100, 0.0).is_ok());
    }

    #[test]
    fn test_breakdown_invariants() {
        let calc = CostCalculator::default();
        let breakdown = calc
            .estimate_cost_from_text("gpt-instant", &"word ".repeat(1000), 500, 0.2)
            .unwrap();
        assert_eq!(breakdown.model, "gpt-5.2-chat-latest");
        assert_eq!(breakdown.input_tokens, 1250);
        assert_eq!(breakdown.cached_tokens, 250);
        assert!(breakdown.cached_tokens <= breakdown.input_tokens);
        assert!(breakdown.estimated_cost >= 0.0);
        assert!(!breakdown.is_estimated);
    }

    #[test]
    fn test_unknown_model() {
        let calc = CostCalculator::default();
        let err = calc.estimate_cost("llama-3-70b", 10, 10, 0).unwrap_err();
        assert!(matches!(err, MuxError::UnknownModel(_)));
    }

    #[test]
    fn test_should_warn_threshold_is_strict() {
        assert!(!should_warn("gpt-5.2", 0.10, 0.10));
        assert!(should_warn("gpt-5.2", 0.1000001, 0.10));
        assert!(!should_warn("gemini", 0.0, 0.10));
    }

    #[test]
    fn test_premium_model_always_warns() {
        assert!(should_warn("gpt-5.2-pro", 0.0, 0.10));
        assert!(should_warn("gpt-5.2-pro", 0.0, f64::MAX));
    }
}
