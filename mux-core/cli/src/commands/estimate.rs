use super::{read_input, Context};
use anyhow::{Context as _, Result};
use mux_core::cost::{should_warn, CostCalculator, PricingStore};
use std::path::PathBuf;

pub fn execute(
    ctx: &Context,
    model: &str,
    text: Option<String>,
    file: Option<PathBuf>,
    output_tokens: u64,
    cached_ratio: f64,
    threshold: Option<f64>,
) -> Result<()> {
    let text = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => {
            std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?
        }
        (None, None) => read_input("-")?,
    };

    let calculator = CostCalculator::new(PricingStore::new(ctx.paths.pricing_file()).load());
    let breakdown = calculator.estimate_cost_from_text(model, &text, output_tokens, cached_ratio)?;

    println!("Model:          {}", breakdown.model);
    println!("Input tokens:   {} (~{} cached)", breakdown.input_tokens, breakdown.cached_tokens);
    println!("Output tokens:  {}", breakdown.output_tokens);
    println!(
        "Estimated cost: {}{}",
        breakdown.formatted(),
        if breakdown.is_estimated { " (estimated pricing)" } else { "" }
    );

    let threshold = threshold.unwrap_or(ctx.settings.cost_warning_threshold);
    if should_warn(model, breakdown.estimated_cost, threshold) {
        eprintln!("{}", calculator.format_warning(model, breakdown.estimated_cost, "estimate"));
    }
    Ok(())
}
