pub mod cache;
pub mod estimate;
pub mod models;
pub mod plan;
pub mod pricing;
pub mod review;
pub mod usage;

use anyhow::{Context as _, Result};
use mux_core::config::{Paths, Settings};
use mux_core::cost::{should_warn, CostCalculator};
use mux_core::router::Router;
use std::io::Read;

/// Output tokens assumed when warning about cost before a call.
const EXPECTED_OUTPUT_TOKENS: u64 = 1000;

pub struct Context {
    pub paths: Paths,
    pub settings: Settings,
    pub show_metrics: bool,
}

impl Context {
    pub fn new(paths: Paths, settings: Settings, show_metrics: bool) -> Self {
        Self {
            paths,
            settings,
            show_metrics,
        }
    }

    pub fn router(&self) -> Result<Router> {
        Ok(Router::new(&self.paths, self.settings.clone())?)
    }

    pub fn print_metrics(&self, router: &Router) -> Result<()> {
        if self.show_metrics {
            eprintln!("{}", router.metrics().export()?);
        }
        Ok(())
    }
}

/// The argument itself, or stdin when it is "-".
pub fn read_input(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("failed to read stdin")?;
    Ok(buffer)
}

/// Print a warning to stderr for every model whose estimated cost crosses
/// the configured threshold.
pub fn warn_about_cost(
    calculator: &CostCalculator,
    threshold: f64,
    models: &[String],
    prompt: &str,
    system_prompt: &str,
    operation: &str,
) {
    let text = format!("{}\n\n{}", system_prompt, prompt);
    for model in models {
        let Ok(breakdown) = calculator.estimate_cost_from_text(model, &text, EXPECTED_OUTPUT_TOKENS, 0.0) else {
            continue;
        };
        if should_warn(model, breakdown.estimated_cost, threshold) {
            eprintln!("{}", calculator.format_warning(model, breakdown.estimated_cost, operation));
        }
    }
}
