use super::{read_input, warn_about_cost, Context};
use anyhow::{bail, Result};
use mux_core::composer::merge_outcomes;
use mux_core::router::ReviewFocus;
use std::sync::Arc;
use std::time::Duration;

pub async fn execute(
    ctx: &Context,
    prompt: &str,
    models: Vec<String>,
    focus: &str,
    no_cache: bool,
    ttl_hours: Option<u64>,
) -> Result<()> {
    let prompt = read_input(prompt)?;
    let focus: ReviewFocus = focus.parse()?;
    let router = Arc::new(ctx.router()?);

    let mut options = router.options("review");
    if no_cache {
        options = options.with_cache(false);
    }
    if let Some(hours) = ttl_hours {
        options = options.with_ttl(Duration::from_secs(hours.saturating_mul(3600)));
    }

    let models = if models.is_empty() {
        vec![ctx.settings.default_models.review.clone()]
    } else {
        models
    };

    warn_about_cost(
        router.calculator(),
        ctx.settings.cost_warning_threshold,
        &models,
        &prompt,
        focus.system_prompt(),
        "review",
    );

    let multi = router.review(&prompt, &models, focus, &options).await;
    let composed = merge_outcomes(&multi);
    println!("{}", composed.content);

    for completion in multi.successes() {
        let source = if completion.cached { "cached" } else { "live" };
        eprintln!(
            "{} ({}): {} in / {} out tokens, ${:.4}",
            completion.model, source, completion.input_tokens, completion.output_tokens, completion.cost
        );
    }
    for (model, err) in multi.failures() {
        eprintln!("Error reviewing with {}: {}", model, err);
    }
    eprintln!("Total cost: ${:.4}", multi.total_cost());

    ctx.print_metrics(&router)?;

    if multi.successes().next().is_none() {
        bail!("review failed for every model");
    }
    Ok(())
}
