use super::{read_input, warn_about_cost, Context};
use anyhow::Result;
use mux_core::router::PLAN_SYSTEM_PROMPT;

pub async fn execute(ctx: &Context, goal: &str, model: Option<&str>, no_cache: bool) -> Result<()> {
    let goal = read_input(goal)?;
    let router = ctx.router()?;
    let options = router.options("plan").with_cache(!no_cache && ctx.settings.use_cache);

    let model_name = model.unwrap_or(&ctx.settings.default_models.plan).to_string();
    warn_about_cost(
        router.calculator(),
        ctx.settings.cost_warning_threshold,
        std::slice::from_ref(&model_name),
        &goal,
        PLAN_SYSTEM_PROMPT,
        "plan",
    );

    let completion = router.plan(&goal, Some(&model_name), &options).await?;
    println!("{}", completion.text);
    eprintln!(
        "{}{}: ${:.4}",
        completion.canonical_model,
        if completion.cached { " (cached)" } else { "" },
        completion.cost
    );

    ctx.print_metrics(&router)
}
