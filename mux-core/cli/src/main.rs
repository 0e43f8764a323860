use anyhow::Result;
use clap::Parser;
use mux_core::config::{Paths, Settings};
use mux_core::observability::{setup_logging, LogFormat};
use tracing::warn;

mod cli;
mod commands;

use cli::{CacheCommands, Cli, Commands, ModelCommands, PricingCommands};
use commands::Context;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let paths = Paths::resolve()?;

    // Settings pick the log format, so read them before logging is up and
    // report a bad file afterwards.
    let loaded = Settings::try_load(&paths.config_file());
    let configured_format = match &loaded {
        Ok(Some(settings)) => settings.log_format,
        _ => LogFormat::Text,
    };
    setup_logging(if args.json_logs { LogFormat::Json } else { configured_format });

    let settings = match loaded {
        Ok(settings) => settings.unwrap_or_default(),
        Err(err) => {
            warn!(%err, path = %paths.config_file().display(), "ignoring invalid config file");
            Settings::default()
        }
    };

    let ctx = Context::new(paths, settings, args.metrics);

    match args.command {
        Commands::Review {
            prompt,
            models,
            focus,
            no_cache,
            ttl_hours,
        } => {
            commands::review::execute(&ctx, &prompt, models, &focus, no_cache, ttl_hours).await?;
        }
        Commands::Plan { goal, model, no_cache } => {
            commands::plan::execute(&ctx, &goal, model.as_deref(), no_cache).await?;
        }
        Commands::Estimate {
            model,
            text,
            file,
            output_tokens,
            cached_ratio,
            threshold,
        } => {
            commands::estimate::execute(&ctx, &model, text, file, output_tokens, cached_ratio, threshold)?;
        }
        Commands::Models { action } => match action {
            ModelCommands::List => commands::models::list(),
            ModelCommands::Info { name } => commands::models::info(&ctx, &name)?,
        },
        Commands::Pricing { action } => match action {
            PricingCommands::Show => commands::pricing::show(&ctx),
            PricingCommands::Age => commands::pricing::age(&ctx),
            PricingCommands::Update { url } => commands::pricing::update(&ctx, url).await?,
        },
        Commands::Cache { action } => match action {
            CacheCommands::Stats => commands::cache::stats(&ctx),
            CacheCommands::Clear { older_than_hours } => commands::cache::clear(&ctx, older_than_hours),
        },
        Commands::Usage { days } => commands::usage::execute(&ctx, days),
    }

    Ok(())
}
