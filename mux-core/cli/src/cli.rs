use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "modelmux", version, about = "Multi-provider LLM reviews and plans with cost tracking")]
pub struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Print Prometheus metrics to stderr when done
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Review code or a diff with one or more models
    Review {
        /// Text to review, or "-" to read stdin
        prompt: String,

        /// Model name or alias; repeat for a parallel review
        #[arg(short, long = "model")]
        models: Vec<String>,

        /// general, security, performance or architecture
        #[arg(short, long, default_value = "general")]
        focus: String,

        /// Skip the response cache
        #[arg(long)]
        no_cache: bool,

        /// Cache TTL in hours (overrides config)
        #[arg(long)]
        ttl_hours: Option<u64>,
    },

    /// Generate an implementation plan
    Plan {
        /// What to plan, or "-" to read stdin
        goal: String,

        #[arg(short, long)]
        model: Option<String>,

        #[arg(long)]
        no_cache: bool,
    },

    /// Estimate the cost of sending text to a model
    Estimate {
        model: String,

        #[arg(long, conflicts_with = "file")]
        text: Option<String>,

        #[arg(long)]
        file: Option<PathBuf>,

        /// Expected output tokens
        #[arg(long, default_value = "1000")]
        output_tokens: u64,

        /// Fraction of input expected to hit the provider's prompt cache
        #[arg(long, default_value = "0.0")]
        cached_ratio: f64,

        /// Warning threshold in USD (overrides config)
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Inspect the model catalog
    Models {
        #[command(subcommand)]
        action: ModelCommands,
    },

    /// Show or update pricing data
    Pricing {
        #[command(subcommand)]
        action: PricingCommands,
    },

    /// Response cache maintenance
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },

    /// Usage and spend from the usage log
    Usage {
        /// Only the last N days
        #[arg(short, long)]
        days: Option<u32>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ModelCommands {
    /// List models and aliases by provider
    List,
    /// Details for one model or alias
    Info { name: String },
}

#[derive(Subcommand, Debug, Clone)]
pub enum PricingCommands {
    /// Print the active pricing table
    Show,
    /// How old the pricing data is
    Age,
    /// Fetch pricing from a URL (defaults to pricing_url in config)
    Update { url: Option<String> },
}

#[derive(Subcommand, Debug, Clone)]
pub enum CacheCommands {
    Stats,
    /// Remove cached responses
    Clear {
        /// Only entries older than this many hours
        #[arg(long)]
        older_than_hours: Option<u64>,
    },
}
