use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOG_INIT: OnceLock<()> = OnceLock::new();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install the global subscriber once. Output goes to stderr so stdout stays
/// free for command results. `RUST_LOG` overrides the default `warn` level.
pub fn setup_logging(format: LogFormat) {
    LOG_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let registry = tracing_subscriber::registry().with(filter);

        let result = match format {
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_current_span(false)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
            LogFormat::Text => registry
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                .try_init(),
        };
        if let Err(err) = result {
            eprintln!("logging already initialized: {}", err);
        }
    });
}

/// Adapter events, tagged with the provider they concern.
#[macro_export]
macro_rules! log_provider {
    ($level:ident, $provider:expr, $($arg:tt)*) => {
        tracing::$level!(
            target: "provider",
            provider = %$provider,
            $($arg)*
        );
    };
}
