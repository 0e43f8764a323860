use crate::error::{MuxError, Result};
use crate::observability::LogFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const HOME_ENV: &str = "MODELMUX_HOME";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DefaultModels {
    #[serde(default = "default_plan_model")]
    pub plan: String,
    #[serde(default = "default_review_model")]
    pub review: String,
}

impl Default for DefaultModels {
    fn default() -> Self {
        Self {
            plan: default_plan_model(),
            review: default_review_model(),
        }
    }
}

/// User settings from `config.toml`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub default_models: DefaultModels,

    /// Estimated cost in USD above which callers should confirm first.
    #[serde(default = "default_cost_warning_threshold")]
    pub cost_warning_threshold: f64,

    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,

    #[serde(default = "default_use_cache")]
    pub use_cache: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_url: Option<String>,

    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_models: DefaultModels::default(),
            cost_warning_threshold: default_cost_warning_threshold(),
            cache_ttl_hours: default_cache_ttl_hours(),
            use_cache: default_use_cache(),
            pricing_url: None,
            log_format: LogFormat::default(),
        }
    }
}

impl Settings {
    /// Read settings from `path`. A missing file gives the defaults; an
    /// unreadable or invalid one is logged and also gives the defaults.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(Some(settings)) => settings,
            Ok(None) => Self::default(),
            Err(err) => {
                warn!(%err, path = %path.display(), "ignoring invalid config file");
                Self::default()
            }
        }
    }

    /// Like [`load`](Self::load) but reports problems instead of logging
    /// them; `None` when the file does not exist.
    pub fn try_load(path: &Path) -> Result<Option<Self>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(Some(settings))
    }

    fn validate(&self) -> Result<()> {
        if !self.cost_warning_threshold.is_finite() || self.cost_warning_threshold < 0.0 {
            return Err(MuxError::InvalidConfig(format!(
                "cost_warning_threshold must be a non-negative number, got {}",
                self.cost_warning_threshold
            )));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours.saturating_mul(3600))
    }
}

fn default_plan_model() -> String {
    "gpt-5.2".to_string()
}

fn default_review_model() -> String {
    "gpt-5.2-chat-latest".to_string()
}

fn default_cost_warning_threshold() -> f64 {
    0.10
}

fn default_cache_ttl_hours() -> u64 {
    24
}

fn default_use_cache() -> bool {
    true
}

/// On-disk layout under the modelmux root directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Paths {
    root: PathBuf,
}

impl Paths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$MODELMUX_HOME`, or `~/.config/modelmux`.
    pub fn resolve() -> Result<Self> {
        if let Some(root) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(root));
        }
        let home = dirs::home_dir()
            .ok_or_else(|| MuxError::InvalidConfig(format!("could not determine home directory; set {}", HOME_ENV)))?;
        Ok(Self::new(home.join(".config").join("modelmux")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn pricing_file(&self) -> PathBuf {
        self.root.join("pricing.yaml")
    }

    pub fn usage_log(&self) -> PathBuf {
        self.root.join("usage.jsonl")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }
}
