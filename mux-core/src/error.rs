use thiserror::Error;
use reqwest::Error as ReqwestError;
use serde_json::Error as JsonError;
use serde_yaml::Error as YamlError;
use std::io::Error as IoError;

use crate::models::ProviderKind;

#[derive(Error, Debug)]
pub enum MuxError {
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] JsonError),

    #[error("YAML error: {0}")]
    Yaml(#[from] YamlError),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] IoError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("{env_var} not set. Set via environment or pass an API key for {provider}.")]
    MissingCredential {
        provider: ProviderKind,
        env_var: &'static str,
    },

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("No pricing data available for {provider}/{model}")]
    UnknownPricing { provider: String, model: String },

    #[error("cached_ratio must be between 0.0 and 1.0, got {0}")]
    InvalidRatio(f64),

    #[error("{provider} API error: {message}")]
    Provider {
        provider: ProviderKind,
        status: Option<u16>,
        message: String,
    },

    #[error("Invalid pricing data: {0}")]
    InvalidPricing(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl MuxError {
    pub fn provider(provider: ProviderKind, status: Option<u16>, message: impl Into<String>) -> Self {
        MuxError::Provider {
            provider,
            status,
            message: message.into(),
        }
    }

    /// HTTP status reported by the vendor, if the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            MuxError::Provider { status, .. } => *status,
            MuxError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Errors caused by the caller's configuration rather than the vendor.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            MuxError::MissingCredential { .. }
                | MuxError::UnknownModel(_)
                | MuxError::UnknownPricing { .. }
                | MuxError::InvalidRatio(_)
                | MuxError::InvalidConfig(_)
                | MuxError::InvalidInput(_)
        )
    }
}

impl From<anyhow::Error> for MuxError {
    fn from(err: anyhow::Error) -> Self {
        MuxError::Unknown(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MuxError>;
