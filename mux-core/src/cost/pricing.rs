use crate::error::{MuxError, Result};
use crate::models::ProviderKind;
use crate::storage::write_atomic;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

const REFRESH_TIMEOUT: Duration = Duration::from_secs(5);
const STALE_AFTER_DAYS: i64 = 30;

/// Embedded prices per 1M tokens: provider, model, input, output, estimated.
const DEFAULT_PRICES: &[(ProviderKind, &str, f64, f64, bool)] = &[
    (ProviderKind::OpenAi, "gpt-5.2-chat-latest", 0.40, 1.60, false),
    (ProviderKind::OpenAi, "gpt-5.2", 1.75, 14.00, false),
    (ProviderKind::OpenAi, "gpt-5.2-pro", 21.00, 84.00, true),
    (ProviderKind::OpenAi, "gpt-4o", 2.50, 10.00, false),
    (ProviderKind::OpenAi, "gpt-4", 30.00, 60.00, false),
    (ProviderKind::Google, "gemini-3-flash-preview", 0.075, 0.30, false),
    (ProviderKind::Google, "gemini-2.0-flash-exp", 0.075, 0.30, false),
    (ProviderKind::Google, "gemini-pro", 0.50, 1.50, false),
    (ProviderKind::Anthropic, "claude-sonnet-4-5-20250929", 3.00, 15.00, true),
    (ProviderKind::Anthropic, "claude-3-5-sonnet-20241022", 3.00, 15.00, true),
    (ProviderKind::Anthropic, "claude-3-opus-20240229", 15.00, 75.00, true),
    (ProviderKind::Anthropic, "claude-3-haiku-20240307", 0.25, 1.25, true),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input: f64,
    pub output: f64,
    /// Price is a guess rather than a vendor-published figure.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_estimated: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingMetadata {
    pub last_updated: String,
    pub version: String,
    pub source: String,
}

impl Default for PricingMetadata {
    fn default() -> Self {
        Self {
            last_updated: String::new(),
            version: "1.0.0".to_string(),
            source: "unknown".to_string(),
        }
    }
}

/// Price resolved for a request, with the entry it actually came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPricing {
    pub pricing: ModelPricing,
    pub priced_as: String,
    pub fallback: bool,
}

impl ResolvedPricing {
    pub fn is_estimated(&self) -> bool {
        self.pricing.is_estimated || self.fallback
    }
}

/// Immutable pricing snapshot: provider -> model -> prices per 1M tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingTable {
    #[serde(flatten)]
    pub providers: BTreeMap<String, BTreeMap<String, ModelPricing>>,
    #[serde(rename = "_metadata", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PricingMetadata>,
}

impl PricingTable {
    pub fn embedded() -> Self {
        let mut providers: BTreeMap<String, BTreeMap<String, ModelPricing>> = BTreeMap::new();
        for (provider, model, input, output, is_estimated) in DEFAULT_PRICES {
            providers.entry(provider.as_str().to_string()).or_default().insert(
                model.to_string(),
                ModelPricing {
                    input: *input,
                    output: *output,
                    is_estimated: *is_estimated,
                },
            );
        }
        Self {
            providers,
            metadata: Some(PricingMetadata {
                last_updated: Utc::now().to_rfc3339(),
                version: "1.0.0".to_string(),
                source: "embedded_defaults".to_string(),
            }),
        }
    }

    /// Price for `model`, falling back to the provider's default model.
    ///
    /// The default model is looked up in this table first, then in the
    /// embedded defaults. `None` only when `provider` is neither in the
    /// table with an exact match nor a provider this crate knows.
    pub fn get_model_pricing(&self, provider: &str, model: &str) -> Option<ResolvedPricing> {
        if let Some(pricing) = self.providers.get(provider).and_then(|m| m.get(model)) {
            return Some(ResolvedPricing {
                pricing: *pricing,
                priced_as: model.to_string(),
                fallback: false,
            });
        }

        let kind: ProviderKind = provider.parse().ok()?;
        let default_model = kind.default_model();
        let pricing = self
            .providers
            .get(provider)
            .and_then(|m| m.get(default_model))
            .copied()
            .or_else(|| embedded_price(kind, default_model))?;

        Some(ResolvedPricing {
            pricing,
            priced_as: default_model.to_string(),
            fallback: true,
        })
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        let raw = self.metadata.as_ref()?.last_updated.as_str();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive))
    }

    pub fn age_in_days(&self) -> Option<i64> {
        self.age_in_days_at(Utc::now())
    }

    pub fn age_in_days_at(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_updated().map(|ts| (now - ts).num_days())
    }

    pub fn suggests_update(&self) -> bool {
        self.age_in_days().map_or(false, |age| age > STALE_AFTER_DAYS)
    }
}

fn embedded_price(provider: ProviderKind, model: &str) -> Option<ModelPricing> {
    DEFAULT_PRICES
        .iter()
        .find(|(p, m, ..)| *p == provider && *m == model)
        .map(|(_, _, input, output, is_estimated)| ModelPricing {
            input: *input,
            output: *output,
            is_estimated: *is_estimated,
        })
}

/// User-editable pricing file with embedded fallback.
#[derive(Debug, Clone)]
pub struct PricingStore {
    path: PathBuf,
}

impl PricingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the override file, or seed it with the embedded defaults.
    ///
    /// Always yields a table: read and seed failures are warnings.
    pub fn load(&self) -> PricingTable {
        match self.read() {
            Ok(Some(table)) => return table,
            Ok(None) => {}
            Err(err) => {
                warn!(%err, path = %self.path.display(), "failed to load pricing file, using embedded defaults");
            }
        }

        let table = PricingTable::embedded();
        if let Err(err) = self.save(&table) {
            warn!(%err, path = %self.path.display(), "failed to save pricing file");
        }
        table
    }

    fn read(&self) -> Result<Option<PricingTable>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let table: PricingTable = serde_yaml::from_str(&content)?;
        if table.metadata.is_none() {
            return Err(MuxError::InvalidPricing("missing _metadata block".to_string()));
        }
        Ok(Some(table))
    }

    pub fn save(&self, table: &PricingTable) -> Result<()> {
        let content = serde_yaml::to_string(table)?;
        write_atomic(&self.path, content.as_bytes())?;
        Ok(())
    }

    pub fn get_model_pricing(&self, provider: &str, model: &str) -> Option<ResolvedPricing> {
        self.load().get_model_pricing(provider, model)
    }

    pub fn age_in_days(&self) -> Option<i64> {
        self.load().age_in_days()
    }

    /// Replace the stored table with one fetched from `url`.
    ///
    /// Fails closed: on any error the existing file is left untouched.
    pub async fn refresh_from_remote(&self, url: &str) -> Result<PricingTable> {
        match self.fetch_and_replace(url).await {
            Ok(table) => {
                info!(url, "updated pricing");
                Ok(table)
            }
            Err(err) => {
                warn!(%err, url, "failed to update pricing");
                Err(err)
            }
        }
    }

    async fn fetch_and_replace(&self, url: &str) -> Result<PricingTable> {
        let client = reqwest::Client::builder().timeout(REFRESH_TIMEOUT).build()?;
        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MuxError::InvalidPricing(format!("{} returned {}", url, status)));
        }
        let body: serde_json::Value = response.json().await?;
        let table = parse_remote(body, url, Utc::now())?;
        self.save(&table)?;
        Ok(table)
    }
}

fn parse_remote(mut body: serde_json::Value, source: &str, now: DateTime<Utc>) -> Result<PricingTable> {
    let object = body
        .as_object_mut()
        .ok_or_else(|| MuxError::InvalidPricing("expected a JSON object".to_string()))?;

    let missing: Vec<&str> = ProviderKind::ALL
        .iter()
        .map(|p| p.as_str())
        .filter(|p| !object.contains_key(*p))
        .collect();
    if !missing.is_empty() {
        return Err(MuxError::InvalidPricing(format!(
            "pricing data missing required providers: {}",
            missing.join(", ")
        )));
    }

    let version = object
        .remove("_metadata")
        .and_then(|meta| meta.get("version").and_then(|v| v.as_str()).map(str::to_string))
        .unwrap_or_else(|| "1.0.0".to_string());

    let providers = serde_json::from_value(body)?;
    Ok(PricingTable {
        providers,
        metadata: Some(PricingMetadata {
            last_updated: now.to_rfc3339(),
            version,
            source: source.to_string(),
        }),
    })
}
