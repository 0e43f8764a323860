//! Request pipeline: normalize, consult the cache, call the provider under
//! the retry policy, then log usage, record metrics and cache the answer.

pub mod focus;

pub use focus::{ReviewFocus, PLAN_SYSTEM_PROMPT};

use crate::cache::ResponseCache;
use crate::composer::{Completion, ModelOutcome, MultiCompletion};
use crate::config::{Paths, Settings};
use crate::cost::{CostCalculator, PricingStore, UsageLog, UsageRecord};
use crate::error::{MuxError, Result};
use crate::models::{self, ProviderKind};
use crate::observability::{MetricsCollector, RequestMetrics};
use crate::providers::{build_provider, CompletionRequest, Provider, ProviderResponse};
use crate::resilience::{retry_blocking, retry_with_policy, ExponentialBackoffRetry, RetryPolicy};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-call cache policy and the operation name recorded in the usage log.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub use_cache: bool,
    pub cache_ttl: Duration,
    pub operation: String,
}

impl RequestOptions {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            use_cache: true,
            cache_ttl: Duration::from_secs(24 * 3600),
            operation: operation.into(),
        }
    }

    pub fn from_settings(settings: &Settings, operation: impl Into<String>) -> Self {
        Self {
            use_cache: settings.use_cache,
            cache_ttl: settings.cache_ttl(),
            operation: operation.into(),
        }
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }
}

struct Prepared {
    requested: String,
    provider: ProviderKind,
    canonical: &'static str,
    request: CompletionRequest,
}

pub struct Router {
    cache: ResponseCache,
    calculator: Arc<CostCalculator>,
    usage: UsageLog,
    metrics: MetricsCollector,
    settings: Settings,
    retry: Arc<dyn RetryPolicy>,
    providers: HashMap<ProviderKind, Arc<dyn Provider>>,
}

impl Router {
    /// Router over the on-disk layout at `paths`. Pricing is loaded once
    /// here; providers are built from the environment on first use.
    pub fn new(paths: &Paths, settings: Settings) -> Result<Self> {
        let pricing = PricingStore::new(paths.pricing_file()).load();
        Self::with_parts(
            ResponseCache::new(paths.cache_dir()),
            Arc::new(CostCalculator::new(pricing)),
            UsageLog::new(paths.usage_log()),
            settings,
        )
    }

    pub fn with_parts(
        cache: ResponseCache,
        calculator: Arc<CostCalculator>,
        usage: UsageLog,
        settings: Settings,
    ) -> Result<Self> {
        Ok(Self {
            cache,
            calculator,
            usage,
            metrics: MetricsCollector::new()?,
            settings,
            retry: Arc::new(ExponentialBackoffRetry::default()),
            providers: HashMap::new(),
        })
    }

    /// Use `provider` for its vendor instead of building one from the
    /// environment.
    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn with_retry_policy(mut self, retry: Arc<dyn RetryPolicy>) -> Self {
        self.retry = retry;
        self
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn calculator(&self) -> &Arc<CostCalculator> {
        &self.calculator
    }

    pub fn usage_log(&self) -> &UsageLog {
        &self.usage
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn options(&self, operation: &str) -> RequestOptions {
        RequestOptions::from_settings(&self.settings, operation)
    }

    fn provider_for(&self, kind: ProviderKind) -> Result<Arc<dyn Provider>> {
        match self.providers.get(&kind) {
            Some(provider) => Ok(Arc::clone(provider)),
            None => build_provider(kind, None, Arc::clone(&self.calculator)),
        }
    }

    fn prepare(&self, request: &CompletionRequest) -> Result<Prepared> {
        let (provider, canonical) = models::normalize(&request.model)?;
        let mut canonical_request = request.clone();
        canonical_request.model = canonical.to_string();
        Ok(Prepared {
            requested: request.model.clone(),
            provider,
            canonical,
            request: canonical_request,
        })
    }

    fn lookup(&self, prepared: &Prepared, options: &RequestOptions) -> Option<Completion> {
        if !options.use_cache {
            return None;
        }
        let request = &prepared.request;
        match self.cache.lookup(
            prepared.canonical,
            &request.prompt,
            request.system_prompt.as_deref(),
            options.cache_ttl,
        ) {
            Some(text) => {
                self.metrics.record_cache_hit();
                debug!(model = prepared.canonical, operation = %options.operation, "serving from cache");
                Some(Completion {
                    model: prepared.requested.clone(),
                    provider: prepared.provider,
                    canonical_model: prepared.canonical.to_string(),
                    text,
                    input_tokens: 0,
                    output_tokens: 0,
                    cached_tokens: 0,
                    cost: 0.0,
                    cached: true,
                })
            }
            None => {
                self.metrics.record_cache_miss();
                None
            }
        }
    }

    fn finish(
        &self,
        prepared: &Prepared,
        options: &RequestOptions,
        result: Result<ProviderResponse>,
        started: Instant,
    ) -> Result<Completion> {
        let request_id = Uuid::new_v4().to_string();
        let duration_ms = started.elapsed().as_millis() as u64;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                self.metrics.record_request(&RequestMetrics {
                    request_id: request_id.clone(),
                    provider: prepared.provider,
                    model: prepared.canonical.to_string(),
                    duration_ms,
                    tokens_input: 0,
                    tokens_output: 0,
                    cost_usd: 0.0,
                    success: false,
                    error: Some(err.to_string()),
                });
                warn!(%request_id, model = prepared.canonical, %err, "completion failed");
                return Err(err);
            }
        };

        self.metrics.record_request(&RequestMetrics {
            request_id: request_id.clone(),
            provider: prepared.provider,
            model: prepared.canonical.to_string(),
            duration_ms,
            tokens_input: response.input_tokens,
            tokens_output: response.output_tokens,
            cost_usd: response.cost,
            success: true,
            error: None,
        });
        self.usage.record(&UsageRecord::new(
            prepared.canonical,
            options.operation.as_str(),
            response.input_tokens,
            response.output_tokens,
            response.cost,
        ));

        let request = &prepared.request;
        if options.use_cache {
            self.cache.store(
                prepared.canonical,
                &request.prompt,
                request.system_prompt.as_deref(),
                &response.text,
            );
        }

        info!(
            %request_id,
            model = prepared.canonical,
            operation = %options.operation,
            duration_ms,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            cost = response.cost,
            "completion finished"
        );

        Ok(Completion {
            model: prepared.requested.clone(),
            provider: prepared.provider,
            canonical_model: prepared.canonical.to_string(),
            text: response.text,
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            cached_tokens: response.cached_tokens,
            cost: response.cost,
            cached: false,
        })
    }

    pub async fn complete(&self, request: &CompletionRequest, options: &RequestOptions) -> Result<Completion> {
        let prepared = self.prepare(request)?;
        if let Some(hit) = self.lookup(&prepared, options) {
            return Ok(hit);
        }
        let provider = self.provider_for(prepared.provider)?;

        let started = Instant::now();
        let active = self.metrics.track_active();
        let result = retry_with_policy(self.retry.as_ref(), &options.operation, || {
            provider.complete(&prepared.request)
        })
        .await;
        drop(active);

        self.finish(&prepared, options, result, started)
    }

    /// [`complete`](Self::complete) without an async runtime. Must not be
    /// called from inside one.
    pub fn complete_blocking(&self, request: &CompletionRequest, options: &RequestOptions) -> Result<Completion> {
        let prepared = self.prepare(request)?;
        if let Some(hit) = self.lookup(&prepared, options) {
            return Ok(hit);
        }
        let provider = self.provider_for(prepared.provider)?;

        let started = Instant::now();
        let active = self.metrics.track_active();
        let result = retry_blocking(self.retry.as_ref(), &options.operation, || {
            provider.complete_blocking(&prepared.request)
        });
        drop(active);

        self.finish(&prepared, options, result, started)
    }

    /// Send `request` to every model concurrently, one task each.
    ///
    /// Outcomes follow the order of `models`; a failing or panicking model
    /// does not affect the others.
    pub async fn complete_many(
        self: &Arc<Self>,
        request: &CompletionRequest,
        models: &[String],
        options: &RequestOptions,
    ) -> MultiCompletion {
        let mut tasks = JoinSet::new();
        for (index, model) in models.iter().enumerate() {
            let router = Arc::clone(self);
            let mut request = request.clone();
            request.model = model.clone();
            let options = options.clone();
            tasks.spawn(async move { (index, router.complete(&request, &options).await) });
        }

        let mut slots: Vec<Option<Result<Completion>>> = models.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(err) => warn!(%err, "fan-out task did not complete"),
            }
        }

        collect_outcomes(models, slots)
    }

    /// [`complete_many`](Self::complete_many) on scoped OS threads.
    pub fn complete_many_blocking(
        &self,
        request: &CompletionRequest,
        models: &[String],
        options: &RequestOptions,
    ) -> MultiCompletion {
        let slots = std::thread::scope(|scope| {
            let handles: Vec<_> = models
                .iter()
                .map(|model| {
                    let mut request = request.clone();
                    request.model = model.clone();
                    scope.spawn(move || self.complete_blocking(&request, options))
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => Some(result),
                    Err(_) => {
                        warn!("fan-out thread panicked");
                        None
                    }
                })
                .collect::<Vec<_>>()
        });

        collect_outcomes(models, slots)
    }

    /// Review `prompt` with each model, the configured review model when
    /// `models` is empty.
    pub async fn review(
        self: &Arc<Self>,
        prompt: &str,
        models: &[String],
        focus: ReviewFocus,
        options: &RequestOptions,
    ) -> MultiCompletion {
        let default_model;
        let models = if models.is_empty() {
            default_model = [self.settings.default_models.review.clone()];
            &default_model[..]
        } else {
            models
        };

        let request = CompletionRequest::new(prompt, "").with_system_prompt(focus.system_prompt());
        self.complete_many(&request, models, options).await
    }

    /// Implementation plan for `goal`, from `model` or the configured plan
    /// model.
    pub async fn plan(&self, goal: &str, model: Option<&str>, options: &RequestOptions) -> Result<Completion> {
        let model = model.unwrap_or(&self.settings.default_models.plan);
        let request = CompletionRequest::new(goal, model).with_system_prompt(PLAN_SYSTEM_PROMPT);
        self.complete(&request, options).await
    }
}

fn collect_outcomes(models: &[String], slots: Vec<Option<Result<Completion>>>) -> MultiCompletion {
    let outcomes = models
        .iter()
        .zip(slots)
        .map(|(model, slot)| ModelOutcome {
            model: model.clone(),
            result: slot.unwrap_or_else(|| Err(MuxError::Unknown(format!("request for {} panicked", model)))),
        })
        .collect();
    MultiCompletion::new(outcomes)
}
