use crate::error::Result;
use crate::models::ProviderKind;
use prometheus::{
    Counter, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMetrics {
    pub request_id: String,
    pub provider: ProviderKind,
    pub model: String,
    pub duration_ms: u64,
    pub tokens_input: u64,
    pub tokens_output: u64,
    pub cost_usd: f64,
    pub success: bool,
    pub error: Option<String>,
}

/// Aggregate counters since the collector was created.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouterStats {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_cost_usd: f64,
    pub tokens_input: u64,
    pub tokens_output: u64,
    pub active_requests: i64,
}

/// Holds one slot of the in-flight gauge until dropped, unwinding included.
#[must_use]
pub struct ActiveRequest<'a> {
    gauge: &'a IntGauge,
}

impl Drop for ActiveRequest<'_> {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,
    requests: IntCounterVec,
    errors: IntCounterVec,
    cache_hits: IntCounter,
    cache_misses: IntCounter,
    request_duration: Histogram,
    request_cost: Counter,
    tokens_input: IntCounter,
    tokens_output: IntCounter,
    active_requests: IntGauge,
}

impl MetricsCollector {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("modelmux_requests_total", "Provider requests").const_label("component", "router"),
            &["provider"],
        )?;
        let errors = IntCounterVec::new(
            Opts::new("modelmux_errors_total", "Failed provider requests"),
            &["provider"],
        )?;
        let cache_hits = IntCounter::with_opts(Opts::new("modelmux_cache_hits_total", "Response cache hits"))?;
        let cache_misses =
            IntCounter::with_opts(Opts::new("modelmux_cache_misses_total", "Response cache misses"))?;
        let request_duration = Histogram::with_opts(
            HistogramOpts::new("modelmux_request_duration_seconds", "Provider request duration in seconds")
                .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;
        let request_cost = Counter::with_opts(Opts::new("modelmux_cost_usd_total", "Estimated cost in USD"))?;
        let tokens_input = IntCounter::with_opts(Opts::new("modelmux_tokens_input_total", "Input tokens"))?;
        let tokens_output = IntCounter::with_opts(Opts::new("modelmux_tokens_output_total", "Output tokens"))?;
        let active_requests =
            IntGauge::with_opts(Opts::new("modelmux_active_requests", "Provider requests in flight"))?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(errors.clone()))?;
        registry.register(Box::new(cache_hits.clone()))?;
        registry.register(Box::new(cache_misses.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(request_cost.clone()))?;
        registry.register(Box::new(tokens_input.clone()))?;
        registry.register(Box::new(tokens_output.clone()))?;
        registry.register(Box::new(active_requests.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests,
            errors,
            cache_hits,
            cache_misses,
            request_duration,
            request_cost,
            tokens_input,
            tokens_output,
            active_requests,
        })
    }

    pub fn record_request(&self, metrics: &RequestMetrics) {
        let labels = &[metrics.provider.as_str()];

        self.requests.with_label_values(labels).inc();
        self.request_duration.observe(metrics.duration_ms as f64 / 1000.0);

        if metrics.success {
            self.request_cost.inc_by(metrics.cost_usd.max(0.0));
            self.tokens_input.inc_by(metrics.tokens_input);
            self.tokens_output.inc_by(metrics.tokens_output);
        } else {
            self.errors.with_label_values(labels).inc();
        }
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.inc();
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.inc();
    }

    pub fn track_active(&self) -> ActiveRequest<'_> {
        self.active_requests.inc();
        ActiveRequest {
            gauge: &self.active_requests,
        }
    }

    /// Prometheus text exposition of every metric.
    pub fn export(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    pub fn snapshot(&self) -> RouterStats {
        let sum = |vec: &IntCounterVec| -> u64 {
            ProviderKind::ALL
                .iter()
                .map(|p| vec.with_label_values(&[p.as_str()]).get())
                .sum()
        };
        RouterStats {
            total_requests: sum(&self.requests),
            failed_requests: sum(&self.errors),
            cache_hits: self.cache_hits.get(),
            cache_misses: self.cache_misses.get(),
            total_cost_usd: self.request_cost.get(),
            tokens_input: self.tokens_input.get(),
            tokens_output: self.tokens_output.get(),
            active_requests: self.active_requests.get(),
        }
    }
}
