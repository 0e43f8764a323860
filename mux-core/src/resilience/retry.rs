use crate::error::MuxError;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// How a failed attempt should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Retrying cannot help: bad credentials, bad request, bad configuration.
    Fatal,
    RateLimited,
    Transient,
}

const FATAL_MARKERS: &[&str] = &["api key", "authentication", "unauthorized", "invalid"];
const RATE_LIMIT_MARKERS: &[&str] = &["rate limit", "rate_limit", "429"];

/// Default classifier for provider failures.
pub fn classify_error(error: &MuxError) -> FailureKind {
    if error.is_configuration() {
        return FailureKind::Fatal;
    }
    match error.status() {
        Some(401) | Some(403) => return FailureKind::Fatal,
        Some(429) => return FailureKind::RateLimited,
        _ => {}
    }

    let text = error.to_string().to_lowercase();
    if FATAL_MARKERS.iter().any(|m| text.contains(m)) {
        FailureKind::Fatal
    } else if RATE_LIMIT_MARKERS.iter().any(|m| text.contains(m)) {
        FailureKind::RateLimited
    } else {
        FailureKind::Transient
    }
}

pub trait RetryPolicy: Send + Sync + Debug {
    fn classify(&self, error: &MuxError) -> FailureKind;
    /// Delay after the `attempt`-th failure (1-based).
    fn delay(&self, attempt: u32) -> Duration;
    fn max_attempts(&self) -> u32;
}

#[derive(Debug, Clone)]
pub struct ExponentialBackoffRetry {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    backoff_factor: f64,
    classifier: fn(&MuxError) -> FailureKind,
}

impl ExponentialBackoffRetry {
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay,
            backoff_factor: 2.0,
            classifier: classify_error,
        }
    }

    pub fn with_backoff_factor(mut self, backoff_factor: f64) -> Self {
        self.backoff_factor = backoff_factor;
        self
    }

    pub fn with_classifier(mut self, classifier: fn(&MuxError) -> FailureKind) -> Self {
        self.classifier = classifier;
        self
    }
}

impl Default for ExponentialBackoffRetry {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(10))
    }
}

impl RetryPolicy for ExponentialBackoffRetry {
    fn classify(&self, error: &MuxError) -> FailureKind {
        (self.classifier)(error)
    }

    fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        let delay_secs = delay_secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(delay_secs.max(0.0))
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Decide whether to go again after `attempt` failures, logging either way.
fn backoff_after(
    policy: &dyn RetryPolicy,
    operation: &str,
    attempt: u32,
    err: &MuxError,
) -> Option<Duration> {
    let kind = policy.classify(err);
    if kind == FailureKind::Fatal {
        debug!(operation, %err, "not retrying");
        return None;
    }

    let max_attempts = policy.max_attempts();
    if attempt >= max_attempts {
        error!(operation, attempts = attempt, %err, "giving up after {} attempts", attempt);
        return None;
    }

    let delay = policy.delay(attempt);
    let delay_ms = delay.as_millis() as u64;
    match kind {
        FailureKind::RateLimited => {
            warn!(operation, attempt, max_attempts, delay_ms, "rate limited, retrying");
        }
        _ => {
            warn!(operation, attempt, max_attempts, delay_ms, %err, "request failed, retrying");
        }
    }
    Some(delay)
}

pub async fn retry_with_policy<F, Fut, T>(
    policy: &dyn RetryPolicy,
    operation: &str,
    mut f: F,
) -> Result<T, MuxError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MuxError>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempt += 1;
                match backoff_after(policy, operation, attempt, &e) {
                    Some(delay) => tokio::time::sleep(delay).await,
                    None => return Err(e),
                }
            }
        }
    }
}

/// [`retry_with_policy`] for callers without a runtime; sleeps the thread.
pub fn retry_blocking<F, T>(policy: &dyn RetryPolicy, operation: &str, mut f: F) -> Result<T, MuxError>
where
    F: FnMut() -> Result<T, MuxError>,
{
    let mut attempt = 0;
    loop {
        match f() {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempt += 1;
                match backoff_after(policy, operation, attempt, &e) {
                    Some(delay) => std::thread::sleep(delay),
                    None => return Err(e),
                }
            }
        }
    }
}
