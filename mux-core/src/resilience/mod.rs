pub mod retry;

pub use retry::{
    classify_error, retry_blocking, retry_with_policy, ExponentialBackoffRetry, FailureKind, RetryPolicy,
};
