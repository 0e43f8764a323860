pub mod cache;
pub mod composer;
pub mod config;
pub mod cost;
pub mod error;
pub mod models;
pub mod observability;
pub mod providers;
pub mod resilience;
pub mod router;
pub mod storage;

pub use cache::{Fingerprint, ResponseCache};
pub use composer::{Completion, MultiCompletion};
pub use config::{Paths, Settings};
pub use cost::{CostCalculator, PricingStore, PricingTable, UsageLog};
pub use error::{MuxError, Result};
pub use models::{normalize, ProviderKind};
pub use providers::{CompletionRequest, Provider, ProviderResponse};
pub use router::{RequestOptions, ReviewFocus, Router};
