pub mod calculator;
pub mod pricing;
pub mod usage;

pub use calculator::{estimate_tokens, should_warn, CostBreakdown, CostCalculator};
pub use pricing::{ModelPricing, PricingMetadata, PricingStore, PricingTable, ResolvedPricing};
pub use usage::{UsageBucket, UsageLog, UsageRecord, UsageStats};
