use super::Context;
use mux_core::cost::UsageLog;

pub fn execute(ctx: &Context, days: Option<u32>) {
    let stats = UsageLog::new(ctx.paths.usage_log()).stats(days);

    match days {
        Some(days) => println!("Usage over the last {} day(s)", days),
        None => println!("Usage (all time)"),
    }
    println!("Calls: {}", stats.total_calls);
    println!("Cost:  ${:.4}", stats.total_cost);

    if !stats.by_model.is_empty() {
        println!("\nBy model:");
        for (model, bucket) in &stats.by_model {
            println!("  {:<28} {:>5} calls  ${:.4}", model, bucket.calls, bucket.cost);
        }
    }
    if !stats.by_operation.is_empty() {
        println!("\nBy operation:");
        for (operation, bucket) in &stats.by_operation {
            println!("  {:<28} {:>5} calls  ${:.4}", operation, bucket.calls, bucket.cost);
        }
    }
}
