use super::Context;
use anyhow::{anyhow, Result};
use mux_core::cost::{PricingStore, PricingTable};

pub fn show(ctx: &Context) {
    let table = PricingStore::new(ctx.paths.pricing_file()).load();
    print_table(&table);
}

pub fn age(ctx: &Context) {
    let table = PricingStore::new(ctx.paths.pricing_file()).load();
    match table.age_in_days() {
        Some(days) => {
            println!("Pricing data is {} day(s) old", days);
            if table.suggests_update() {
                println!("Consider running `modelmux pricing update`");
            }
        }
        None => println!("Pricing data has no valid last_updated timestamp"),
    }
}

pub async fn update(ctx: &Context, url: Option<String>) -> Result<()> {
    let url = url
        .or_else(|| ctx.settings.pricing_url.clone())
        .ok_or_else(|| anyhow!("no URL given and pricing_url is not set in config.toml"))?;

    let store = PricingStore::new(ctx.paths.pricing_file());
    let table = store.refresh_from_remote(&url).await?;
    println!("Updated pricing from {}", url);
    print_table(&table);
    Ok(())
}

fn print_table(table: &PricingTable) {
    if let Some(meta) = &table.metadata {
        println!("Version {} from {} (updated {})", meta.version, meta.source, meta.last_updated);
    }
    for (provider, models) in &table.providers {
        println!("{}:", provider);
        for (model, pricing) in models {
            println!(
                "  {:<28} ${:>7.3} in  ${:>7.3} out{}",
                model,
                pricing.input,
                pricing.output,
                if pricing.is_estimated { "  (estimated)" } else { "" }
            );
        }
    }
}
