use super::Context;
use anyhow::Result;
use mux_core::cost::PricingStore;
use mux_core::models::{self, ProviderKind};

pub fn list() {
    for provider in ProviderKind::ALL {
        println!("{}:", provider.vendor_name());
        for id in models::list_models(provider) {
            match models::model_info(id) {
                Some(info) => println!(
                    "  {:<28} {:<24} speed={:<6} cost={}",
                    id,
                    info.display_name,
                    info.speed.as_str(),
                    info.cost_tier.as_str()
                ),
                None => println!("  {}", id),
            }
        }
    }

    println!("\nAliases:");
    for alias in models::list_aliases() {
        println!("  {:<16} -> {}", alias.alias, alias.target);
    }
}

pub fn info(ctx: &Context, name: &str) -> Result<()> {
    let (provider, canonical) = models::normalize(name)?;
    println!("Model:          {}", canonical);
    println!("Provider:       {}", provider.vendor_name());
    if let Some(info) = models::model_info(canonical) {
        println!("Name:           {}", info.display_name);
        println!("Speed:          {}", info.speed.as_str());
        println!("Cost tier:      {}", info.cost_tier.as_str());
        println!("Context window: {}", info.context_window);
        println!("Description:    {}", info.description);
    }

    let table = PricingStore::new(ctx.paths.pricing_file()).load();
    if let Some(resolved) = table.get_model_pricing(provider.as_str(), canonical) {
        let note = if resolved.fallback {
            format!(" (priced as {})", resolved.priced_as)
        } else if resolved.pricing.is_estimated {
            " (estimated)".to_string()
        } else {
            String::new()
        };
        println!(
            "Pricing:        ${:.2} in / ${:.2} out per 1M tokens{}",
            resolved.pricing.input, resolved.pricing.output, note
        );
    }
    Ok(())
}
