use super::Context;
use mux_core::cache::ResponseCache;
use std::time::Duration;

pub fn stats(ctx: &Context) {
    let cache = ResponseCache::new(ctx.paths.cache_dir());
    let stats = cache.stats();

    println!("Directory: {}", cache.dir().display());
    println!("Entries:   {}", stats.count);
    println!("Size:      {:.2} MB", stats.total_size_mb());
    if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
        println!("Oldest:    {}", oldest.to_rfc3339());
        println!("Newest:    {}", newest.to_rfc3339());
    }
}

pub fn clear(ctx: &Context, older_than_hours: Option<u64>) {
    let cache = ResponseCache::new(ctx.paths.cache_dir());
    let older_than = older_than_hours.map(|hours| Duration::from_secs(hours.saturating_mul(3600)));
    let removed = cache.purge(older_than);
    println!("Removed {} cached response(s)", removed);
}
