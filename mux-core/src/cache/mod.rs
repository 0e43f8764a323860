//! Disk-backed response cache.
//!
//! One JSON file per fingerprint under a single directory. Entries carry
//! their creation time; freshness is decided by the TTL passed to each
//! lookup, so callers with different policies share the same entries.
//! Every failure in here degrades to a miss or a warning.

pub mod fingerprint;

pub use fingerprint::Fingerprint;

use crate::storage::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub timestamp: DateTime<Utc>,
    pub model: String,
    #[serde(rename = "response")]
    pub response_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub count: usize,
    pub total_size_bytes: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

impl CacheStats {
    pub fn total_size_mb(&self) -> f64 {
        (self.total_size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
    }
}

#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    /// The directory is created on the first store, not here.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{}.json", fingerprint))
    }

    /// Cached response for the request, if present and no older than `ttl`.
    ///
    /// An expired entry is deleted on the way out.
    pub fn lookup(
        &self,
        model: &str,
        prompt: &str,
        system_prompt: Option<&str>,
        ttl: Duration,
    ) -> Option<String> {
        self.lookup_at(model, prompt, system_prompt, ttl, Utc::now())
    }

    fn lookup_at(
        &self,
        model: &str,
        prompt: &str,
        system_prompt: Option<&str>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Option<String> {
        let fingerprint = Fingerprint::compute(model, system_prompt, prompt);
        let path = self.entry_path(&fingerprint);
        let entry = read_entry(&path)?;

        // Whole seconds, so a zero TTL still serves an entry stored this second.
        let expired = match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(entry.timestamp).num_seconds() > ttl.num_seconds(),
            // Longer than chrono can represent: never expires.
            Err(_) => false,
        };
        if expired {
            debug!(%fingerprint, model, "cache entry expired");
            if let Err(err) = fs::remove_file(&path) {
                debug!(%err, path = %path.display(), "failed to evict expired cache entry");
            }
            return None;
        }

        debug!(%fingerprint, model, "cache hit");
        Some(entry.response_text)
    }

    /// Persist a response. Returns whether the entry was written; failures
    /// are logged and otherwise ignored.
    pub fn store(
        &self,
        model: &str,
        prompt: &str,
        system_prompt: Option<&str>,
        response_text: &str,
    ) -> bool {
        let fingerprint = Fingerprint::compute(model, system_prompt, prompt);
        let path = self.entry_path(&fingerprint);
        let entry = CacheEntry {
            timestamp: Utc::now(),
            model: model.to_string(),
            response_text: response_text.to_string(),
        };

        let payload = match serde_json::to_vec(&entry) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%err, "failed to serialize cache entry");
                return false;
            }
        };

        match write_atomic(&path, &payload) {
            Ok(()) => {
                debug!(%fingerprint, model, "cache store");
                true
            }
            Err(err) => {
                warn!(%err, path = %path.display(), "failed to cache response");
                false
            }
        }
    }

    /// Remove entries, all of them or only those stored at least
    /// `older_than` ago. Returns how many files were removed.
    pub fn purge(&self, older_than: Option<Duration>) -> usize {
        let cutoff = match older_than {
            None => None,
            Some(age) => {
                let cutoff = chrono::Duration::from_std(age)
                    .ok()
                    .and_then(|age| Utc::now().checked_sub_signed(age));
                match cutoff {
                    Some(cutoff) => Some(cutoff),
                    // Nothing can be that old.
                    None => return 0,
                }
            }
        };

        let mut removed = 0;
        for path in self.entry_files() {
            if let Some(cutoff) = cutoff {
                match read_entry(&path) {
                    Some(entry) if entry.timestamp <= cutoff => {}
                    _ => continue,
                }
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) => debug!(%err, path = %path.display(), "skipping cache entry"),
            }
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for path in self.entry_files() {
            let Ok(meta) = fs::metadata(&path) else {
                continue;
            };
            stats.count += 1;
            stats.total_size_bytes += meta.len();

            if let Some(entry) = read_entry(&path) {
                let ts = entry.timestamp;
                if stats.oldest.map_or(true, |oldest| ts < oldest) {
                    stats.oldest = Some(ts);
                }
                if stats.newest.map_or(true, |newest| ts > newest) {
                    stats.newest = Some(ts);
                }
            }
        }
        stats
    }

    fn entry_files(&self) -> Vec<PathBuf> {
        let dir = match fs::read_dir(&self.dir) {
            Ok(dir) => dir,
            Err(err) => {
                if err.kind() != ErrorKind::NotFound {
                    warn!(%err, dir = %self.dir.display(), "failed to read cache directory");
                }
                return Vec::new();
            }
        };

        dir.filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().map_or(false, |ext| ext == "json"))
            .collect()
    }
}

fn read_entry(path: &Path) -> Option<CacheEntry> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return None,
        Err(err) => {
            warn!(%err, path = %path.display(), "failed to read cache entry");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(entry) => Some(entry),
        Err(err) => {
            warn!(%err, path = %path.display(), "failed to parse cache entry");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HOUR: Duration = Duration::from_secs(3600);

    fn stored_at(cache: &ResponseCache, model: &str, prompt: &str, system: Option<&str>) -> DateTime<Utc> {
        let path = cache.entry_path(&Fingerprint::compute(model, system, prompt));
        read_entry(&path).unwrap().timestamp
    }

    #[test]
    fn test_ttl_boundary() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path());
        assert!(cache.store("m", "p", Some("s"), "r"));
        let t = stored_at(&cache, "m", "p", Some("s"));
        let ttl = 24 * HOUR;
        let eps = chrono::Duration::seconds(1);
        let ttl_c = chrono::Duration::from_std(ttl).unwrap();

        assert_eq!(
            cache.lookup_at("m", "p", Some("s"), ttl, t + ttl_c - eps).as_deref(),
            Some("r")
        );
        // Age equal to the TTL is still fresh.
        assert_eq!(
            cache.lookup_at("m", "p", Some("s"), ttl, t + ttl_c).as_deref(),
            Some("r")
        );
        assert_eq!(cache.lookup_at("m", "p", Some("s"), ttl, t + ttl_c + eps), None);

        let path = cache.entry_path(&Fingerprint::compute("m", Some("s"), "p"));
        assert!(!path.exists(), "expired entry should be evicted");
    }

    #[test]
    fn test_zero_ttl_serves_fresh_entry() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path());
        assert!(cache.store("m", "p", None, "r"));
        let t = stored_at(&cache, "m", "p", None);

        assert_eq!(cache.lookup("m", "p", None, Duration::ZERO).as_deref(), Some("r"));
        assert_eq!(
            cache.lookup_at("m", "p", None, Duration::ZERO, t + chrono::Duration::milliseconds(999)).as_deref(),
            Some("r")
        );
        assert_eq!(cache.lookup_at("m", "p", None, Duration::ZERO, t + chrono::Duration::seconds(1)), None);
    }

    #[test]
    fn test_ttl_is_per_call() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path());
        cache.store("m", "p", None, "r");
        let t = stored_at(&cache, "m", "p", None);
        let later = t + chrono::Duration::hours(2);

        assert_eq!(cache.lookup_at("m", "p", None, 24 * HOUR, later).as_deref(), Some("r"));
        assert_eq!(cache.lookup_at("m", "p", None, HOUR, later), None);
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path());
        let path = cache.entry_path(&Fingerprint::compute("m", None, "p"));
        fs::write(&path, b"{\"timestamp\": \"yesterday\"").unwrap();

        assert_eq!(cache.lookup("m", "p", None, HOUR), None);
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path().join("absent"));
        assert_eq!(cache.lookup("m", "p", None, HOUR), None);
        assert_eq!(cache.purge(None), 0);
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_entry_file_format() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path());
        cache.store("gpt-5.2", "p", None, "hello");
        let path = cache.entry_path(&Fingerprint::compute("gpt-5.2", None, "p"));
        let value: serde_json::Value = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();

        assert_eq!(value["model"], "gpt-5.2");
        assert_eq!(value["response"], "hello");
        assert!(DateTime::parse_from_rfc3339(value["timestamp"].as_str().unwrap()).is_ok());
    }
}
