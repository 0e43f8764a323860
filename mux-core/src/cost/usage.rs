use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One line of the usage log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub timestamp: DateTime<Utc>,
    pub model: String,
    pub operation: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
}

impl UsageRecord {
    pub fn new(
        model: impl Into<String>,
        operation: impl Into<String>,
        input_tokens: u64,
        output_tokens: u64,
        cost: f64,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            model: model.into(),
            operation: operation.into(),
            input_tokens,
            output_tokens,
            cost: (cost * 1e6).round() / 1e6,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageBucket {
    pub cost: f64,
    pub calls: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageStats {
    pub total_cost: f64,
    pub total_calls: u64,
    pub by_model: BTreeMap<String, UsageBucket>,
    pub by_operation: BTreeMap<String, UsageBucket>,
}

impl UsageStats {
    fn add(&mut self, record: &UsageRecord) {
        self.total_cost += record.cost;
        self.total_calls += 1;
        for bucket in [
            self.by_model.entry(record.model.clone()).or_default(),
            self.by_operation.entry(record.operation.clone()).or_default(),
        ] {
            bucket.cost += record.cost;
            bucket.calls += 1;
        }
    }
}

/// Append-only NDJSON log of billed calls.
#[derive(Debug, Clone)]
pub struct UsageLog {
    path: PathBuf,
}

impl UsageLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record. Each record goes out in a single write so
    /// concurrent appenders never interleave within a line. Failures are
    /// logged and reported as `false`.
    pub fn record(&self, record: &UsageRecord) -> bool {
        match self.append(record) {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, path = %self.path.display(), "failed to log usage");
                false
            }
        }
    }

    fn append(&self, record: &UsageRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(&line)
    }

    /// Aggregate the log, optionally over the last `days` days only.
    /// Malformed lines are skipped.
    pub fn stats(&self, days: Option<u32>) -> UsageStats {
        let cutoff = days.map(|days| Utc::now() - Duration::days(i64::from(days)));
        let mut stats = UsageStats::default();

        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(err) => {
                if err.kind() != ErrorKind::NotFound {
                    warn!(%err, path = %self.path.display(), "failed to read usage log");
                }
                return stats;
            }
        };

        let mut skipped = 0usize;
        for line in BufReader::new(file).lines() {
            let Ok(line) = line else {
                skipped += 1;
                continue;
            };
            if line.trim().is_empty() {
                continue;
            }
            let record: UsageRecord = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };
            if cutoff.map_or(true, |cutoff| record.timestamp >= cutoff) {
                stats.add(&record);
            }
        }

        if skipped > 0 {
            debug!(skipped, path = %self.path.display(), "skipped malformed usage lines");
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cost_rounded_to_six_places() {
        let record = UsageRecord::new("gpt-5.2", "review", 1, 1, 0.00875012345);
        assert_eq!(record.cost, 0.00875);
    }

    #[test]
    fn test_record_and_aggregate() {
        let dir = TempDir::new().unwrap();
        let log = UsageLog::new(dir.path().join("logs").join("usage.jsonl"));

        assert!(log.record(&UsageRecord::new("gpt-5.2", "plan", 100, 50, 0.5)));
        assert!(log.record(&UsageRecord::new("gpt-5.2", "review", 100, 50, 0.25)));
        assert!(log.record(&UsageRecord::new("gemini-3-flash-preview", "review", 10, 5, 0.125)));

        let stats = log.stats(None);
        assert_eq!(stats.total_calls, 3);
        assert_eq!(stats.total_cost, 0.875);
        assert_eq!(stats.by_model["gpt-5.2"], UsageBucket { cost: 0.75, calls: 2 });
        assert_eq!(stats.by_operation["review"].calls, 2);
        assert_eq!(stats.by_operation["plan"].cost, 0.5);
    }

    #[test]
    fn test_stats_skip_malformed_and_old_lines() {
        let dir = TempDir::new().unwrap();
        let log = UsageLog::new(dir.path().join("usage.jsonl"));
        log.record(&UsageRecord::new("gpt-5.2", "review", 1, 1, 1.0));

        let mut old = UsageRecord::new("gpt-4", "review", 1, 1, 2.0);
        old.timestamp = Utc::now() - Duration::days(40);
        log.record(&old);

        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        file.write_all(b"not json\n\n{\"model\": 1}\n").unwrap();

        assert_eq!(log.stats(None).total_calls, 2);
        let recent = log.stats(Some(30));
        assert_eq!(recent.total_calls, 1);
        assert_eq!(recent.total_cost, 1.0);
    }

    #[test]
    fn test_missing_log_is_empty() {
        let dir = TempDir::new().unwrap();
        let log = UsageLog::new(dir.path().join("usage.jsonl"));
        assert_eq!(log.stats(Some(7)), UsageStats::default());
    }
}
