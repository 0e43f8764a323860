/// Response cache behaviour on a real directory

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, Utc};
    use mux_core::cache::{CacheEntry, Fingerprint, ResponseCache};
    use std::collections::HashSet;
    use std::fs;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(24 * 3600);

    fn write_entry(cache: &ResponseCache, model: &str, prompt: &str, age: ChronoDuration) {
        let entry = CacheEntry {
            timestamp: Utc::now() - age,
            model: model.to_string(),
            response_text: format!("old answer to {}", prompt),
        };
        fs::create_dir_all(cache.dir()).unwrap();
        let path = cache.entry_path(&Fingerprint::compute(model, None, prompt));
        fs::write(path, serde_json::to_vec(&entry).unwrap()).unwrap();
    }

    fn file_names(cache: &ResponseCache) -> Vec<String> {
        fs::read_dir(cache.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect()
    }

    #[test]
    fn test_store_then_lookup() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path().join("cache"));

        assert!(cache.store("gpt-5.2", "review this", Some("be strict"), "LGTM"));
        assert_eq!(
            cache.lookup("gpt-5.2", "review this", Some("be strict"), DAY).as_deref(),
            Some("LGTM")
        );
        assert_eq!(cache.lookup("gpt-5.2", "review this", None, DAY), None);
        assert_eq!(cache.lookup("gpt-4o", "review this", Some("be strict"), DAY), None);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_lookup() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path());
        write_entry(&cache, "m", "p", ChronoDuration::hours(25));

        assert_eq!(cache.lookup("m", "p", None, DAY), None);
        assert!(!cache.entry_path(&Fingerprint::compute("m", None, "p")).exists());
    }

    #[test]
    fn test_purge_by_age() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path());
        write_entry(&cache, "m", "old", ChronoDuration::hours(48));
        write_entry(&cache, "m", "older", ChronoDuration::hours(72));
        cache.store("m", "fresh", None, "new");
        fs::write(dir.path().join("notes.txt"), "not a cache entry").unwrap();

        assert_eq!(cache.purge(Some(DAY)), 2);
        assert_eq!(cache.lookup("m", "fresh", None, DAY).as_deref(), Some("new"));

        assert_eq!(cache.purge(None), 1);
        assert_eq!(file_names(&cache), vec!["notes.txt".to_string()]);
    }

    #[test]
    fn test_stats() {
        let dir = TempDir::new().unwrap();
        let cache = ResponseCache::new(dir.path());
        write_entry(&cache, "m", "a", ChronoDuration::hours(10));
        write_entry(&cache, "m", "b", ChronoDuration::hours(1));
        fs::write(dir.path().join("broken.json"), b"{").unwrap();

        let stats = cache.stats();
        assert_eq!(stats.count, 3);
        assert!(stats.total_size_bytes > 0);
        let (oldest, newest) = (stats.oldest.unwrap(), stats.newest.unwrap());
        assert!(newest - oldest > ChronoDuration::hours(8));
    }

    #[test]
    fn test_concurrent_distinct_stores_never_expose_partial_entries() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(ResponseCache::new(dir.path().join("cache")));
        let writers = 16;
        let response = |i: usize| format!("{}-", i).repeat(8 * 1024);
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    while !done.load(Ordering::SeqCst) {
                        for i in 0..writers {
                            if let Some(text) = cache.lookup("m", &format!("prompt {}", i), None, DAY) {
                                assert_eq!(text, response(i), "partial or foreign entry observed");
                            }
                        }
                    }
                })
            })
            .collect();

        let handles: Vec<_> = (0..writers)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || assert!(cache.store("m", &format!("prompt {}", i), None, &response(i))))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        done.store(true, Ordering::SeqCst);
        for reader in readers {
            reader.join().unwrap();
        }

        let names = file_names(&cache);
        assert_eq!(names.len(), writers, "temp files left behind: {:?}", names);
        for i in 0..writers {
            assert_eq!(cache.lookup("m", &format!("prompt {}", i), None, DAY), Some(response(i)));
        }
    }

    #[test]
    fn test_same_fingerprint_writers_last_one_wins() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(ResponseCache::new(dir.path()));
        let answers: Vec<String> = (0..8).map(|i| format!("answer {}", i)).collect();

        let handles: Vec<_> = answers
            .iter()
            .cloned()
            .map(|answer| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.store("m", "same", Some("sys"), &answer))
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        let stored = cache.lookup("m", "same", Some("sys"), DAY).unwrap();
        let expected: HashSet<_> = answers.into_iter().collect();
        assert!(expected.contains(&stored));
        assert_eq!(file_names(&cache).len(), 1);
    }
}
