//! Bounded per-session log history
//!
//! Retains the most recent log lines per (realm, session) key with strict
//! FIFO eviction. The live path only appends; reads exist for replay and
//! inspection. Concurrent append from the delivery path is safe while the
//! close path inspects or clears.

use crate::types::{LogKey, LogLine};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

/// Default retained lines per key
pub const DEFAULT_LOG_CACHE_CAP: usize = 2000;

/// Bounded, ordered log line cache keyed by (realm, session)
pub struct SessionLogCache {
    entries: RwLock<HashMap<LogKey, VecDeque<LogLine>>>,
    cap: usize,
}

impl SessionLogCache {
    /// Create a cache retaining at most `cap` lines per key
    pub fn new(cap: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            cap,
        }
    }

    /// Append a line, evicting the single oldest entry at capacity
    pub async fn append(&self, key: &LogKey, line: LogLine) {
        let mut entries = self.entries.write().await;
        let lines = entries.entry(key.clone()).or_default();

        if self.cap > 0 && lines.len() >= self.cap {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Number of lines retained for a key
    pub async fn len(&self, key: &LogKey) -> usize {
        let entries = self.entries.read().await;
        entries.get(key).map_or(0, VecDeque::len)
    }

    /// Whether nothing is retained for a key
    pub async fn is_empty(&self, key: &LogKey) -> bool {
        self.len(key).await == 0
    }

    /// Most recent lines for a key, oldest first, up to `limit`
    pub async fn recent(&self, key: &LogKey, limit: usize) -> Vec<LogLine> {
        let entries = self.entries.read().await;
        entries.get(key).map_or_else(Vec::new, |lines| {
            let skip = lines.len().saturating_sub(limit);
            lines.iter().skip(skip).cloned().collect()
        })
    }

    /// Drop all retained history
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

impl Default for SessionLogCache {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CACHE_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> LogKey {
        LogKey::new("realm1", 7)
    }

    #[tokio::test]
    async fn test_append_and_read() {
        let cache = SessionLogCache::new(10);
        let key = key();

        cache.append(&key, LogLine::new("a")).await;
        cache.append(&key, LogLine::new("b")).await;

        assert_eq!(cache.len(&key).await, 2);
        let lines = cache.recent(&key, 10).await;
        assert_eq!(lines[0].message, "a");
        assert_eq!(lines[1].message, "b");
    }

    #[tokio::test]
    async fn test_fifo_eviction_at_cap() {
        let cache = SessionLogCache::new(3);
        let key = key();

        for i in 0..5 {
            cache.append(&key, LogLine::new(format!("line{}", i))).await;
        }

        assert_eq!(cache.len(&key).await, 3);
        let lines = cache.recent(&key, 10).await;
        let messages: Vec<&str> = lines.iter().map(|l| l.message.as_str()).collect();
        assert_eq!(messages, vec!["line2", "line3", "line4"]);
    }

    #[tokio::test]
    async fn test_bound_holds_for_any_append_count() {
        // final length = min(N, C), content = last C items in order
        let cache = SessionLogCache::new(2000);
        let key = key();

        for i in 0..2500 {
            cache.append(&key, LogLine::new(format!("{}", i))).await;
        }

        assert_eq!(cache.len(&key).await, 2000);
        let lines = cache.recent(&key, 2000).await;
        assert_eq!(lines.first().unwrap().message, "500");
        assert_eq!(lines.last().unwrap().message, "2499");
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let cache = SessionLogCache::new(2);
        let a = LogKey::new("realm1", 1);
        let b = LogKey::new("realm1", 2);

        cache.append(&a, LogLine::new("a1")).await;
        cache.append(&b, LogLine::new("b1")).await;
        cache.append(&a, LogLine::new("a2")).await;
        cache.append(&a, LogLine::new("a3")).await;

        assert_eq!(cache.len(&a).await, 2);
        assert_eq!(cache.len(&b).await, 1);
        assert_eq!(cache.recent(&a, 10).await[0].message, "a2");
    }

    #[tokio::test]
    async fn test_recent_limit() {
        let cache = SessionLogCache::new(10);
        let key = key();
        for i in 0..6 {
            cache.append(&key, LogLine::new(format!("{}", i))).await;
        }

        let last_two = cache.recent(&key, 2).await;
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[0].message, "4");
        assert_eq!(last_two[1].message, "5");
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = SessionLogCache::new(10);
        let key = key();
        cache.append(&key, LogLine::new("x")).await;

        cache.clear().await;
        assert!(cache.is_empty(&key).await);
        assert!(cache.recent(&key, 10).await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_append_stays_bounded() {
        use std::sync::Arc;

        let cache = Arc::new(SessionLogCache::new(100));
        let key = key();

        let mut handles = Vec::new();
        for t in 0..8 {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..100 {
                    cache
                        .append(&key, LogLine::new(format!("t{}-{}", t, i)))
                        .await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.len(&key).await, 100);
    }
}
