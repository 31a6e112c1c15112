use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

/// TTL cache of decoded GET responses, keyed by request url.
///
/// An expired entry is dropped when it is read, and inserts sweep every
/// expired entry at most once per TTL. The HTTP client clears the whole
/// cache after every write, since any write may change a listed resource.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    inner: Arc<DashMap<String, (Value, Instant)>>,
    ttl: Duration,
    last_sweep: Arc<Mutex<Instant>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
            last_sweep: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// A zero TTL disables caching.
    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub fn get(&self, url: &str) -> Option<Value> {
        if let Some(entry) = self.inner.get(url) {
            let (value, inserted) = entry.value();
            if inserted.elapsed() < self.ttl {
                return Some(value.clone());
            }
            drop(entry);
            self.inner.remove(url);
        }
        None
    }

    pub fn insert(&self, url: impl Into<String>, value: Value) {
        if !self.is_enabled() {
            return;
        }
        self.sweep_if_due();
        self.inner.insert(url.into(), (value, Instant::now()));
    }

    fn sweep_if_due(&self) {
        let mut last_sweep = self.last_sweep.lock().unwrap_or_else(PoisonError::into_inner);
        if last_sweep.elapsed() >= self.ttl {
            *last_sweep = Instant::now();
            drop(last_sweep);
            self.evict_expired();
        }
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn evict_expired(&self) {
        self.inner.retain(|_, (_, inserted)| inserted.elapsed() < self.ttl);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_within_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert("/catalog/products", json!([{"id": 1}]));
        assert_eq!(cache.get("/catalog/products"), Some(json!([{"id": 1}])));
        assert_eq!(cache.get("/carts"), None);
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let cache = ResponseCache::new(Duration::from_millis(10));
        cache.insert("/orders", json!({"id": 2}));
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.get("/orders"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_ttl_disables() {
        let cache = ResponseCache::new(Duration::ZERO);
        assert!(!cache.is_enabled());
        cache.insert("/orders", json!({}));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_and_evict() {
        let cache = ResponseCache::new(Duration::from_millis(100));
        cache.insert("/a", json!(1));
        std::thread::sleep(Duration::from_millis(150));
        cache.insert("/b", json!(2));
        cache.evict_expired();
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_sweeps_expired_urls() {
        let cache = ResponseCache::new(Duration::from_millis(5));
        for id in 0..1000 {
            cache.insert(format!("/catalog/products?id:in={id}"), json!({"id": id}));
        }
        std::thread::sleep(Duration::from_millis(20));
        cache.insert("/catalog/products?id:in=1000", json!({"id": 1000}));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_fresh_entries_survive_sweep() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.insert("/carts/a", json!({}));
        cache.insert("/carts/b", json!({}));
        assert_eq!(cache.len(), 2);
    }
}
