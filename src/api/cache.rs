//! Time-bounded cache for idempotent backend reads.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::trace;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);
/// Provider, model and MCP server listings change more often.
pub const LISTING_TTL: Duration = Duration::from_secs(3 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub keys: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RequestCache {
    entries: BTreeMap<String, CacheEntry>,
    default_ttl: Duration,
}

impl Default for RequestCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl RequestCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: BTreeMap::new(),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn get<T: DeserializeOwned>(&mut self, key: &str, ttl: Option<Duration>) -> Option<T> {
        self.get_at(key, ttl, Instant::now())
    }

    pub(crate) fn get_at<T: DeserializeOwned>(
        &mut self,
        key: &str,
        ttl: Option<Duration>,
        now: Instant,
    ) -> Option<T> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let entry = self.entries.get(key)?;
        if now.saturating_duration_since(entry.stored_at) > ttl {
            trace!(key, "request cache entry expired");
            self.entries.remove(key);
            return None;
        }
        serde_json::from_value(entry.value.clone()).ok()
    }

    pub fn put<T: Serialize>(&mut self, key: impl Into<String>, value: &T) {
        self.put_at(key, value, Instant::now());
    }

    pub(crate) fn put_at<T: Serialize>(&mut self, key: impl Into<String>, value: &T, now: Instant) {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.entries.insert(
                    key.into(),
                    CacheEntry {
                        value,
                        stored_at: now,
                    },
                );
            }
            Err(err) => trace!(error = %err, "value not cacheable"),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn clear_prefix(&mut self, prefix: &str) {
        self.entries.retain(|key, _| !key.starts_with(prefix));
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            keys: self.entries.keys().cloned().collect(),
        }
    }
}

/// Build a key of the form `prefix:arg-arg`, with object keys sorted.
pub fn cache_key(prefix: &str, args: &[Value]) -> String {
    let args: Vec<String> = args
        .iter()
        .map(|arg| match arg {
            Value::String(s) => s.clone(),
            other => canonical_json(other),
        })
        .collect();
    format!("{prefix}:{}", args.join("-"))
}

fn canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, String> =
                map.iter().map(|(k, v)| (k, canonical_json(v))).collect();
            let fields: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| format!("{}:{v}", Value::String(k.clone())))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entries_expire_after_their_ttl() {
        let mut cache = RequestCache::default();
        let t0 = Instant::now();
        cache.put_at("api:providers", &vec!["a", "b"], t0);

        let hit: Option<Vec<String>> =
            cache.get_at("api:providers", Some(LISTING_TTL), t0 + Duration::from_secs(179));
        assert_eq!(hit, Some(vec!["a".to_string(), "b".to_string()]));

        let miss: Option<Vec<String>> =
            cache.get_at("api:providers", Some(LISTING_TTL), t0 + Duration::from_secs(181));
        assert_eq!(miss, None);
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn default_ttl_is_five_minutes() {
        let mut cache = RequestCache::default();
        let t0 = Instant::now();
        cache.put_at("k", &1, t0);
        assert_eq!(cache.get_at::<i32>("k", None, t0 + Duration::from_secs(299)), Some(1));
        assert_eq!(cache.get_at::<i32>("k", None, t0 + Duration::from_secs(301)), None);
    }

    #[test]
    fn clears_by_prefix() {
        let mut cache = RequestCache::default();
        cache.put("api:models:1", &1);
        cache.put("api:models:2", &2);
        cache.put("api:providers", &3);
        cache.clear_prefix("api:models");
        assert_eq!(
            cache.stats(),
            CacheStats {
                size: 1,
                keys: vec!["api:providers".into()]
            }
        );
        cache.clear();
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn keys_sort_object_fields() {
        let a = cache_key("api:search", &[json!({"b": 1, "a": {"d": 2, "c": 3}}), json!(5)]);
        let b = cache_key("api:search", &[json!({"a": {"c": 3, "d": 2}, "b": 1}), json!(5)]);
        assert_eq!(a, b);
        assert_eq!(a, r#"api:search:{"a":{"c":3,"d":2},"b":1}-5"#);
        assert_eq!(cache_key("api:models", &[json!("42")]), "api:models:42");
    }
}
