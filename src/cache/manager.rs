//! In-memory response cache keyed by operation identity and arguments
//!
//! Provides a `ResponseCache` that remembers the result of an asynchronous
//! fetch for a fixed time window, so repeated tool calls with the same
//! arguments do not hit the Canvas API again.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use super::clock::{Clock, SystemClock};

/// Default time-to-live for cached responses, in seconds
pub const DEFAULT_TTL_SECS: u64 = 300;

/// A cached value together with the instant it goes stale
///
/// Value and expiry are always replaced as a pair.
#[derive(Debug, Clone)]
struct CacheEntry {
    /// The normalized result
    value: Value,
    /// When the entry stops being served
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug)]
struct Inner {
    entries: Mutex<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
    default_ttl_secs: u64,
}

/// Builds the cache key for an operation and its arguments
///
/// The key is the identity followed by the JSON rendering of the arguments.
/// Positional arguments should be passed as a JSON array in call order, so
/// `get_course_files([1])` and `get_course_files([2])` never share an entry.
/// Argument values whose renderings coincide will collide; that is accepted.
pub fn cache_key(identity: &str, args: &Value) -> String {
    format!("{}:{}", identity, args)
}

/// Process-wide memoizing cache for tool results
///
/// Cloning is cheap and every clone sees the same entries. Lookups and stores
/// are synchronous; only the compute future passed to
/// [`get_or_compute`](Self::get_or_compute) ever suspends.
///
/// Concurrent misses on the same key are not collapsed: each caller runs its
/// own computation and the last one to finish wins.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    inner: Arc<Inner>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    /// Creates an empty cache on the system clock with the default TTL
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty cache driven by a custom clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                clock,
                default_ttl_secs: DEFAULT_TTL_SECS,
            }),
        }
    }

    /// Sets the TTL used by [`get_or_compute`](Self::get_or_compute)
    ///
    /// Only meaningful before the cache is shared; entries are not touched.
    pub fn with_default_ttl(self, ttl_secs: u64) -> Self {
        let entries = self.lock().clone();
        let clock = Arc::clone(&self.inner.clock);
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(entries),
                clock,
                default_ttl_secs: ttl_secs,
            }),
        }
    }

    /// The TTL applied when none is given explicitly
    pub fn default_ttl(&self) -> u64 {
        self.inner.default_ttl_secs
    }

    /// Current time according to the cache's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the cached value for `key` if it has not expired
    pub fn read(&self, key: &str) -> Option<Value> {
        let now = self.now();
        self.lock()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    /// Stores `value` under `key`, fresh for `ttl_secs` from now
    ///
    /// A TTL of zero stores an entry that is already stale.
    pub fn write(&self, key: &str, value: Value, ttl_secs: u64) {
        let expires_at = expiry(self.now(), ttl_secs);
        self.lock()
            .insert(key.to_string(), CacheEntry { value, expires_at });
    }

    /// Returns the cached result for `identity` + `args`, computing it on a miss
    ///
    /// Uses the cache's default TTL.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        identity: &str,
        args: &Value,
        compute: F,
    ) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        self.get_or_compute_with_ttl(identity, args, self.default_ttl(), compute)
            .await
    }

    /// Returns the cached result for `identity` + `args`, computing it on a miss
    ///
    /// Storing a freshly computed value also sweeps out every expired entry.
    ///
    /// # Arguments
    /// * `identity` - Stable name of the logical operation (e.g. "get_courses")
    /// * `args` - Arguments of the operation, used only to derive the key
    /// * `ttl_secs` - How long a freshly computed value stays live
    /// * `compute` - Performs the real fetch; invoked at most once per call
    ///
    /// # Returns
    /// * `Ok(value)` from the cache or from `compute`
    /// * `Err(e)` straight from `compute`; failures are never stored
    pub async fn get_or_compute_with_ttl<F, Fut, E>(
        &self,
        identity: &str,
        args: &Value,
        ttl_secs: u64,
        compute: F,
    ) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        let key = cache_key(identity, args);

        if let Some(value) = self.read(&key) {
            debug!(key = %key, "cache hit");
            return Ok(value);
        }

        debug!(key = %key, ttl_secs, "cache miss");
        let value = compute().await?;
        let purged = self.purge_expired();
        if purged > 0 {
            debug!(purged, "dropped stale entries");
        }
        self.write(&key, value.clone(), ttl_secs);
        Ok(value)
    }

    /// Removes every entry, live or stale, returning how many were dropped
    pub fn clear(&self) -> usize {
        let mut entries = self.lock();
        let removed = entries.len();
        entries.clear();
        removed
    }

    /// Physically drops entries that have already expired
    pub fn purge_expired(&self) -> usize {
        let now = self.now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Number of stored entries, including stale ones not yet purged
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// `now + ttl_secs`, saturating at the latest representable instant
fn expiry(now: DateTime<Utc>, ttl_secs: u64) -> DateTime<Utc> {
    i64::try_from(ttl_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn create_test_cache() -> (ResponseCache, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap());
        let cache = ResponseCache::with_clock(Arc::new(clock.clone()));
        (cache, clock)
    }

    async fn counted(
        cache: &ResponseCache,
        calls: &AtomicUsize,
        identity: &str,
        args: Value,
    ) -> Value {
        cache
            .get_or_compute(identity, &args, || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok::<_, String>(json!({ "call": n }))
            })
            .await
            .expect("compute should succeed")
    }

    #[test]
    fn test_cache_key_includes_identity_and_args() {
        assert_eq!(cache_key("get_course_files", &json!([42])), "get_course_files:[42]");
        assert_ne!(
            cache_key("get_course_files", &json!([1])),
            cache_key("get_course_pages", &json!([1]))
        );
    }

    #[test]
    fn test_cache_key_preserves_argument_order() {
        let a = cache_key("f", &json!({ "course_id": 1, "recent_only": true }));
        let b = cache_key("f", &json!({ "recent_only": true, "course_id": 1 }));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_hit_suppresses_recomputation() {
        let (cache, _clock) = create_test_cache();
        let calls = AtomicUsize::new(0);

        let first = counted(&cache, &calls, "get_courses", json!([])).await;
        let second = counted(&cache, &calls, "get_courses", json!([])).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_expiry_forces_recomputation() {
        let (cache, clock) = create_test_cache();
        let calls = AtomicUsize::new(0);

        counted(&cache, &calls, "get_courses", json!([])).await;
        clock.advance(Duration::seconds(DEFAULT_TTL_SECS as i64));
        let second = counted(&cache, &calls, "get_courses", json!([])).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(second, json!({ "call": 2 }));
    }

    #[tokio::test]
    async fn test_entry_is_live_just_before_expiry() {
        let (cache, clock) = create_test_cache();
        let calls = AtomicUsize::new(0);

        counted(&cache, &calls, "get_courses", json!([])).await;
        clock.advance(Duration::seconds(DEFAULT_TTL_SECS as i64 - 1));
        counted(&cache, &calls, "get_courses", json!([])).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_args_do_not_share_entries() {
        let (cache, _clock) = create_test_cache();
        let calls = AtomicUsize::new(0);

        counted(&cache, &calls, "f", json!([1])).await;
        counted(&cache, &calls, "f", json!([2])).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_resets_state() {
        let (cache, _clock) = create_test_cache();
        let calls = AtomicUsize::new(0);

        counted(&cache, &calls, "get_courses", json!([])).await;
        assert_eq!(cache.clear(), 1);
        assert!(cache.is_empty());
        counted(&cache, &calls, "get_courses", json!([])).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_computation_is_not_cached() {
        let (cache, _clock) = create_test_cache();
        let calls = AtomicUsize::new(0);

        let counter = &calls;
        let failed: Result<Value, String> = cache
            .get_or_compute("get_courses", &json!([]), || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("upstream unavailable".to_string())
            })
            .await;
        assert_eq!(failed.unwrap_err(), "upstream unavailable");
        assert!(cache.is_empty());

        let value = counted(&cache, &calls, "get_courses", json!([])).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(value, json!({ "call": 2 }));
    }

    #[tokio::test]
    async fn test_explicit_ttl_overrides_default() {
        let (cache, clock) = create_test_cache();
        let calls = AtomicUsize::new(0);

        let counter = &calls;
        for _ in 0..2 {
            cache
                .get_or_compute_with_ttl("todos", &json!([]), 30, || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(json!([]))
                })
                .await
                .unwrap();
            clock.advance(Duration::seconds(31));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_with_default_ttl() {
        let (cache, clock) = create_test_cache();
        let cache = cache.with_default_ttl(10);
        let calls = AtomicUsize::new(0);
        assert_eq!(cache.default_ttl(), 10);

        counted(&cache, &calls, "f", json!([])).await;
        clock.advance(Duration::seconds(10));
        counted(&cache, &calls, "f", json!([])).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_ttl_is_immediately_stale() {
        let (cache, _clock) = create_test_cache();

        cache.write("k", json!(1), 0);

        assert!(cache.read("k").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_write_overwrites_value_and_expiry() {
        let (cache, clock) = create_test_cache();

        cache.write("k", json!("first"), 10);
        clock.advance(Duration::seconds(5));
        cache.write("k", json!("second"), 10);
        clock.advance(Duration::seconds(7));

        assert_eq!(cache.read("k"), Some(json!("second")));
    }

    #[test]
    fn test_purge_expired_removes_only_stale_entries() {
        let (cache, clock) = create_test_cache();

        cache.write("short", json!(1), 5);
        cache.write("long", json!(2), 500);
        clock.advance(Duration::seconds(6));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.read("long"), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_miss_sweeps_stale_entries() {
        let (cache, clock) = create_test_cache();
        let calls = AtomicUsize::new(0);

        cache.write("stale", json!(1), 5);
        clock.advance(Duration::seconds(6));
        counted(&cache, &calls, "get_courses", json!([])).await;

        assert_eq!(cache.len(), 1);
        assert!(cache.read("stale").is_none());
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let (cache, _clock) = create_test_cache();

        cache.write("forever", json!(true), u64::MAX);

        assert_eq!(cache.read("forever"), Some(json!(true)));
    }

    #[test]
    fn test_clones_share_entries() {
        let (cache, _clock) = create_test_cache();
        let other = cache.clone();

        cache.write("k", json!("v"), 60);

        assert_eq!(other.read("k"), Some(json!("v")));
    }

    #[tokio::test]
    async fn test_concurrent_misses_each_compute() {
        let (cache, _clock) = create_test_cache();
        let calls = AtomicUsize::new(0);

        let counter = &calls;
        let compute = || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::task::yield_now().await;
            Ok::<_, String>(json!(n))
        };
        let params_a = json!([]);
        let params_b = json!([]);
        let (a, b) = tokio::join!(
            cache.get_or_compute("slow", &params_a, compute),
            cache.get_or_compute("slow", &params_b, compute),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_ne!(a.unwrap(), b.unwrap());
        assert_eq!(cache.len(), 1);
    }
}
