//! In-memory query cache with TTL expiry, LRU eviction and a per-key
//! single-flight guard.
//!
//! Every query path goes through this cache: resolved locations, current
//! conditions and historical series all share one keyspace, discriminated by
//! the query kind. Entries expire on read once their TTL has passed and are
//! evicted least-recently-used first under capacity pressure.
//!
//! The single-flight guard serializes fetches for the same key: the first
//! caller acquires the key's flight and performs the upstream call, later
//! callers wait on the same flight and re-check the cache once it is
//! released, so at most one fetch per key is ever in flight.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tokio::sync::OwnedMutexGuard;

use crate::models::{CurrentConditions, HistoricalSeries, Location};

/// What a cache entry answers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Location resolution for a normalized input string
    Resolve,
    /// Current conditions at a location
    Current,
    /// Historical observations for a date range
    History { start: NaiveDate, end: NaiveDate },
}

/// Cache key: normalized location plus query kind (and date range for
/// history queries).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub location: String,
    pub kind: QueryKind,
}

impl CacheKey {
    /// Key for a resolution query, from the normalized input text.
    #[must_use]
    pub fn resolve(normalized_input: &str) -> Self {
        Self {
            location: normalized_input.to_string(),
            kind: QueryKind::Resolve,
        }
    }

    /// Key for a current-conditions query at a resolved location.
    #[must_use]
    pub fn current(location: &Location) -> Self {
        Self {
            location: location.coordinate_key(),
            kind: QueryKind::Current,
        }
    }

    /// Key for a history query at a resolved location.
    #[must_use]
    pub fn history(location: &Location, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            location: location.coordinate_key(),
            kind: QueryKind::History { start, end },
        }
    }
}

/// Payload stored under a cache key. The variant always matches the key's
/// query kind.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Location(Location),
    Current(CurrentConditions),
    History(HistoricalSeries),
}

#[derive(Debug)]
struct Entry {
    value: CachedValue,
    expires_at: Instant,
    last_access: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<CacheKey, Entry>,
    tick: u64,
}

/// Bounded in-memory cache. Cheap to share behind an `Arc`; all methods take
/// `&self`.
#[derive(Debug)]
pub struct Cache {
    inner: Mutex<Inner>,
    flights: Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
    max_entries: usize,
}

impl Cache {
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            flights: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Retrieves a value if it exists and has not expired.
    /// Returns `None` for cache misses or expired entries.
    pub fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.tick += 1;
        let tick = inner.tick;
        let now = Instant::now();

        let expired = match inner.entries.get_mut(key) {
            Some(entry) if entry.expires_at > now => {
                tracing::debug!(?key, "cache hit");
                entry.last_access = tick;
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            tracing::debug!(?key, "cache entry expired");
            inner.entries.remove(key);
        } else {
            tracing::debug!(?key, "cache miss");
        }
        None
    }

    /// Stores a value with a time-to-live. Under capacity pressure the
    /// least-recently-used entry is evicted first (expired entries go first).
    pub fn put(&self, key: CacheKey, value: CachedValue, ttl: Duration) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.tick += 1;
        let tick = inner.tick;

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_entries {
            let now = Instant::now();
            inner.entries.retain(|_, entry| entry.expires_at > now);

            if inner.entries.len() >= self.max_entries {
                let victim = inner
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_access)
                    .map(|(k, _)| k.clone());
                if let Some(victim) = victim {
                    tracing::debug!(key = ?victim, "evicting least-recently-used entry");
                    inner.entries.remove(&victim);
                }
            }
        }

        inner.entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + ttl,
                last_access: tick,
            },
        );
    }

    /// Manually removes a key from the cache.
    pub fn invalidate(&self, key: &CacheKey) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.entries.remove(key);
    }

    /// Number of live entries (expired ones may still be counted until read
    /// or evicted).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Acquire the single-flight guard for a key, waiting if another caller
    /// already holds it. Callers must re-check the cache after acquisition:
    /// the previous holder usually populated it.
    pub async fn begin_flight(&self, key: &CacheKey) -> FlightGuard<'_> {
        let slot = {
            let mut flights = self.flights.lock().expect("flight map lock poisoned");
            flights
                .entry(key.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        let permit = slot.lock_owned().await;
        FlightGuard {
            cache: self,
            key: key.clone(),
            permit: Some(permit),
        }
    }
}

/// Exclusive right to fetch a key. Dropping the guard wakes the next waiter
/// and removes the flight slot once nobody is queued on it.
#[derive(Debug)]
pub struct FlightGuard<'a> {
    cache: &'a Cache,
    key: CacheKey,
    permit: Option<OwnedMutexGuard<()>>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        // Release the permit before inspecting the slot: the guard itself
        // holds one Arc reference while alive.
        self.permit.take();
        let mut flights = self.cache.flights.lock().expect("flight map lock poisoned");
        if let Some(slot) = flights.get(&self.key) {
            if Arc::strong_count(slot) == 1 {
                flights.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(name: &str) -> Location {
        Location::new(52.52, 13.41, name.to_string())
    }

    fn value(name: &str) -> CachedValue {
        CachedValue::Location(location(name))
    }

    fn assert_location(value: Option<CachedValue>, name: &str) {
        match value {
            Some(CachedValue::Location(loc)) => assert_eq!(loc.name, name),
            other => panic!("expected cached location '{name}', got {other:?}"),
        }
    }

    #[test]
    fn test_put_then_get() {
        let cache = Cache::new(8);
        let key = CacheKey::resolve("berlin");
        cache.put(key.clone(), value("Berlin"), Duration::from_secs(60));
        assert_location(cache.get(&key), "Berlin");
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = Cache::new(8);
        let key = CacheKey::resolve("berlin");
        cache.put(key.clone(), value("Berlin"), Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate() {
        let cache = Cache::new(8);
        let key = CacheKey::resolve("berlin");
        cache.put(key.clone(), value("Berlin"), Duration::from_secs(60));
        cache.invalidate(&key);
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn test_lru_eviction_under_capacity_pressure() {
        let cache = Cache::new(2);
        let first = CacheKey::resolve("first");
        let second = CacheKey::resolve("second");
        let third = CacheKey::resolve("third");

        cache.put(first.clone(), value("First"), Duration::from_secs(60));
        cache.put(second.clone(), value("Second"), Duration::from_secs(60));

        // Touch the first entry so the second becomes least recently used.
        assert_location(cache.get(&first), "First");

        cache.put(third.clone(), value("Third"), Duration::from_secs(60));

        assert_location(cache.get(&first), "First");
        assert!(cache.get(&second).is_none());
        assert_location(cache.get(&third), "Third");
    }

    #[test]
    fn test_history_keys_distinguish_ranges() {
        let cache = Cache::new(8);
        let loc = location("Berlin");
        let june = CacheKey::history(
            &loc,
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 7).unwrap(),
        );
        let july = CacheKey::history(
            &loc,
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 7).unwrap(),
        );
        cache.put(june.clone(), value("June"), Duration::from_secs(60));
        assert!(cache.get(&july).is_none());
        assert_location(cache.get(&june), "June");
    }

    #[tokio::test]
    async fn test_single_flight_serializes_same_key() {
        let cache = Arc::new(Cache::new(8));
        let key = CacheKey::resolve("berlin");
        let (acquired_tx, acquired_rx) = tokio::sync::oneshot::channel();

        let holder = {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            tokio::spawn(async move {
                let guard = cache.begin_flight(&key).await;
                acquired_tx.send(()).expect("receiver alive");
                tokio::time::sleep(Duration::from_millis(50)).await;
                cache.put(key.clone(), value("Berlin"), Duration::from_secs(60));
                drop(guard);
            })
        };

        acquired_rx.await.expect("holder acquired the flight");

        let _guard = cache.begin_flight(&key).await;
        // By the time the flight is acquired, the first holder has populated
        // the cache.
        assert_location(cache.get(&key), "Berlin");

        holder.await.expect("holder task panicked");
    }

    #[tokio::test]
    async fn test_flight_slot_cleaned_up_after_last_guard() {
        let cache = Cache::new(8);
        let key = CacheKey::resolve("berlin");
        {
            let _guard = cache.begin_flight(&key).await;
        }
        let flights = cache.flights.lock().expect("flight map lock poisoned");
        assert!(flights.is_empty());
    }
}
