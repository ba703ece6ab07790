use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::debug;

use super::{ChartData, ChartKey, CompanyProfile};

// ---------------------------------------------------------------------------
// TtlCache -- thread-safe cache whose entries expire after a fixed TTL
// ---------------------------------------------------------------------------

/// Fetched charts per (ticker, period).
pub type ChartCache = TtlCache<ChartKey, ChartData>;
/// Company profiles per upper-cased ticker.
pub type ProfileCache = TtlCache<String, CompanyProfile>;

struct CacheEntry<V> {
    value: Arc<V>,
    expires_at: Instant,
}

/// Short-lived cache of provider responses so that flipping between companies
/// does not hammer the provider. Entries expire after `ttl`; a zero TTL turns
/// the cache into a no-op.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Display,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Return the cached value for `key` if present and not expired.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let map = self.entries.read();
        let entry = map.get(key)?;
        if Instant::now() < entry.expires_at {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Store a freshly fetched value. Expired entries are swept on the way.
    pub fn insert(&self, key: K, value: Arc<V>) {
        if self.ttl.is_zero() {
            return;
        }
        let now = Instant::now();
        let mut map = self.entries.write();
        map.retain(|_, e| e.expires_at > now);
        debug!(key = %key, "cached");
        map.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Drop every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut map = self.entries.write();
        let n = map.len();
        map.clear();
        n
    }

    /// Number of stored entries, expired ones included until the next sweep.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::ChartMeta;
    use crate::types::Period;

    fn chart(symbol: &str) -> Arc<ChartData> {
        Arc::new(ChartData {
            meta: ChartMeta {
                symbol: symbol.to_string(),
                ..ChartMeta::default()
            },
            bars: Vec::new(),
        })
    }

    #[test]
    fn get_returns_inserted_chart() {
        let cache = ChartCache::new(Duration::from_secs(300));
        let key = ChartKey::new("AAPL", Period::OneYear);
        cache.insert(key.clone(), chart("AAPL"));
        assert_eq!(cache.get(&key).unwrap().meta.symbol, "AAPL");
        assert!(cache.get(&ChartKey::new("AAPL", Period::TwoYears)).is_none());
    }

    #[test]
    fn zero_ttl_disables_cache() {
        let cache = ChartCache::new(Duration::ZERO);
        let key = ChartKey::new("MSFT", Period::OneMonth);
        cache.insert(key.clone(), chart("MSFT"));
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn expired_entries_are_not_returned() {
        let cache = ChartCache::new(Duration::from_millis(1));
        let key = ChartKey::new("KO", Period::SixMonths);
        cache.insert(key.clone(), chart("KO"));
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn clear_reports_evicted_count() {
        let cache = ChartCache::new(Duration::from_secs(60));
        cache.insert(ChartKey::new("V", Period::OneYear), chart("V"));
        cache.insert(ChartKey::new("MA", Period::OneYear), chart("MA"));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.clear(), 2);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn profiles_are_keyed_by_ticker() {
        let cache = ProfileCache::new(Duration::from_secs(60));
        let profile = CompanyProfile {
            sector: Some("Technology".into()),
            ..CompanyProfile::default()
        };
        cache.insert("AAPL".to_string(), Arc::new(profile));
        assert_eq!(
            cache.get(&"AAPL".to_string()).unwrap().sector.as_deref(),
            Some("Technology")
        );
        assert!(cache.get(&"MSFT".to_string()).is_none());
    }
}
