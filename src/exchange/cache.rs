//! Short-lived position cache keyed by contract.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy)]
struct CachedPosition {
    size: Decimal,
    fetched_at: Instant,
}

/// Per-venue cache of net position reads.
///
/// Entries are keyed by contract so tasks trading different contracts on
/// the same venue never see each other's positions.
#[derive(Debug)]
pub struct PositionCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedPosition>>,
}

impl PositionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cached size for `contract` if still fresh.
    pub async fn get(&self, contract: &str) -> Option<Decimal> {
        if self.ttl.is_zero() {
            return None;
        }
        let entries = self.entries.read().await;
        entries
            .get(contract)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.size)
    }

    pub async fn put(&self, contract: &str, size: Decimal) {
        self.entries.write().await.insert(
            contract.to_string(),
            CachedPosition {
                size,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drop the entry for `contract` (after orders that may move it).
    pub async fn invalidate(&self, contract: &str) {
        self.entries.write().await.remove(contract);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_entries_are_per_contract() {
        let cache = PositionCache::new(Duration::from_secs(5));
        cache.put("BTCUSDT", dec!(0.5)).await;

        assert_eq!(cache.get("BTCUSDT").await, Some(dec!(0.5)));
        assert_eq!(cache.get("ETHUSDT").await, None);

        cache.invalidate("BTCUSDT").await;
        assert_eq!(cache.get("BTCUSDT").await, None);
    }

    #[tokio::test]
    async fn test_expired_entries_are_ignored() {
        let cache = PositionCache::new(Duration::from_millis(1));
        cache.put("BTCUSDT", dec!(1)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.get("BTCUSDT").await, None);
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let cache = PositionCache::new(Duration::ZERO);
        cache.put("BTCUSDT", dec!(1)).await;
        assert_eq!(cache.get("BTCUSDT").await, None);
    }
}
