//! Unified Cache Coordinator (spec §4.D): a registry of cache-like
//! subsystems offering a common stats/cleanup/clear surface, used for
//! global pressure-release reporting and smart cleanup.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Adapter implemented by every cache-like subsystem (detail store, script
/// chunk store, hook record store, ...). `cleanup`/`clear` are optional:
/// some caches (e.g. an append-only ring buffer) only support `clear`.
#[async_trait]
pub trait CacheInstance: Send + Sync {
    fn name(&self) -> &'static str;
    async fn stats(&self) -> CacheStats;
    async fn cleanup(&self) -> usize {
        0
    }
    async fn clear(&self) {}
}

#[derive(Debug, Clone, Serialize)]
pub struct GlobalCacheStats {
    pub total_entries: usize,
    pub total_bytes: usize,
    pub average_hit_rate: f64,
    pub per_cache: Vec<(String, CacheStats)>,
}

pub struct UnifiedCacheCoordinator {
    registry: RwLock<Vec<std::sync::Arc<dyn CacheInstance>>>,
}

impl Default for UnifiedCacheCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl UnifiedCacheCoordinator {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Vec::new()),
        }
    }

    pub async fn register(&self, cache: std::sync::Arc<dyn CacheInstance>) {
        self.registry.write().await.push(cache);
    }

    pub async fn global_stats(&self) -> GlobalCacheStats {
        let registry = self.registry.read().await;
        let mut per_cache = Vec::with_capacity(registry.len());
        let mut total_entries = 0;
        let mut total_bytes = 0;
        let mut hit_rate_sum = 0.0;

        for cache in registry.iter() {
            let stats = cache.stats().await;
            total_entries += stats.entries;
            total_bytes += stats.bytes;
            hit_rate_sum += stats.hit_rate();
            per_cache.push((cache.name().to_string(), stats));
        }

        let average_hit_rate = if registry.is_empty() {
            0.0
        } else {
            hit_rate_sum / registry.len() as f64
        };

        GlobalCacheStats {
            total_entries,
            total_bytes,
            average_hit_rate,
            per_cache,
        }
    }

    /// Three-phase smart cleanup, short-circuiting once `target_bytes` of
    /// freed capacity is reached: (1) call every `cleanup()`, (2) clear
    /// caches under 30% of the global average hit rate, (3) clear the two
    /// largest remaining caches.
    pub async fn smart_cleanup(&self, target_bytes: usize) -> usize {
        let registry = self.registry.read().await;
        let mut freed = 0usize;

        for cache in registry.iter() {
            freed += cache.cleanup().await;
            if freed >= target_bytes {
                return freed;
            }
        }

        let global = self.global_stats_locked(&registry).await;
        let threshold = global.average_hit_rate * 0.30;
        for cache in registry.iter() {
            let stats = cache.stats().await;
            if stats.hit_rate() < threshold {
                freed += stats.bytes;
                cache.clear().await;
                if freed >= target_bytes {
                    return freed;
                }
            }
        }

        let mut with_sizes = Vec::with_capacity(registry.len());
        for cache in registry.iter() {
            with_sizes.push((cache.stats().await.bytes, cache.clone()));
        }
        with_sizes.sort_by(|a, b| b.0.cmp(&a.0));
        for (bytes, cache) in with_sizes.into_iter().take(2) {
            freed += bytes;
            cache.clear().await;
            if freed >= target_bytes {
                break;
            }
        }

        freed
    }

    async fn global_stats_locked(
        &self,
        registry: &[std::sync::Arc<dyn CacheInstance>],
    ) -> GlobalCacheStats {
        let mut per_cache = Vec::with_capacity(registry.len());
        let mut total_entries = 0;
        let mut total_bytes = 0;
        let mut hit_rate_sum = 0.0;
        for cache in registry {
            let stats = cache.stats().await;
            total_entries += stats.entries;
            total_bytes += stats.bytes;
            hit_rate_sum += stats.hit_rate();
            per_cache.push((cache.name().to_string(), stats));
        }
        let average_hit_rate = if registry.is_empty() {
            0.0
        } else {
            hit_rate_sum / registry.len() as f64
        };
        GlobalCacheStats {
            total_entries,
            total_bytes,
            average_hit_rate,
            per_cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeCache {
        name: &'static str,
        bytes: usize,
        hits: u64,
        misses: u64,
        cleaned: AtomicUsize,
    }

    #[async_trait]
    impl CacheInstance for FakeCache {
        fn name(&self) -> &'static str {
            self.name
        }
        async fn stats(&self) -> CacheStats {
            CacheStats {
                entries: 1,
                bytes: self.bytes,
                hits: self.hits,
                misses: self.misses,
            }
        }
        async fn cleanup(&self) -> usize {
            self.cleaned.fetch_add(1, Ordering::SeqCst);
            0
        }
    }

    #[tokio::test]
    async fn smart_cleanup_clears_low_hit_rate_caches() {
        let coordinator = UnifiedCacheCoordinator::new();
        coordinator
            .register(Arc::new(FakeCache {
                name: "good",
                bytes: 100,
                hits: 90,
                misses: 10,
                cleaned: AtomicUsize::new(0),
            }))
            .await;
        coordinator
            .register(Arc::new(FakeCache {
                name: "bad",
                bytes: 200,
                hits: 1,
                misses: 99,
                cleaned: AtomicUsize::new(0),
            }))
            .await;

        let freed = coordinator.smart_cleanup(150).await;
        assert!(freed >= 200);
    }
}
