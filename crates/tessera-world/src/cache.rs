use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Samples per world unit on the cache grid.
pub const CACHE_QUANT: f64 = 16.0;
const MAX_EXACT: f64 = 4_503_599_627_370_496.0; // 2^52

/// Integer cache key for `(x, z)` when both lie exactly on the 1/16 grid.
///
/// Off-grid coordinates are never cached, so a cached height is always the
/// height of the exact coordinate that produced the key.
#[inline]
pub fn quantize(x: f64, z: f64) -> Option<(i64, i64)> {
    let qx = x * CACHE_QUANT;
    let qz = z * CACHE_QUANT;
    if qx.fract() != 0.0 || qz.fract() != 0.0 || qx.abs() >= MAX_EXACT || qz.abs() >= MAX_EXACT {
        return None;
    }
    Some((qx as i64, qz as i64))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeightCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

struct Inner {
    map: LruCache<(i64, i64), f64>,
    fingerprint: u64,
}

/// Bounded LRU of height samples, tagged with the config fingerprint it was filled under.
pub struct HeightCache {
    inner: Mutex<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl HeightCache {
    pub fn new(capacity: usize, fingerprint: u64) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                map: LruCache::new(cap),
                fingerprint,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: (i64, i64), fingerprint: u64) -> Option<f64> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        debug_assert_eq!(
            inner.fingerprint, fingerprint,
            "height cache read under a config it was not invalidated for"
        );
        if inner.fingerprint != fingerprint {
            let n = inner.map.len() as u64;
            inner.map.clear();
            inner.fingerprint = fingerprint;
            self.evictions.fetch_add(n, Ordering::Relaxed);
        }
        match inner.map.get(&key).copied() {
            Some(h) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(h)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: (i64, i64), height: f64, fingerprint: u64) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.fingerprint != fingerprint {
            return;
        }
        if let Some((old, _)) = inner.map.push(key, height) {
            if old != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Drops every entry and re-tags the cache for `fingerprint`.
    pub fn invalidate(&self, fingerprint: u64) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let n = inner.map.len() as u64;
        inner.map.clear();
        inner.fingerprint = fingerprint;
        if n > 0 {
            self.evictions.fetch_add(n, Ordering::Relaxed);
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .map(|i| i.map.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> HeightCacheStats {
        HeightCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
