//! Counters for cache monitoring.

use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters for one cache instance.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    skipped_rows: AtomicU64,
    rows_written: AtomicU64,
}

/// A point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    /// Lookups that returned at least one entry.
    pub hits: u64,
    /// Lookups that ended in a miss.
    pub misses: u64,
    /// Stored rows dropped from results because they could not be decoded.
    pub skipped_rows: u64,
    /// Rows committed by `put`.
    pub rows_written: u64,
}

impl CacheStats {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self, rows: u64) {
        self.skipped_rows.fetch_add(rows, Ordering::Relaxed);
    }

    pub(crate) fn record_written(&self, rows: u64) {
        self.rows_written.fetch_add(rows, Ordering::Relaxed);
    }

    /// Read all counters.
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            skipped_rows: self.skipped_rows.load(Ordering::Relaxed),
            rows_written: self.rows_written.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = CacheStats::default();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        stats.record_skipped(3);
        stats.record_written(5);
        stats.record_written(2);

        assert_eq!(
            stats.snapshot(),
            CacheStatsSnapshot {
                hits: 2,
                misses: 1,
                skipped_rows: 3,
                rows_written: 7,
            }
        );
    }
}
