//! Crawl counters.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::classification::UrlKind;

/// Monotonic per-job counters, shared by every worker of the job.
#[derive(Debug, Default)]
pub struct CrawlStats {
    fetched: AtomicU64,
    classified_recipe: AtomicU64,
    classified_category: AtomicU64,
    classified_excluded: AtomicU64,
    classified_unknown: AtomicU64,
    fetch_failures: AtomicU64,
    fallback_invocations: AtomicU64,
    retries: AtomicU64,
    dispatched: AtomicU64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a classification verdict.
    pub fn record_kind(&self, kind: UrlKind) {
        let counter = match kind {
            UrlKind::Recipe => &self.classified_recipe,
            UrlKind::Category => &self.classified_category,
            UrlKind::Excluded => &self.classified_excluded,
            UrlKind::Unknown => &self.classified_unknown,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetched(&self) {
        self.fetched.fetch_add(1, Ordering::Relaxed);
    }

    /// A URL abandoned for the rest of the job.
    pub fn record_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallback_invocations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// A URL popped from the frontier and handed to a worker.
    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a dispatch unless `limit` dispatches already happened.
    pub fn try_dispatch(&self, limit: Option<u64>) -> bool {
        match limit {
            None => {
                self.record_dispatched();
                true
            }
            Some(max) => self
                .dispatched
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                    (n < max).then_some(n + 1)
                })
                .is_ok(),
        }
    }

    pub fn fallback_invocations(&self) -> u64 {
        self.fallback_invocations.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            fetched: self.fetched.load(Ordering::Relaxed),
            classified_recipe: self.classified_recipe.load(Ordering::Relaxed),
            classified_category: self.classified_category.load(Ordering::Relaxed),
            classified_excluded: self.classified_excluded.load(Ordering::Relaxed),
            classified_unknown: self.classified_unknown.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            fallback_invocations: self.fallback_invocations.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
        }
    }
}

/// Serializable copy of [`CrawlStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub fetched: u64,
    pub classified_recipe: u64,
    pub classified_category: u64,
    pub classified_excluded: u64,
    pub classified_unknown: u64,
    pub fetch_failures: u64,
    pub fallback_invocations: u64,
    pub retries: u64,
    pub dispatched: u64,
}

impl StatsSnapshot {
    /// Share of dispatched URLs that ended abandoned.
    pub fn failure_ratio(&self) -> f64 {
        if self.dispatched == 0 {
            return 0.0;
        }
        self.fetch_failures as f64 / self.dispatched as f64
    }

    pub fn used_fallback(&self) -> bool {
        self.fallback_invocations > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_snapshot() {
        let stats = CrawlStats::new();
        stats.record_kind(UrlKind::Recipe);
        stats.record_kind(UrlKind::Recipe);
        stats.record_kind(UrlKind::Excluded);
        stats.record_dispatched();
        stats.record_dispatched();
        stats.record_failure();
        stats.record_fallback();

        let snap = stats.snapshot();
        assert_eq!(snap.classified_recipe, 2);
        assert_eq!(snap.classified_excluded, 1);
        assert_eq!(snap.classified_unknown, 0);
        assert!(snap.used_fallback());
        assert!((snap.failure_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_try_dispatch_respects_limit() {
        let stats = CrawlStats::new();
        assert!(stats.try_dispatch(Some(2)));
        assert!(stats.try_dispatch(Some(2)));
        assert!(!stats.try_dispatch(Some(2)));
        assert!(stats.try_dispatch(None));
        assert_eq!(stats.snapshot().dispatched, 3);
    }

    #[test]
    fn test_empty_ratio() {
        assert_eq!(StatsSnapshot::default().failure_ratio(), 0.0);
    }
}
