use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Write counters shared by every clone of a repository.
#[derive(Clone, Default)]
pub struct AuditMetrics {
    inner: Arc<AuditMetricsInner>,
}

#[derive(Default)]
struct AuditMetricsInner {
    attempts_ok: AtomicU64,
    attempts_failed: AtomicU64,
    outcomes_ok: AtomicU64,
    outcomes_failed: AtomicU64,
}

impl AuditMetrics {
    pub fn record_attempt<T, E>(&self, result: &Result<T, E>) {
        let counter = if result.is_ok() {
            &self.inner.attempts_ok
        } else {
            &self.inner.attempts_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_outcome<T, E>(&self, result: &Result<T, E>) {
        let counter = if result.is_ok() {
            &self.inner.outcomes_ok
        } else {
            &self.inner.outcomes_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> AuditMetricSnapshot {
        AuditMetricSnapshot {
            attempts_ok: self.inner.attempts_ok.load(Ordering::Relaxed),
            attempts_failed: self.inner.attempts_failed.load(Ordering::Relaxed),
            outcomes_ok: self.inner.outcomes_ok.load(Ordering::Relaxed),
            outcomes_failed: self.inner.outcomes_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AuditMetricSnapshot {
    pub attempts_ok: u64,
    pub attempts_failed: u64,
    pub outcomes_ok: u64,
    pub outcomes_failed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_result() {
        let metrics = AuditMetrics::default();
        metrics.record_attempt::<(), ()>(&Ok(()));
        metrics.record_outcome::<(), ()>(&Err(()));
        metrics.clone().record_outcome::<(), ()>(&Ok(()));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.attempts_ok, 1);
        assert_eq!(snapshot.attempts_failed, 0);
        assert_eq!(snapshot.outcomes_ok, 1);
        assert_eq!(snapshot.outcomes_failed, 1);
    }
}
