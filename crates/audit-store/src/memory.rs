use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::RwLock;

use healkit_core_types::{
    AttemptId, HealStatus, HealingOutcome, LocatorAttempt, NewHealingOutcome, NewLocatorAttempt,
    OutcomeId,
};

use crate::api::{AuditRepository, AuditResult, AuditView};
use crate::errors::PersistenceErrorKind;
use crate::metrics::AuditMetrics;
use crate::model::{name_matches, AttemptQuery, AuditStats, HealingHistoryRow, HistoryQuery};

#[derive(Default)]
struct Tables {
    attempts: Vec<LocatorAttempt>,
    outcomes: Vec<HealingOutcome>,
}

impl Tables {
    fn attempt(&self, id: AttemptId) -> Option<&LocatorAttempt> {
        // ids are 1-based positions in `attempts`
        usize::try_from(id.0)
            .ok()
            .and_then(|pos| pos.checked_sub(1))
            .and_then(|idx| self.attempts.get(idx))
    }
}

/// Audit trail held in process memory. Writes are serialized by a single lock.
#[derive(Default)]
pub struct InMemoryAuditRepository {
    tables: RwLock<Tables>,
    metrics: AuditMetrics,
}

impl InMemoryAuditRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> AuditMetrics {
        self.metrics.clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.tables.read().attempts.len()
    }

    pub fn outcome_count(&self) -> usize {
        self.tables.read().outcomes.len()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn insert_attempt(&self, attempt: NewLocatorAttempt) -> AuditResult<AttemptId> {
        let mut tables = self.tables.write();
        let id = AttemptId(tables.attempts.len() as i64 + 1);
        tables.attempts.push(LocatorAttempt::from_new(id, attempt));
        let result = Ok(id);
        self.metrics.record_attempt(&result);
        result
    }

    async fn insert_outcome(&self, outcome: NewHealingOutcome) -> AuditResult<OutcomeId> {
        let mut tables = self.tables.write();
        let result = if tables.attempt(outcome.original_attempt_id).is_none() {
            Err(PersistenceErrorKind::UnknownAttempt(outcome.original_attempt_id).into())
        } else {
            let id = OutcomeId(tables.outcomes.len() as i64 + 1);
            tables.outcomes.push(HealingOutcome::from_new(id, outcome));
            Ok(id)
        };
        self.metrics.record_outcome(&result);
        result
    }
}

#[async_trait]
impl AuditView for InMemoryAuditRepository {
    async fn attempts(&self, query: AttemptQuery) -> AuditResult<Vec<LocatorAttempt>> {
        let tables = self.tables.read();
        Ok(tables
            .attempts
            .iter()
            .rev()
            .filter(|attempt| name_matches(&attempt.element_name, query.element_name.as_deref()))
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn outcomes_for(&self, attempt: AttemptId) -> AuditResult<Vec<HealingOutcome>> {
        let tables = self.tables.read();
        Ok(tables
            .outcomes
            .iter()
            .filter(|outcome| outcome.original_attempt_id == attempt)
            .cloned()
            .collect())
    }

    async fn healing_history(&self, query: HistoryQuery) -> AuditResult<Vec<HealingHistoryRow>> {
        let tables = self.tables.read();
        let mut rows = Vec::new();
        for outcome in tables.outcomes.iter().rev() {
            if rows.len() == query.limit {
                break;
            }
            if query.status.is_some_and(|status| status != outcome.status) {
                continue;
            }
            let Some(attempt) = tables.attempt(outcome.original_attempt_id) else {
                continue;
            };
            if !name_matches(&attempt.element_name, query.element_name.as_deref()) {
                continue;
            }
            rows.push(HealingHistoryRow {
                outcome_id: outcome.id,
                attempt_id: attempt.id,
                element_name: attempt.element_name.clone(),
                original: attempt.locator.clone(),
                page_context: attempt.page_context.clone(),
                candidate: outcome.candidate.clone(),
                similarity_score: outcome.similarity_score,
                status: outcome.status,
                created_at: outcome.created_at,
            });
        }
        Ok(rows)
    }

    async fn stats(&self) -> AuditResult<AuditStats> {
        let tables = self.tables.read();
        let needing: HashSet<AttemptId> = tables
            .outcomes
            .iter()
            .map(|outcome| outcome.original_attempt_id)
            .collect();
        let healed: HashSet<AttemptId> = tables
            .outcomes
            .iter()
            .filter(|outcome| outcome.status == HealStatus::Success)
            .map(|outcome| outcome.original_attempt_id)
            .collect();
        Ok(AuditStats::from_counts(
            tables.attempts.len() as u64,
            needing.len() as u64,
            healed.len() as u64,
            tables.outcomes.len() as u64,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use healkit_core_types::Locator;

    fn attempt(name: &str) -> NewLocatorAttempt {
        NewLocatorAttempt {
            element_name: name.to_string(),
            locator: Locator::id(name),
            page_context: "https://example.test/login".into(),
            created_at: Utc::now(),
        }
    }

    fn outcome(id: AttemptId, value: &str, status: HealStatus) -> NewHealingOutcome {
        NewHealingOutcome {
            original_attempt_id: id,
            candidate: Locator::css(value),
            similarity_score: 0.8,
            status,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn ids_are_sequential() {
        let repo = InMemoryAuditRepository::new();
        let first = repo.insert_attempt(attempt("a")).await.unwrap();
        let second = repo.insert_attempt(attempt("b")).await.unwrap();
        assert_eq!(first, AttemptId(1));
        assert_eq!(second, AttemptId(2));
    }

    #[tokio::test]
    async fn rejects_outcome_for_unknown_attempt() {
        let repo = InMemoryAuditRepository::new();
        let err = repo
            .insert_outcome(outcome(AttemptId(7), "#x", HealStatus::Failed))
            .await
            .unwrap_err();
        assert!(err.is_unknown_attempt());
        assert_eq!(repo.outcome_count(), 0);
        assert_eq!(repo.metrics().snapshot().outcomes_failed, 1);
    }

    #[tokio::test]
    async fn history_joins_and_filters() {
        let repo = InMemoryAuditRepository::new();
        let login = repo.insert_attempt(attempt("login_button")).await.unwrap();
        let search = repo.insert_attempt(attempt("search_box")).await.unwrap();
        repo.insert_outcome(outcome(login, "#login", HealStatus::Failed))
            .await
            .unwrap();
        repo.insert_outcome(outcome(login, ".login", HealStatus::Success))
            .await
            .unwrap();
        repo.insert_outcome(outcome(search, "#search", HealStatus::Failed))
            .await
            .unwrap();

        let all = repo.healing_history(HistoryQuery::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].element_name, "search_box");

        let healed = repo
            .healing_history(HistoryQuery {
                status: Some(HealStatus::Success),
                ..HistoryQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(healed.len(), 1);
        assert_eq!(healed[0].candidate, Locator::css(".login"));
        assert_eq!(healed[0].original, Locator::id("login_button"));

        let by_name = repo
            .healing_history(HistoryQuery {
                element_name: Some("LOGIN".into()),
                ..HistoryQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(by_name.len(), 2);
    }

    #[tokio::test]
    async fn stats_count_heals() {
        let repo = InMemoryAuditRepository::new();
        let healed = repo.insert_attempt(attempt("a")).await.unwrap();
        let exhausted = repo.insert_attempt(attempt("b")).await.unwrap();
        repo.insert_attempt(attempt("c")).await.unwrap();
        repo.insert_outcome(outcome(healed, "#a", HealStatus::Success))
            .await
            .unwrap();
        repo.insert_outcome(outcome(exhausted, "#b", HealStatus::Failed))
            .await
            .unwrap();

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.attempts_needing_heal, 2);
        assert_eq!(stats.healed_attempts, 1);
        assert_eq!(stats.exhausted_attempts, 1);
        assert!((stats.heal_success_rate - 0.5).abs() < f64::EPSILON);
    }
}
