use std::sync::Arc;

use async_trait::async_trait;

use healkit_core_types::{
    AttemptId, HealingOutcome, LocatorAttempt, NewHealingOutcome, NewLocatorAttempt, OutcomeId,
};

use crate::config::{AuditBackend, AuditStoreConfig};
use crate::errors::PersistenceError;
use crate::memory::InMemoryAuditRepository;
use crate::model::{AttemptQuery, AuditStats, HealingHistoryRow, HistoryQuery};
use crate::sqlite::SqliteAuditRepository;

pub type AuditResult<T> = Result<T, PersistenceError>;

/// Append-only writer for the audit trail.
///
/// Every insert commits on its own. An outcome must reference an attempt
/// that was inserted earlier through the same store; otherwise the insert
/// fails with [`PersistenceErrorKind::UnknownAttempt`](crate::PersistenceErrorKind::UnknownAttempt).
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn insert_attempt(&self, attempt: NewLocatorAttempt) -> AuditResult<AttemptId>;
    async fn insert_outcome(&self, outcome: NewHealingOutcome) -> AuditResult<OutcomeId>;
}

/// Read-only queries over the two audit tables.
#[async_trait]
pub trait AuditView: Send + Sync {
    async fn attempts(&self, query: AttemptQuery) -> AuditResult<Vec<LocatorAttempt>>;
    async fn outcomes_for(&self, attempt: AttemptId) -> AuditResult<Vec<HealingOutcome>>;
    async fn healing_history(&self, query: HistoryQuery) -> AuditResult<Vec<HealingHistoryRow>>;
    async fn stats(&self) -> AuditResult<AuditStats>;
}

/// A backend that can both record and answer queries.
pub trait AuditStore: AuditRepository + AuditView {
    fn into_repository(self: Arc<Self>) -> Arc<dyn AuditRepository>;
    fn into_view(self: Arc<Self>) -> Arc<dyn AuditView>;
}

impl<T> AuditStore for T
where
    T: AuditRepository + AuditView + 'static,
{
    fn into_repository(self: Arc<Self>) -> Arc<dyn AuditRepository> {
        self
    }

    fn into_view(self: Arc<Self>) -> Arc<dyn AuditView> {
        self
    }
}

/// Opens the backend selected by [`AuditStoreConfig`].
#[derive(Default)]
pub struct AuditStoreBuilder {
    config: AuditStoreConfig,
}

impl AuditStoreBuilder {
    pub fn new(config: AuditStoreConfig) -> Self {
        Self { config }
    }

    pub fn build(self) -> AuditResult<Arc<dyn AuditStore>> {
        match self.config.backend {
            AuditBackend::Memory => Ok(Arc::new(InMemoryAuditRepository::new())),
            AuditBackend::Sqlite => Ok(Arc::new(SqliteAuditRepository::open(&self.config.path)?)),
        }
    }
}
