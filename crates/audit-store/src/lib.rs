//! Append-only audit trail for locator attempts and healing outcomes.

pub mod api;
pub mod config;
pub mod errors;
pub mod memory;
pub mod metrics;
pub mod model;
pub mod sqlite;

pub use api::{AuditRepository, AuditResult, AuditStore, AuditStoreBuilder, AuditView};
pub use config::{AuditBackend, AuditStoreConfig};
pub use errors::{PersistenceError, PersistenceErrorKind};
pub use memory::InMemoryAuditRepository;
pub use metrics::{AuditMetricSnapshot, AuditMetrics};
pub use model::{AttemptQuery, AuditStats, HealingHistoryRow, HistoryQuery, DEFAULT_QUERY_LIMIT};
pub use sqlite::SqliteAuditRepository;
