//! SQLite-backed audit repository.
//!
//! One connection guarded by a mutex; every insert runs in autocommit mode so
//! a crash keeps all history up to the last completed insert.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::task;
use tracing::debug;

use healkit_core_types::{
    AttemptId, HealStatus, HealingOutcome, Locator, LocatorAttempt, LocatorKind,
    NewHealingOutcome, NewLocatorAttempt, OutcomeId,
};

use crate::api::{AuditRepository, AuditResult, AuditView};
use crate::errors::{PersistenceError, PersistenceErrorKind};
use crate::metrics::AuditMetrics;
use crate::model::{name_matches, AttemptQuery, AuditStats, HealingHistoryRow, HistoryQuery};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS locator_attempts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    element_name TEXT NOT NULL,
    locator_kind TEXT NOT NULL,
    locator_value TEXT NOT NULL,
    page_context TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS healing_outcomes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    original_attempt_id INTEGER NOT NULL,
    candidate_kind TEXT NOT NULL,
    candidate_value TEXT NOT NULL,
    similarity_score REAL NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (original_attempt_id) REFERENCES locator_attempts (id)
);

CREATE INDEX IF NOT EXISTS idx_healing_outcomes_attempt
    ON healing_outcomes (original_attempt_id);
"#;

#[derive(Clone)]
pub struct SqliteAuditRepository {
    conn: Arc<Mutex<Connection>>,
    metrics: AuditMetrics,
}

impl SqliteAuditRepository {
    pub fn open(path: impl AsRef<Path>) -> AuditResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|err| {
            PersistenceErrorKind::Unavailable(format!("open {}: {}", path.display(), err))
        })?;
        debug!(path = %path.display(), "opened sqlite audit store");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> AuditResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|err| PersistenceErrorKind::Unavailable(err.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> AuditResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|err| PersistenceErrorKind::Unavailable(err.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|err| PersistenceErrorKind::Unavailable(format!("schema: {}", err)))?;
        register_name_matcher(&conn)
            .map_err(|err| PersistenceErrorKind::Unavailable(format!("functions: {}", err)))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            metrics: AuditMetrics::default(),
        })
    }

    pub fn metrics(&self) -> AuditMetrics {
        self.metrics.clone()
    }

    /// Runs `op` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> AuditResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> AuditResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        task::spawn_blocking(move || {
            let guard = conn.lock();
            op(&guard)
        })
        .await
        .map_err(|err| PersistenceError::from(PersistenceErrorKind::Internal(err.to_string())))?
    }
}

#[async_trait]
impl AuditRepository for SqliteAuditRepository {
    async fn insert_attempt(&self, attempt: NewLocatorAttempt) -> AuditResult<AttemptId> {
        let result = self
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO locator_attempts
                        (element_name, locator_kind, locator_value, page_context, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        attempt.element_name,
                        attempt.locator.kind.as_str(),
                        attempt.locator.value,
                        attempt.page_context,
                        encode_ts(&attempt.created_at),
                    ],
                )
                .map_err(write_failed)?;
                Ok(AttemptId(conn.last_insert_rowid()))
            })
            .await;
        self.metrics.record_attempt(&result);
        result
    }

    async fn insert_outcome(&self, outcome: NewHealingOutcome) -> AuditResult<OutcomeId> {
        let result = self
            .with_conn(move |conn| {
                let known: Option<i64> = conn
                    .query_row(
                        "SELECT id FROM locator_attempts WHERE id = ?1",
                        params![outcome.original_attempt_id.0],
                        |row| row.get(0),
                    )
                    .optional()
                    .map_err(read_failed)?;
                if known.is_none() {
                    return Err(
                        PersistenceErrorKind::UnknownAttempt(outcome.original_attempt_id).into(),
                    );
                }
                conn.execute(
                    "INSERT INTO healing_outcomes
                        (original_attempt_id, candidate_kind, candidate_value,
                         similarity_score, status, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        outcome.original_attempt_id.0,
                        outcome.candidate.kind.as_str(),
                        outcome.candidate.value,
                        outcome.similarity_score,
                        outcome.status.as_str(),
                        encode_ts(&outcome.created_at),
                    ],
                )
                .map_err(write_failed)?;
                Ok(OutcomeId(conn.last_insert_rowid()))
            })
            .await;
        self.metrics.record_outcome(&result);
        result
    }
}

#[async_trait]
impl AuditView for SqliteAuditRepository {
    async fn attempts(&self, query: AttemptQuery) -> AuditResult<Vec<LocatorAttempt>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, element_name, locator_kind, locator_value, page_context, created_at
                     FROM locator_attempts
                     WHERE name_matches(element_name, ?1)
                     ORDER BY id DESC
                     LIMIT ?2",
                )
                .map_err(read_failed)?;
            let rows = stmt
                .query_map(
                    params![query.element_name, limit_param(query.limit)],
                    parse_attempt_row,
                )
                .map_err(read_failed)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(read_failed)
        })
        .await
    }

    async fn outcomes_for(&self, attempt: AttemptId) -> AuditResult<Vec<HealingOutcome>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, original_attempt_id, candidate_kind, candidate_value,
                            similarity_score, status, created_at
                     FROM healing_outcomes
                     WHERE original_attempt_id = ?1
                     ORDER BY id ASC",
                )
                .map_err(read_failed)?;
            let rows = stmt
                .query_map(params![attempt.0], parse_outcome_row)
                .map_err(read_failed)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(read_failed)
        })
        .await
    }

    async fn healing_history(&self, query: HistoryQuery) -> AuditResult<Vec<HealingHistoryRow>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT o.id, o.original_attempt_id, a.element_name, a.locator_kind,
                            a.locator_value, a.page_context, o.candidate_kind, o.candidate_value,
                            o.similarity_score, o.status, o.created_at
                     FROM healing_outcomes o
                     JOIN locator_attempts a ON o.original_attempt_id = a.id
                     WHERE name_matches(a.element_name, ?1)
                       AND (?2 IS NULL OR o.status = ?2)
                     ORDER BY o.id DESC
                     LIMIT ?3",
                )
                .map_err(read_failed)?;
            let rows = stmt
                .query_map(
                    params![
                        query.element_name,
                        query.status.map(|status| status.as_str()),
                        limit_param(query.limit),
                    ],
                    parse_history_row,
                )
                .map_err(read_failed)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(read_failed)
        })
        .await
    }

    async fn stats(&self) -> AuditResult<AuditStats> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM locator_attempts),
                    (SELECT COUNT(DISTINCT original_attempt_id) FROM healing_outcomes),
                    (SELECT COUNT(DISTINCT original_attempt_id) FROM healing_outcomes
                        WHERE status = 'SUCCESS'),
                    (SELECT COUNT(*) FROM healing_outcomes)",
                [],
                |row| {
                    Ok(AuditStats::from_counts(
                        row.get::<_, i64>(0)? as u64,
                        row.get::<_, i64>(1)? as u64,
                        row.get::<_, i64>(2)? as u64,
                        row.get::<_, i64>(3)? as u64,
                    ))
                },
            )
            .map_err(read_failed)
        })
        .await
    }
}

/// SQL `name_matches(element_name, needle)`, Unicode case folding as in the
/// in-memory backend. A NULL needle matches every row.
fn register_name_matcher(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "name_matches",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let element_name: String = ctx.get(0)?;
            let needle: Option<String> = ctx.get(1)?;
            Ok(name_matches(&element_name, needle.as_deref()))
        },
    )
}

fn write_failed(err: rusqlite::Error) -> PersistenceError {
    PersistenceErrorKind::WriteFailed(err.to_string()).into()
}

fn read_failed(err: rusqlite::Error) -> PersistenceError {
    match err {
        rusqlite::Error::FromSqlConversionFailure(_, _, inner) => {
            PersistenceErrorKind::CorruptRow(inner.to_string()).into()
        }
        other => PersistenceErrorKind::ReadFailed(other.to_string()).into(),
    }
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(err),
            )
        })
}

fn decode_kind(idx: usize, raw: &str) -> rusqlite::Result<LocatorKind> {
    LocatorKind::from_str(raw).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
    })
}

fn decode_status(idx: usize, raw: &str) -> rusqlite::Result<HealStatus> {
    HealStatus::from_str(raw).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
    })
}

fn parse_attempt_row(row: &Row<'_>) -> rusqlite::Result<LocatorAttempt> {
    let kind: String = row.get(2)?;
    let created_at: String = row.get(5)?;
    Ok(LocatorAttempt {
        id: AttemptId(row.get(0)?),
        element_name: row.get(1)?,
        locator: Locator::new(decode_kind(2, &kind)?, row.get::<_, String>(3)?),
        page_context: row.get(4)?,
        created_at: decode_ts(5, &created_at)?,
    })
}

fn parse_outcome_row(row: &Row<'_>) -> rusqlite::Result<HealingOutcome> {
    let kind: String = row.get(2)?;
    let status: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    Ok(HealingOutcome {
        id: OutcomeId(row.get(0)?),
        original_attempt_id: AttemptId(row.get(1)?),
        candidate: Locator::new(decode_kind(2, &kind)?, row.get::<_, String>(3)?),
        similarity_score: row.get(4)?,
        status: decode_status(5, &status)?,
        created_at: decode_ts(6, &created_at)?,
    })
}

fn parse_history_row(row: &Row<'_>) -> rusqlite::Result<HealingHistoryRow> {
    let original_kind: String = row.get(3)?;
    let candidate_kind: String = row.get(6)?;
    let status: String = row.get(9)?;
    let created_at: String = row.get(10)?;
    Ok(HealingHistoryRow {
        outcome_id: OutcomeId(row.get(0)?),
        attempt_id: AttemptId(row.get(1)?),
        element_name: row.get(2)?,
        original: Locator::new(decode_kind(3, &original_kind)?, row.get::<_, String>(4)?),
        page_context: row.get(5)?,
        candidate: Locator::new(decode_kind(6, &candidate_kind)?, row.get::<_, String>(7)?),
        similarity_score: row.get(8)?,
        status: decode_status(9, &status)?,
        created_at: decode_ts(10, &created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(name: &str, kind: LocatorKind, value: &str) -> NewLocatorAttempt {
        NewLocatorAttempt {
            element_name: name.to_string(),
            locator: Locator::new(kind, value),
            page_context: "https://example.test/search".into(),
            created_at: Utc::now(),
        }
    }

    fn outcome(id: AttemptId, candidate: Locator, score: f64, status: HealStatus) -> NewHealingOutcome {
        NewHealingOutcome {
            original_attempt_id: id,
            candidate,
            similarity_score: score,
            status,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.db");

        let repo = SqliteAuditRepository::open(&path).unwrap();
        let id = repo
            .insert_attempt(attempt("Search Field", LocatorKind::Id, "search_input"))
            .await
            .unwrap();
        repo.insert_outcome(outcome(
            id,
            Locator::css("#search_input"),
            0.8,
            HealStatus::Success,
        ))
        .await
        .unwrap();
        drop(repo);

        let reopened = SqliteAuditRepository::open(&path).unwrap();
        let attempts = reopened.attempts(AttemptQuery::default()).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].locator, Locator::id("search_input"));

        let outcomes = reopened.outcomes_for(id).await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, HealStatus::Success);
        assert_eq!(outcomes[0].candidate, Locator::css("#search_input"));
        assert!((outcomes[0].similarity_score - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn rejects_outcome_for_unknown_attempt() {
        let repo = SqliteAuditRepository::open_in_memory().unwrap();
        let err = repo
            .insert_outcome(outcome(
                AttemptId(42),
                Locator::css("#nope"),
                0.0,
                HealStatus::Failed,
            ))
            .await
            .unwrap_err();
        assert!(err.is_unknown_attempt());
        assert_eq!(repo.metrics().snapshot().outcomes_failed, 1);
    }

    #[tokio::test]
    async fn history_and_stats() {
        let repo = SqliteAuditRepository::open_in_memory().unwrap();
        let login = repo
            .insert_attempt(attempt("Login Username Field", LocatorKind::Id, "email"))
            .await
            .unwrap();
        let submit = repo
            .insert_attempt(attempt("Login Submit Button", LocatorKind::Xpath, "//button"))
            .await
            .unwrap();
        repo.insert_attempt(attempt("Password", LocatorKind::Id, "password"))
            .await
            .unwrap();

        repo.insert_outcome(outcome(login, Locator::new(LocatorKind::Name, "email"), 0.8, HealStatus::Failed))
            .await
            .unwrap();
        repo.insert_outcome(outcome(login, Locator::css("#email"), 0.8, HealStatus::Success))
            .await
            .unwrap();
        repo.insert_outcome(outcome(submit, Locator::xpath("//button"), 0.0, HealStatus::Failed))
            .await
            .unwrap();

        let history = repo
            .healing_history(HistoryQuery {
                element_name: Some("username".into()),
                ..HistoryQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, HealStatus::Success);
        assert_eq!(history[0].original, Locator::id("email"));

        let failed = repo
            .healing_history(HistoryQuery {
                status: Some(HealStatus::Failed),
                limit: 1,
                ..HistoryQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].element_name, "Login Submit Button");

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.total_attempts, 3);
        assert_eq!(stats.attempts_needing_heal, 2);
        assert_eq!(stats.healed_attempts, 1);
        assert_eq!(stats.total_outcomes, 3);
    }

    #[tokio::test]
    async fn attempts_filter_by_name() {
        let repo = SqliteAuditRepository::open_in_memory().unwrap();
        for name in ["header logo", "footer link", "Header menu"] {
            repo.insert_attempt(attempt(name, LocatorKind::Class, "x"))
                .await
                .unwrap();
        }
        let headers = repo
            .attempts(AttemptQuery {
                element_name: Some("HEADER".into()),
                limit: 10,
            })
            .await
            .unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].element_name, "Header menu");
    }
}
