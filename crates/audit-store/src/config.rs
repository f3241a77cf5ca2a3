use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Storage backend for the audit trail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditBackend {
    /// Process-local tables; history is lost on exit.
    Memory,
    /// SQLite database file at [`AuditStoreConfig::path`].
    Sqlite,
}

impl Default for AuditBackend {
    fn default() -> Self {
        Self::Sqlite
    }
}

/// Audit store section of the application config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditStoreConfig {
    pub backend: AuditBackend,
    pub path: PathBuf,
}

impl Default for AuditStoreConfig {
    fn default() -> Self {
        Self {
            backend: AuditBackend::default(),
            path: PathBuf::from("healkit.db"),
        }
    }
}

impl AuditStoreConfig {
    pub fn memory() -> Self {
        Self {
            backend: AuditBackend::Memory,
            ..Self::default()
        }
    }

    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: AuditBackend::Sqlite,
            path: path.into(),
        }
    }
}
