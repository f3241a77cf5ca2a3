use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use healkit_audit_store::{AuditStore, AuditStoreBuilder};
use healkit_locator_heal::HealSettings;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::AppConfig;

pub struct CliContext {
    config: Arc<AppConfig>,
    config_path: PathBuf,
    config_from_file: bool,
    audit: OnceCell<Arc<dyn AuditStore>>,
}

impl CliContext {
    pub fn new(config: AppConfig, config_path: PathBuf, config_from_file: bool) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
            config_from_file,
            audit: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn config_from_file(&self) -> bool {
        self.config_from_file
    }

    /// Validated healing settings.
    pub fn heal_settings(&self) -> Result<HealSettings> {
        self.config.validate().with_context(|| {
            format!(
                "invalid heal configuration in {}",
                self.config_path.display()
            )
        })
    }

    /// Audit store opened on first use and shared by later calls.
    pub async fn audit_store(&self) -> Result<Arc<dyn AuditStore>> {
        self.audit
            .get_or_try_init(|| async {
                let audit = self.config.audit.clone();
                debug!(
                    "Opening {:?} audit store at {}",
                    audit.backend,
                    audit.path.display()
                );
                AuditStoreBuilder::new(audit.clone()).build().with_context(|| {
                    format!("failed to open audit store at {}", audit.path.display())
                })
            })
            .await
            .map(Arc::clone)
    }
}
