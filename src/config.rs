//! Application configuration
//!
//! One YAML document with a `heal` section ([`HealConfig`]) and an `audit`
//! section ([`AuditStoreConfig`]), plus a few environment overrides.

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use healkit_audit_store::AuditStoreConfig;
use healkit_locator_heal::{ConfigError, HealConfig, HealSettings};
use serde::{Deserialize, Serialize};

pub const ENV_SIMILARITY_THRESHOLD: &str = "HEALKIT_SIMILARITY_THRESHOLD";
pub const ENV_HEALING_ENABLED: &str = "HEALKIT_HEALING_ENABLED";
pub const ENV_AUDIT_PATH: &str = "HEALKIT_AUDIT_PATH";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub heal: HealConfig,
    pub audit: AuditStoreConfig,
}

impl AppConfig {
    /// Check the healing section; the resolver only runs on validated settings.
    pub fn validate(&self) -> Result<HealSettings, ConfigError> {
        self.heal.validate()
    }

    /// Apply `HEALKIT_*` variables from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<Vec<&'static str>> {
        self.apply_overrides_from(|key| env::var(key).ok())
    }

    /// Apply overrides from `lookup`; returns the variables that were set.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<Vec<&'static str>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();

        if let Some(raw) = lookup(ENV_SIMILARITY_THRESHOLD) {
            self.heal.similarity_threshold = raw.trim().parse().with_context(|| {
                format!("{} must be a number, got '{}'", ENV_SIMILARITY_THRESHOLD, raw)
            })?;
            applied.push(ENV_SIMILARITY_THRESHOLD);
        }

        if let Some(raw) = lookup(ENV_HEALING_ENABLED) {
            self.heal.healing_enabled = parse_flag(ENV_HEALING_ENABLED, &raw)?;
            applied.push(ENV_HEALING_ENABLED);
        }

        if let Some(raw) = lookup(ENV_AUDIT_PATH) {
            if raw.trim().is_empty() {
                bail!("{} must not be empty", ENV_AUDIT_PATH);
            }
            self.audit.path = PathBuf::from(raw);
            applied.push(ENV_AUDIT_PATH);
        }

        Ok(applied)
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("{} must be a boolean, got '{}'", key, raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use healkit_audit_store::AuditBackend;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn parses_camel_and_snake_case_keys() {
        let yaml = r#"
heal:
  similarityThreshold: 0.55
  healing_enabled: false
  strategyOrder: [css_id, xpath_id]
audit:
  backend: memory
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.heal.similarity_threshold, 0.55);
        assert!(!config.heal.healing_enabled);
        assert_eq!(config.heal.strategy_order, vec!["css_id", "xpath_id"]);
        assert!(config.heal.similarity_enabled);
        assert_eq!(config.audit.backend, AuditBackend::Memory);
        assert_eq!(config.audit.path, PathBuf::from("healkit.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn misspelled_keys_are_rejected() {
        for yaml in [
            "heal:\n  similarityTreshold: 0.5\n",
            "audit:\n  backend: memory\n  pth: /tmp/audit.db\n",
            "healing:\n  healingEnabled: false\n",
        ] {
            let err = serde_yaml::from_str::<AppConfig>(yaml).unwrap_err();
            assert!(err.to_string().contains("unknown field"), "{yaml}: {err}");
        }
    }

    #[test]
    fn empty_document_is_default() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        let applied = config
            .apply_overrides_from(lookup(&[
                (ENV_SIMILARITY_THRESHOLD, "0.4"),
                (ENV_HEALING_ENABLED, "off"),
                (ENV_AUDIT_PATH, "/tmp/audit.db"),
            ]))
            .unwrap();

        assert_eq!(applied.len(), 3);
        assert_eq!(config.heal.similarity_threshold, 0.4);
        assert!(!config.heal.healing_enabled);
        assert_eq!(config.audit.path, PathBuf::from("/tmp/audit.db"));
    }

    #[test]
    fn bad_env_values_are_errors() {
        let mut config = AppConfig::default();
        assert!(config
            .apply_overrides_from(lookup(&[(ENV_SIMILARITY_THRESHOLD, "high")]))
            .is_err());
        assert!(config
            .apply_overrides_from(lookup(&[(ENV_HEALING_ENABLED, "maybe")]))
            .is_err());
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn out_of_range_threshold_fails_validation() {
        let mut config = AppConfig::default();
        config
            .apply_overrides_from(lookup(&[(ENV_SIMILARITY_THRESHOLD, "1.2")]))
            .unwrap();
        assert_eq!(config.validate(), Err(ConfigError::InvalidThreshold(1.2)));
    }
}
