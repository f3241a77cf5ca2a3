use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use super::output::LogFormat;
use crate::config::AppConfig;

const LOCAL_CONFIG: &str = "config/healkit.yaml";

pub fn init_logging(level: &str, debug: bool, format: LogFormat) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    // Logs go to stderr so command output on stdout stays machine-readable.
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }

    Ok(())
}

pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
    pub from_file: bool,
}

/// Priority: `--config` > ./config/healkit.yaml > <config dir>/healkit/config.yaml
pub fn resolve_config_path(config_path: Option<&PathBuf>) -> PathBuf {
    if let Some(path) = config_path {
        return path.clone();
    }
    let local_config = PathBuf::from(LOCAL_CONFIG);
    if local_config.exists() {
        return local_config;
    }
    match dirs::config_dir() {
        Some(mut path) => {
            path.push("healkit");
            path.push("config.yaml");
            path
        }
        None => local_config,
    }
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let config_path = resolve_config_path(config_path);

    let (mut config, from_file) = if fs::try_exists(&config_path).await.unwrap_or(false) {
        let content = fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let config: AppConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;
        info!("Loaded configuration from: {}", config_path.display());
        (config, true)
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        (AppConfig::default(), false)
    };

    for key in config.apply_env_overrides()? {
        info!("Applied environment override {}", key);
    }

    Ok(LoadedConfig {
        config,
        path: config_path,
        from_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let explicit = PathBuf::from("/etc/healkit/custom.yaml");
        assert_eq!(resolve_config_path(Some(&explicit)), explicit);
    }

    #[tokio::test]
    async fn loads_yaml_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("healkit.yaml");
        std::fs::write(&path, "heal:\n  similarityThreshold: 0.5\naudit:\n  backend: memory\n")
            .unwrap();

        let loaded = load_config(Some(&path)).await.unwrap();
        assert!(loaded.from_file);
        assert_eq!(loaded.path, path);
        assert_eq!(loaded.config.heal.similarity_threshold, 0.5);
    }

    #[tokio::test]
    async fn malformed_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "heal: [not, a, map").unwrap();
        assert!(load_config(Some(&path)).await.is_err());
    }
}
