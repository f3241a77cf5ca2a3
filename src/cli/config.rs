use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use serde_json::Value as JsonValue;
use tokio::fs;
use tracing::info;

use super::context::CliContext;
use super::output::{render, OutputFormat};
use crate::config::AppConfig;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (file, defaults and environment)
    Show,

    /// Set a value in the configuration file, e.g. `heal.similarity_threshold 0.6`
    Set {
        /// Dotted key; camelCase segments are accepted
        key: String,

        /// New value, parsed as JSON when possible
        value: String,
    },

    /// Print one value of the effective configuration
    Get {
        /// Dotted key; camelCase segments are accepted
        key: String,
    },

    /// Write the default configuration to the configuration file
    Reset,

    /// Check that the configuration file parses and validates
    Validate,

    /// Print the configuration file path in use
    Path,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let path = ctx.config_path().to_path_buf();
    match args.action {
        ConfigAction::Show => {
            render(output, ctx.config(), |config| {
                let origin = if ctx.config_from_file() {
                    path.display().to_string()
                } else {
                    format!("defaults; {} not found", path.display())
                };
                println!("Current configuration ({}):", origin);
                match serde_yaml::to_string(config) {
                    Ok(yaml) => print!("{}", yaml),
                    Err(err) => println!("<unprintable: {}>", err),
                }
            })?;
        }
        ConfigAction::Get { key } => {
            let json = serde_json::to_value(ctx.config())?;
            let segments = split_key(&key)?;
            let Some(value) = lookup(&json, &segments) else {
                bail!("{} not found in configuration", key);
            };
            render(output, value, |value| match value {
                JsonValue::String(text) => println!("{}", text),
                other => println!("{}", other),
            })?;
        }
        ConfigAction::Set { key, value } => {
            let config = load_config_file(&path).await?;
            let mut json = serde_json::to_value(&config)?;
            let segments = split_key(&key)?;
            assign(&mut json, &segments, parse_cli_value(&value))?;
            let updated: AppConfig = serde_json::from_value(json)
                .with_context(|| format!("{} cannot be set to {}", key, value))?;
            updated
                .validate()
                .with_context(|| format!("{} = {} is not a valid setting", key, value))?;
            save_config_file(&path, &updated).await?;
            info!("Updated configuration key {}", key);
            println!("Saved configuration to {}", path.display());
        }
        ConfigAction::Reset => {
            save_config_file(&path, &AppConfig::default()).await?;
            println!(
                "Configuration reset to defaults and written to {}",
                path.display()
            );
        }
        ConfigAction::Validate => {
            if fs::try_exists(&path).await? {
                let config = load_config_file(&path).await?;
                config
                    .validate()
                    .with_context(|| format!("validating {}", path.display()))?;
                println!("Configuration file {} is valid", path.display());
            } else {
                println!(
                    "No configuration file at {}; defaults are valid",
                    path.display()
                );
            }
        }
        ConfigAction::Path => println!("{}", path.display()),
    }

    Ok(())
}

async fn load_config_file(path: &Path) -> Result<AppConfig> {
    if fs::try_exists(path).await? {
        let raw = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    } else {
        Ok(AppConfig::default())
    }
}

async fn save_config_file(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let serialized = serde_yaml::to_string(config)?;
    fs::write(path, serialized)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn parse_cli_value(raw: &str) -> JsonValue {
    serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()))
}

/// Split a dotted key into snake_case segments.
fn split_key(key: &str) -> Result<Vec<String>> {
    let segments: Vec<String> = key
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(snake_case)
        .collect();
    if segments.is_empty() {
        bail!("configuration key cannot be empty");
    }
    Ok(segments)
}

fn snake_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len() + 4);
    for ch in segment.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else if ch == '-' {
            out.push('_');
        } else {
            out.push(ch);
        }
    }
    out
}

fn lookup<'a>(value: &'a JsonValue, path: &[String]) -> Option<&'a JsonValue> {
    path.iter()
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

/// Replace an existing key. The configuration schema is closed, so unknown
/// keys are rejected instead of silently dropped on save.
fn assign(target: &mut JsonValue, path: &[String], value: JsonValue) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        bail!("configuration key cannot be empty");
    };
    let mut current = target;
    for segment in parents {
        current = match current.as_object_mut().and_then(|map| map.get_mut(segment)) {
            Some(next) => next,
            None => bail!("unknown configuration section '{}'", segment),
        };
    }
    match current.as_object_mut() {
        Some(map) if map.contains_key(last) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        _ => bail!("unknown configuration key '{}'", path.join(".")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(raw: &str) -> Vec<String> {
        split_key(raw).unwrap()
    }

    #[test]
    fn camel_case_keys_are_normalized() {
        assert_eq!(
            keys("heal.similarityThreshold"),
            vec!["heal", "similarity_threshold"]
        );
        assert_eq!(keys("audit..path"), vec!["audit", "path"]);
        assert!(split_key("...").is_err());
    }

    #[test]
    fn assign_then_lookup() {
        let mut doc = serde_json::to_value(AppConfig::default()).unwrap();
        assign(&mut doc, &keys("heal.similarityThreshold"), parse_cli_value("0.6")).unwrap();
        assign(&mut doc, &keys("audit.backend"), parse_cli_value("memory")).unwrap();

        assert_eq!(
            lookup(&doc, &keys("heal.similarity_threshold")),
            Some(&JsonValue::from(0.6))
        );
        let config: AppConfig = serde_json::from_value(doc).unwrap();
        assert_eq!(config.heal.similarity_threshold, 0.6);
        assert_eq!(
            config.audit.backend,
            healkit_audit_store::AuditBackend::Memory
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut doc = serde_json::to_value(AppConfig::default()).unwrap();
        assert!(assign(&mut doc, &keys("heal.retries"), JsonValue::from(3)).is_err());
        assert!(assign(&mut doc, &keys("browser.headless"), JsonValue::Bool(true)).is_err());
        assert!(lookup(&doc, &keys("heal.retries")).is_none());
    }
}
