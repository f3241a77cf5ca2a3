use anyhow::Result;
use healkit_audit_store::{AuditBackend, AuditStats};
use serde::Serialize;
use tracing::warn;

use super::context::CliContext;
use super::output::{render, OutputFormat};

#[derive(Debug, Serialize)]
struct BuildInfo {
    version: &'static str,
    build_date: &'static str,
    git_commit: &'static str,
    git_branch: &'static str,
}

#[derive(Debug, Serialize)]
struct InfoReport {
    build: BuildInfo,
    config_path: String,
    config_from_file: bool,
    healing_enabled: bool,
    similarity_enabled: bool,
    similarity_threshold: f64,
    nominal_strategy_score: f64,
    strategy_order: Vec<&'static str>,
    audit_backend: AuditBackend,
    audit_path: String,
    audit: Option<AuditStats>,
}

pub async fn cmd_info(ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let config = ctx.config();
    let settings = ctx.heal_settings()?;

    // A missing or locked database should not hide the rest of the report.
    let audit = match ctx.audit_store().await {
        Ok(store) => match store.into_view().stats().await {
            Ok(stats) => Some(stats),
            Err(err) => {
                warn!("Could not read audit stats: {}", err);
                None
            }
        },
        Err(err) => {
            warn!("Could not open audit store: {:#}", err);
            None
        }
    };

    let report = InfoReport {
        build: BuildInfo {
            version: env!("CARGO_PKG_VERSION"),
            build_date: env!("BUILD_DATE"),
            git_commit: env!("GIT_HASH"),
            git_branch: env!("GIT_BRANCH"),
        },
        config_path: ctx.config_path().display().to_string(),
        config_from_file: ctx.config_from_file(),
        healing_enabled: settings.healing_enabled,
        similarity_enabled: settings.similarity_enabled,
        similarity_threshold: settings.ranker.threshold(),
        nominal_strategy_score: settings.nominal_strategy_score,
        strategy_order: settings.generator.order().iter().map(|s| s.name()).collect(),
        audit_backend: config.audit.backend,
        audit_path: config.audit.path.display().to_string(),
        audit,
    };

    render(output, &report, print_info)
}

fn print_info(report: &InfoReport) {
    println!("healkit System Information");
    println!("==========================");
    println!("Version: {}", report.build.version);
    println!("Build Date: {}", report.build.build_date);
    println!(
        "Git Commit: {} ({})",
        report.build.git_commit, report.build.git_branch
    );
    println!();

    println!("Configuration:");
    if report.config_from_file {
        println!("- File: {}", report.config_path);
    } else {
        println!("- File: {} (not found, using defaults)", report.config_path);
    }
    println!("- Healing: {}", enabled(report.healing_enabled));
    println!(
        "- Similarity ranking: {} (threshold {})",
        enabled(report.similarity_enabled),
        report.similarity_threshold
    );
    println!("- Nominal strategy score: {}", report.nominal_strategy_score);
    println!("- Strategy order: {}", report.strategy_order.join(", "));
    println!(
        "- Audit store: {:?} at {}",
        report.audit_backend, report.audit_path
    );
    println!();

    match &report.audit {
        Some(stats) => {
            println!("Audit Trail:");
            println!("- Attempts: {}", stats.total_attempts);
            println!("- Needed healing: {}", stats.attempts_needing_heal);
            println!(
                "- Heal success rate: {:.1}%",
                stats.heal_success_rate * 100.0
            );
        }
        None => println!("Audit Trail: unavailable"),
    }
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}
