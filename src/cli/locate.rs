use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use healkit_audit_store::{AuditRepository, InMemoryAuditRepository};
use healkit_core_types::{AttemptId, Locator};
use healkit_locator_heal::{HealDetails, HealError, HealingResolver, MarkupElement, MarkupProbe};
use serde::Serialize;
use tokio::fs;

use super::commands::LocatorArgs;
use super::context::CliContext;
use super::output::{render, score, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct LocateArgs {
    /// Saved page markup to resolve against
    #[arg(short, long, value_name = "FILE")]
    pub markup: PathBuf,

    /// Page URL recorded with the attempt
    #[arg(short, long, default_value = "about:blank")]
    pub url: String,

    /// Element name recorded with the attempt
    #[arg(short, long)]
    pub name: Option<String>,

    /// Fail on a primary miss instead of healing
    #[arg(long)]
    pub no_heal: bool,

    /// Print the healing candidates without probing or recording anything
    #[arg(long)]
    pub plan: bool,

    #[command(flatten)]
    pub locator: LocatorArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum LocateStatus {
    Found,
    Healed,
    Exhausted,
}

#[derive(Debug, Serialize)]
struct LocateReport {
    status: LocateStatus,
    requested: Locator,
    resolved: Option<Locator>,
    element: Option<MarkupElement>,
    attempt_id: Option<AttemptId>,
    heal: Option<HealDetails>,
    candidates_tried: usize,
    error: Option<String>,
}

pub async fn cmd_locate(args: LocateArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let mut settings = ctx.heal_settings()?;
    if args.no_heal {
        settings.healing_enabled = false;
    }

    let markup = fs::read_to_string(&args.markup)
        .await
        .with_context(|| format!("reading {}", args.markup.display()))?;
    let probe = Arc::new(MarkupProbe::new(args.url.clone(), markup));
    let requested = args.locator.locator();

    if args.plan {
        let audit: Arc<dyn AuditRepository> = Arc::new(InMemoryAuditRepository::new());
        let resolver = HealingResolver::with_settings(probe, audit, settings);
        let plan = resolver.plan(&requested).await;
        return render(output, &plan, |plan| {
            println!("Healing plan for {}:", plan.original);
            for (idx, candidate) in plan.candidates.iter().enumerate() {
                println!(
                    "{:>2}. {}  {:<22} {}",
                    idx + 1,
                    score(candidate.score),
                    candidate.origin.label(),
                    candidate.locator
                );
            }
            if !plan.markup_ranked {
                println!("(similarity ranking skipped)");
            }
        });
    }

    let audit = ctx.audit_store().await?.into_repository();
    let resolver = HealingResolver::with_settings(probe, audit, settings);

    let (report, failure) = match resolver
        .locate(requested.clone(), args.name.as_deref())
        .await
    {
        Ok(located) => {
            let status = if located.was_healed() {
                LocateStatus::Healed
            } else {
                LocateStatus::Found
            };
            let candidates_tried = located
                .heal
                .as_ref()
                .map(|heal| heal.candidates_tried)
                .unwrap_or(0);
            let report = LocateReport {
                status,
                requested,
                resolved: Some(located.locator),
                element: Some(located.handle),
                attempt_id: located.attempt_id,
                heal: located.heal,
                candidates_tried,
                error: None,
            };
            (report, None)
        }
        Err(err) => {
            let report = LocateReport {
                status: LocateStatus::Exhausted,
                requested,
                resolved: None,
                element: None,
                attempt_id: err.attempt_id(),
                heal: None,
                candidates_tried: err.candidates_tried(),
                error: Some(err.to_string()),
            };
            (report, Some(err))
        }
    };

    render(output, &report, print_report)?;

    match failure {
        Some(err) => Err(exhausted(err)),
        None => Ok(()),
    }
}

fn exhausted(err: HealError) -> anyhow::Error {
    let locator = err.locator().clone();
    anyhow::Error::new(err).context(format!("could not locate {}", locator))
}

fn print_report(report: &LocateReport) {
    match report.status {
        LocateStatus::Found => println!("Found {}", report.requested),
        LocateStatus::Healed => {
            if let (Some(resolved), Some(heal)) = (&report.resolved, &report.heal) {
                println!(
                    "Healed {} -> {} via {} (score {}, {} candidates tried)",
                    report.requested,
                    resolved,
                    heal.origin.label(),
                    score(heal.score),
                    heal.candidates_tried
                );
            }
        }
        LocateStatus::Exhausted => {
            println!(
                "Not found: {} ({} candidates tried)",
                report.requested, report.candidates_tried
            );
            if let Some(attempt_id) = report.attempt_id {
                println!("  recorded as attempt {}", attempt_id);
            }
            return;
        }
    }
    if let Some(element) = &report.element {
        let attributes: Vec<String> = element
            .attributes
            .iter()
            .map(|(name, value)| format!("{}=\"{}\"", name, value))
            .collect();
        println!("  <{} {}> (element #{})", element.tag, attributes.join(" "), element.index);
    }
    if let Some(attempt_id) = report.attempt_id {
        println!("  recorded as attempt {}", attempt_id);
    }
}
