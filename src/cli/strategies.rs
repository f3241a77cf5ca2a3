use anyhow::Result;
use clap::Args;
use healkit_core_types::Locator;
use serde::Serialize;

use super::commands::LocatorArgs;
use super::context::CliContext;
use super::output::{render, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct StrategiesArgs {
    #[command(flatten)]
    pub locator: LocatorArgs,
}

#[derive(Debug, Serialize)]
struct StrategyRow {
    strategy: &'static str,
    locator: Locator,
}

pub async fn cmd_strategies(
    args: StrategiesArgs,
    ctx: &CliContext,
    output: OutputFormat,
) -> Result<()> {
    let settings = ctx.heal_settings()?;
    let failed = args.locator.locator();
    let rows: Vec<StrategyRow> = settings
        .generator
        .generate(&failed)
        .into_iter()
        .map(|rewrite| StrategyRow {
            strategy: rewrite.strategy.name(),
            locator: rewrite.locator,
        })
        .collect();

    render(output, &rows, |rows| {
        println!("Rewrites for {} ({} candidates):", failed, rows.len());
        for (idx, row) in rows.iter().enumerate() {
            println!("{:>2}. {:<22} {}", idx + 1, row.strategy, row.locator);
        }
    })
}
