use anyhow::Result;
use clap::Args;

use super::context::CliContext;
use super::output::{render, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct StatsArgs {}

pub async fn cmd_stats(_args: StatsArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let stats = ctx.audit_store().await?.into_view().stats().await?;

    render(output, &stats, |stats| {
        println!("Healing Statistics");
        println!("==================");
        println!("Locator attempts:       {}", stats.total_attempts);
        println!("Needed healing:         {}", stats.attempts_needing_heal);
        println!("Healed:                 {}", stats.healed_attempts);
        println!("Exhausted:              {}", stats.exhausted_attempts);
        println!("Outcome rows:           {}", stats.total_outcomes);
        println!(
            "Heal success rate:      {:.1}%",
            stats.heal_success_rate * 100.0
        );
    })
}
