use anyhow::Result;
use clap::Args;
use healkit_audit_store::{HistoryQuery, DEFAULT_QUERY_LIMIT};
use healkit_core_types::HealStatus;

use super::context::CliContext;
use super::output::{render, score, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct HistoryArgs {
    /// Only show elements whose name contains this text
    #[arg(short, long)]
    pub element: Option<String>,

    /// Only show SUCCESS or FAILED rows
    #[arg(short, long)]
    pub status: Option<HealStatus>,

    /// Maximum rows to show
    #[arg(short = 'n', long, default_value_t = DEFAULT_QUERY_LIMIT)]
    pub limit: usize,
}

pub async fn cmd_history(
    args: HistoryArgs,
    ctx: &CliContext,
    output: OutputFormat,
) -> Result<()> {
    let view = ctx.audit_store().await?.into_view();
    let rows = view
        .healing_history(HistoryQuery {
            element_name: args.element,
            status: args.status,
            limit: args.limit,
        })
        .await?;

    render(output, &rows, |rows| {
        if rows.is_empty() {
            println!("No healing history recorded");
            return;
        }
        println!(
            "{:<20} {:<20} {:<32} {:<32} {:>6} {:<7}",
            "Time", "Element", "Original", "Candidate", "Score", "Status"
        );
        for row in rows {
            println!(
                "{:<20} {:<20} {:<32} {:<32} {:>6} {:<7}",
                row.created_at.format("%Y-%m-%d %H:%M:%S"),
                row.element_name,
                row.original.to_string(),
                row.candidate.to_string(),
                score(row.similarity_score),
                row.status.as_str()
            );
        }
    })
}
