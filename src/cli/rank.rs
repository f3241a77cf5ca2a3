use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use healkit_locator_heal::SimilarityRanker;
use tokio::fs;

use super::context::CliContext;
use super::output::{render, score, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct RankArgs {
    /// Saved page markup to scan
    #[arg(short, long, value_name = "FILE")]
    pub markup: PathBuf,

    /// Override the configured similarity threshold
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Show every scraped identifier, unfiltered and in page order
    #[arg(long)]
    pub all: bool,

    /// Original locator value
    pub value: String,
}

pub async fn cmd_rank(args: RankArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let settings = ctx.heal_settings()?;
    let ranker = match args.threshold {
        Some(threshold) => {
            if !(0.0..=1.0).contains(&threshold) {
                anyhow::bail!("threshold must be within [0, 1], got {}", threshold);
            }
            SimilarityRanker::new(threshold)
        }
        None => settings.ranker,
    };

    let markup = fs::read_to_string(&args.markup)
        .await
        .with_context(|| format!("reading {}", args.markup.display()))?;

    let ranked = if args.all {
        ranker.score_all(&args.value, &markup)
    } else {
        ranker.rank(&args.value, &markup)
    };

    render(output, &ranked, |ranked| {
        if ranked.is_empty() {
            println!("No matching identifiers in {}", args.markup.display());
            return;
        }
        println!(
            "Similarity to '{}' (threshold {}):",
            args.value,
            ranker.threshold()
        );
        for candidate in ranked {
            println!(
                "  {}  {:<5}  {}",
                score(candidate.score),
                format!("{:?}", candidate.source).to_lowercase(),
                candidate.value
            );
        }
    })
}
