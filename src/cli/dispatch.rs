use super::config::cmd_config;
use super::env::CliArgs;
use super::history::cmd_history;
use super::info::cmd_info;
use super::locate::cmd_locate;
use super::rank::cmd_rank;
use super::stats::cmd_stats;
use super::strategies::cmd_strategies;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    let output = cli.output;
    match cli.command.clone() {
        Commands::Strategies(args) => cmd_strategies(args, ctx, output).await,
        Commands::Rank(args) => cmd_rank(args, ctx, output).await,
        Commands::Locate(args) => cmd_locate(args, ctx, output).await,
        Commands::History(args) => cmd_history(args, ctx, output).await,
        Commands::Stats(args) => cmd_stats(args, ctx, output).await,
        Commands::Config(args) => cmd_config(args, ctx, output).await,
        Commands::Info => cmd_info(ctx, output).await,
    }
}
