use clap::{Args, Subcommand};
use healkit_core_types::{Locator, LocatorKind};

use super::config::ConfigArgs;
use super::history::HistoryArgs;
use super::locate::LocateArgs;
use super::rank::RankArgs;
use super::stats::StatsArgs;
use super::strategies::StrategiesArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// List the deterministic rewrites for a failed locator
    Strategies(StrategiesArgs),

    /// Rank identifiers in a saved page by similarity to a locator value
    Rank(RankArgs),

    /// Locate an element in a saved page, healing the locator if needed
    Locate(LocateArgs),

    /// Show recorded healing outcomes
    History(HistoryArgs),

    /// Summarize the audit trail
    Stats(StatsArgs),

    /// Manage healkit configuration
    Config(ConfigArgs),

    /// Show build and configuration information
    Info,
}

/// A locator given on the command line as `--kind KIND VALUE`.
#[derive(Args, Clone, Debug)]
pub struct LocatorArgs {
    /// Locator kind: id, name, class, css or xpath
    #[arg(short, long, default_value = "id")]
    pub kind: LocatorKind,

    /// Locator value
    pub value: String,
}

impl LocatorArgs {
    pub fn locator(&self) -> Locator {
        Locator::new(self.kind, self.value.clone())
    }
}
