pub mod app;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod history;
pub mod info;
pub mod locate;
pub mod output;
pub mod rank;
pub mod runtime;
pub mod stats;
pub mod strategies;

pub use app::run;
pub use commands::{Commands, LocatorArgs};
pub use output::OutputFormat;
