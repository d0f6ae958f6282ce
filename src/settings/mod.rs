//! Layered settings: a TOML file picked by build profile (or `--settings`),
//! overridden by `FORUM_SYNC__*` environment variables.

mod cli;
pub use clap::{Parser, Subcommand};
pub use cli::*;

mod settings;
pub use settings::*;
