//! Command-line interface for ds-forge.
//!
//! Provides the `run` and `summarize` commands.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli};
