//! Command-line interface for chart-minder.
//!
//! Parse and transpose chord charts, ingest them into the song store and
//! search the configured providers.

mod commands;

pub use commands::{Cli, Commands, run_command};
