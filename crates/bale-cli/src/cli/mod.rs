//! Command-line interface definition.
//!
//! - `bale build` bundles once (or keeps watching with `--watch`)
//! - `bale watch` bundles and rebuilds on file changes
//! - `bale check` validates configuration and the module graph

mod commands;
pub mod enums;
mod validation;

use clap::Parser;

pub use commands::{BuildArgs, CheckArgs, Command, ConfigArgs, WatchArgs};
pub use enums::ModeArg;
pub use validation::{parse_entry, parse_external};

/// bale - bundle browser modules into entry and shared chunks
#[derive(Parser, Debug)]
#[command(
    name = "bale",
    version,
    about = "Bundle browser modules into entry and shared chunks",
    long_about = "bale follows the imports of each entry point, places modules used by a\n\
                  single entry in that entry's chunk and modules used by several entries\n\
                  in a shared chunk, then writes hashed files and a manifest."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}
