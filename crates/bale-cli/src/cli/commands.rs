//! Subcommands and their arguments.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use super::enums::ModeArg;
use super::validation::{parse_entry, parse_external};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bundle the configured entries into the output directory
    Build(BuildArgs),

    /// Bundle, then rebuild whenever a source file changes
    Watch(WatchArgs),

    /// Validate configuration and resolve the module graph without writing
    Check(CheckArgs),
}

/// Where configuration comes from, plus flags that override it.
///
/// Flags win over environment variables, which win over the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Config file to load instead of discovering bale.toml or package.json
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Apply the named profile from the config file
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Project directory (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Entry point as NAME=PATH, or PATH to name it after the file stem
    ///
    /// Can be given several times. Replaces a config file entry of the same name.
    #[arg(short, long = "entry", value_name = "NAME=PATH", value_parser = parse_entry)]
    pub entries: Vec<(String, PathBuf)>,

    /// Output directory, relative to the project root
    #[arg(short, long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// URL prefix for emitted files in the manifest and stylesheets
    #[arg(long, value_name = "URL")]
    pub public_path: Option<String>,

    /// Build mode
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Treat SPECIFIER as provided by the page as global GLOBAL
    #[arg(long = "external", value_name = "SPECIFIER=GLOBAL", value_parser = parse_external)]
    pub externals: Vec<(String, String)>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Keep running and rebuild on file changes
    #[arg(short, long)]
    pub watch: bool,

    /// Print the build output as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct WatchArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Quiet period in milliseconds before a burst of changes is rebuilt
    #[arg(long, value_name = "MS")]
    pub debounce: Option<u64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Print the check report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}
