use clap::Parser;
use std::path::PathBuf;

use super::commands::Commands;
use super::output::OutputFormat;

/// Tourguide - guided-tour engine tooling
#[derive(Parser)]
#[command(name = "tourguide", author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct CliArgs {
    /// Tour policy file (YAML or JSON) layered over the defaults
    #[arg(short, long, value_name = "FILE", global = true)]
    pub policy: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Enable debug mode
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Output format
    #[arg(short, long, default_value = "human", global = true)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}
