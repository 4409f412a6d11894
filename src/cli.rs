use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "tokensync")]
#[command(about = "Sync design tokens into CSS theme variables")]
#[command(version)]
pub struct Cli {
    /// Config file, instead of ./tokensync.json or the user config
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Token tree to read
    #[arg(long, global = true, value_name = "FILE")]
    pub tokens: Option<PathBuf>,

    /// Live variable document
    #[arg(long, global = true, value_name = "FILE")]
    pub live: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Back up the live document and write a preview of the converted tokens
    Preview,

    /// Replace the live document with the pending preview
    Apply,

    /// Put the last backup back in place
    Restore,

    /// Show which documents exist
    Status,

    /// Derive the primary palette from a color and write it to the live document
    SetPrimary {
        /// `#rgb`, `#rrggbb`, a named color or `rgb()`
        color: String,
    },
}
