use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::cmd::Commands;

/// File-backed correspondence tracker.
/// Storage defaults to ~/.surat or a directory passed via --data-dir.
#[derive(Parser)]
#[command(name = "surat", version, about = "Incoming-letter workflow tracker")]
pub struct Cli {
    /// Directory holding the JSON collections.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log filter implied by `-v`, if any was given.
    pub fn log_level(&self) -> Option<&'static str> {
        match self.verbose {
            0 => None,
            1 => Some("info"),
            2 => Some("debug"),
            _ => Some("trace"),
        }
    }
}
