//! Command-line arguments for the replay tool.

use std::path::PathBuf;

use clap::Parser;

/// Environment variable naming the dump when no argument is given.
pub const HISTORY_FILE_ENV: &str = "PAYLIFE_HISTORY_FILE";

#[derive(Debug, Parser)]
#[command(name = "paylife-replay", version, about = "Rehydrate payment transactions from an event log dump", long_about = None)]
pub struct Args {
    /// JSON array of stored events to replay
    #[arg(value_name = "HISTORY_FILE", env = HISTORY_FILE_ENV)]
    pub history_file: PathBuf,
}
