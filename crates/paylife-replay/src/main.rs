//! Paylife replay entry point.
//!
//! Usage: `paylife-replay <history.json>`, or set `PAYLIFE_HISTORY_FILE`.
//! Prints one JSON report per transaction and exits non-zero if any history
//! failed to replay.

use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use paylife_replay::cli::Args;
use paylife_replay::report::{read_dump, replay_dump};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    let args = Args::parse();

    // Initialize tracing subscriber. Logs go to stderr so stdout stays JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(path = %args.history_file.display(), "Replaying event log dump");

    let events = read_dump(&args.history_file).await?;
    let reports = replay_dump(events);
    println!("{}", serde_json::to_string_pretty(&reports)?);

    if reports.iter().all(|r| r.is_ok()) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
