//! portprobe - check whether one TCP/UDP port is reachable.
//!
//! Usage:
//!   portprobe -t <TARGET> -p <PORT> [-P tcp|udp|both] [-T <SECONDS>] [-o plain|json] [-v]

use anyhow::Context;
use clap::Parser;
use portprobe::cli::Args;
use portprobe::output;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// RUST_LOG wins when set; otherwise `-v` selects debug output.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("portprobe={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> anyhow::Result<()> {
    let target = args.target.clone();
    let (target, result, format) = args
        .execute()
        .await
        .with_context(|| format!("scan of {} failed", target))?;

    output::print_result(&target, &result, format).context("failed to write results")?;
    Ok(())
}
