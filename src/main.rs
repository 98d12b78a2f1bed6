mod api;
mod cli;
#[cfg_attr(not(feature = "tui"), allow(dead_code))]
mod lessons;
mod logging;
mod metrics;
mod model;
#[cfg_attr(not(feature = "tui"), allow(dead_code))]
mod router;
mod simulation;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_headless = args.is_headless();

    let target = if is_headless {
        logging::LogTarget::Stderr
    } else {
        logging::LogTarget::File(
            args.log_file
                .clone()
                .unwrap_or_else(logging::default_log_file),
        )
    };
    let _log_guard = logging::init(target)?;

    let result = cli::run(args).await;
    if let Err(e) = &result {
        tracing::error!(error = %format!("{e:#}"), "run failed");
    }
    result
}
