pub mod cli;
pub mod config;
pub mod corpus; // Input reading and corpus merge
pub mod pipeline;
pub mod time_estimation;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub fn run() -> ExitCode {
    let cli = cli::Cli::parse();

    // Initialize tracing
    let fallback = if cli.verbose {
        config::verbose_log_filter()
    } else {
        config::default_log_filter()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    match cli::dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Fatal error");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
