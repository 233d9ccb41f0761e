// Allow common clippy pedantic lints
#![allow(clippy::must_use_candidate)]

//! tap-adroll CLI
//!
//! Command-line interface for replicating AdRoll data

use clap::Parser;
use tap_adroll::cli::{Cli, Runner};

#[tokio::main]
async fn main() {
    // Logs go to stderr, stdout carries only messages
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let runner = Runner::new(cli);

    if let Err(e) = runner.run().await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
