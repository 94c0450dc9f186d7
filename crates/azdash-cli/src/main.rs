//! azdash CLI
//!
//! Terminal dashboard for the azdash API.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;

use azdash_cli::cli::Args;
use azdash_cli::commands;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "info,azdash=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(command = ?args.command, "Starting azdash");

    let output = commands::run(args).await?;
    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}
