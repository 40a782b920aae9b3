//! Binary crate for the `weatherflow` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive credential configuration
//! - The CSV enrichment pipeline and human-friendly output

use clap::Parser;

mod cli;
mod io;
mod pipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    cmd.run().await
}
