//! casegraph CLI: convert CASE packages into CTDL/CTDL-ASN graphs.
//!
//! Reads a CASE package from a CASE server or a JSON file, builds one course
//! and competency framework per CASE course, learning programs for pathways,
//! and a validation report.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
