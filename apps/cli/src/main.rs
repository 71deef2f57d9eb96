//! Broadsheet CLI: assemble today's newspaper issue into a local archive.
//!
//! Fetches the day's articles from the content API, renders each one to
//! HTML, and writes a `contents.json` manifest for the reader.

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
