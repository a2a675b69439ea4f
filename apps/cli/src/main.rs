//! Destinos CLI: enrich a travel-destination catalog.
//!
//! Merges source collections, derives intensity ratings, requirement notes
//! and reference links, and writes one flat enriched document.

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
