//! doxymark CLI: render Doxygen XML output as Markdown API documentation.
//!
//! Reads the XML directory Doxygen generates and writes one Markdown
//! document, or one per documentation group.

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
