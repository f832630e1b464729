//! Contenize CLI: turn one piece of cornerstone content into a multi-channel
//! strategy, illustrate it, and export it as a PDF report.

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
