//! chatmine CLI — mine group-chat transcripts into a curated knowledge base.
//!
//! Reads an exported chat transcript, pairs manager answers with the
//! questions they respond to, and merges recurring knowledge into a JSON
//! knowledge base.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
