use anyhow::Result;
use clap::Parser;

mod commands;

use commands::Cli;

fn main() -> Result<()> {
    Cli::parse().run()
}
