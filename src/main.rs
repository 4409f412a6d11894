use anyhow::Context;
use clap::Parser;
use tokensync::cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tokensync::run(cli).context("tokensync failed")
}
