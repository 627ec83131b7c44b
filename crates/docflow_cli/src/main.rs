use clap::Parser;
use docflow_cli::Cli;

fn main() -> anyhow::Result<()> {
    docflow_cli::run(Cli::parse())
}
