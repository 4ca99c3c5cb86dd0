//! Curves CLI - poll case-count sources and build stacked trend figures.

use clap::Parser;
use log::debug;

#[derive(Parser)]
#[command(
    name = "cc-cli",
    version,
    about = "Case-count trend curves toolkit"
)]
struct Cli {
    #[command(flatten)]
    settings: cc_cmd::Settings,

    #[command(subcommand)]
    command: cc_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    debug!("{:?}", cli.command);
    cc_cmd::run(cli.settings, cli.command).await
}
