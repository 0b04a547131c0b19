use clap::Parser;
use std::process;
use tracing::info;

use returnscan::cli::Cli;
use returnscan::watch::Watcher;
use returnscan::{NAME, Result, VERSION, logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        process::exit(err.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    cli.validate()?;
    let config = cli.to_config()?;

    logging::init(&config)?;
    config.check_watch_dir()?;

    info!(version = VERSION, "Starting {NAME}");

    Watcher::from_config(config).run().await
}
