mod auth;
mod cli;
mod config;
mod error;
mod filters;
mod models;
mod output;
mod providers;
mod query;
mod sources;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    output::print_banner();

    info!("Starting citree - CI Hierarchy Query Tool");
    cli.execute().await?;

    Ok(())
}
