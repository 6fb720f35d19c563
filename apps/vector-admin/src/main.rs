//! Vector Admin
//!
//! Operator CLI for index lifecycle, data-plane operations, cascading
//! deletes and batch document indexing against Pinecone.

use clap::Parser;
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{Environment, FromEnv};
use eyre::Result;

mod cli;
mod commands;
mod config;

use cli::Cli;
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let environment = Environment::from_env();
    init_tracing(&environment);

    let cli = Cli::parse();
    let config = Config::from_env()?;

    commands::run(cli.command, config).await
}
