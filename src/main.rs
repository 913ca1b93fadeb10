mod cli;
mod server;

use batchfetch::config::{Config, ConfigError};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => {
            let mut config = load_config(args.config.clone())?;
            args.apply(&mut config);
            config.validate()?;
            server::run(config).await?
        }
        Commands::Config(args) => {
            let config = load_config(args.config)?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}
