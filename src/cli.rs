use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

use batchfetch::config::Config;

#[derive(Parser, Debug)]
#[command(name = "batchfetch", version)]
#[command(about = "Batch URL download service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server and worker pool
    Server(ServerArgs),
    /// Print the effective configuration as TOML
    Config(ConfigArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to
    #[arg(long)]
    pub address: Option<SocketAddr>,

    /// Number of concurrent workers
    #[arg(long)]
    pub workers: Option<usize>,

    /// Maximum number of queued tasks
    #[arg(long)]
    pub queue_capacity: Option<usize>,

    /// Directory (file backend) or keyspace path (fjall backend) for task records
    #[arg(long)]
    pub storage_dir: Option<PathBuf>,

    /// Directory downloaded files are written to
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Configuration file (overrides BATCHFETCH_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// Configuration file (overrides BATCHFETCH_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl ServerArgs {
    /// Command line flags win over file and environment
    pub fn apply(&self, config: &mut Config) {
        if let Some(address) = self.address {
            config.server.bind_addr = address;
        }
        if let Some(workers) = self.workers {
            config.manager.workers = workers;
        }
        if let Some(capacity) = self.queue_capacity {
            config.manager.queue_capacity = capacity;
        }
        if let Some(dir) = &self.storage_dir {
            config.storage.path = dir.clone();
        }
        if let Some(dir) = &self.download_dir {
            config.downloader.download_dir = dir.clone();
        }
    }
}
