use crate::config::cli::Args;
use crate::config::Config;
use crate::error::Result;
use crate::infrastructure::FileSystemStore;
use crate::services::harvest::HarvestService;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

mod config;
mod domain;
mod error;
mod infrastructure;
mod services;
#[cfg(test)]
mod test_support;
mod utils;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt().with_max_level(args.log_level).init();

    let config = Config::from_args(args)?;
    config.ensure_directories()?;

    let store = Arc::new(FileSystemStore::new(&config.args.out_dir));
    let harvest = HarvestService::new(config, store.clone());
    let manifest = harvest.process().await?;

    info!(
        "Done. Wrote {} jobs to {:?}",
        manifest.total_jobs,
        store.out_dir()
    );
    Ok(())
}
