mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use tracing::info;

use cli::Cli;
use repodiff::config::Config;
use repodiff::logging::init_tracing;
use repodiff::pipeline::{reporter, Pipeline};
use repodiff::repository::Database;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs, cli.quiet);

    let config = Config::load(&cli.config)?;

    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => config.database_path()?,
    };
    if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Could not create {}", dir.display()))?;
    }

    info!(db = %db_path.display(), targets = config.targets.len(), "starting run");

    let db_path_str = db_path.to_str().context("Invalid path encoding")?;
    let db = Database::new(db_path_str).await?;
    db.init_schema().await?;

    let pipeline = Pipeline::from_config(db, &config, reporter(cli.quiet));
    pipeline.run_all(config.targets).await?;

    info!("run complete");
    Ok(())
}
