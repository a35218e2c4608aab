use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "repodiff", about = "Persist upstream/downstream diff reports and rebuild dashboard views")]
pub struct Cli {
    /// JSON file listing the targets to process
    #[arg(short, long, default_value = "repodiff.json")]
    pub config: PathBuf,

    /// SQLite database file, overriding the config
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Hide progress bars and lower the default log level
    #[arg(short, long)]
    pub quiet: bool,
}
