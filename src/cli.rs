use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::{config::Settings, filter::KeyColumn};

#[derive(Debug, Parser)]
#[command(author, version, about = "Query sales snapshots over HTTP or from the terminal", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load the snapshots and serve the authenticated query API
    Serve(ServeArgs),
    /// Load the snapshots and summarize what was found
    Probe(DataArgs),
    /// List sales rows for one key within an inclusive date range
    Search(SearchArgs),
    /// Show total and average net sales for one key
    Totals(TotalsArgs),
    /// Print the SHA-256 digest of a password for the configuration's user list
    HashPassword(HashPasswordArgs),
}

#[derive(Debug, Clone, Args)]
pub struct DataArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Directory holding the snapshot files (overrides data.directory)
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,
}

impl DataArgs {
    /// Configuration file (if any) plus environment and flag overrides.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::resolve(self.config.as_deref())?;
        if let Some(dir) = &self.data_dir {
            settings.data.directory = dir.clone();
        }
        Ok(settings)
    }
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub data: DataArgs,
    /// Address to listen on, e.g. 0.0.0.0:8000 (overrides server.bind)
    #[arg(short, long)]
    pub bind: Option<String>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Key column to match
    #[arg(value_enum)]
    pub entity: KeyColumn,
    /// Exact key value, e.g. 1|343
    #[arg(short, long)]
    pub key: String,
    /// First day of the range (YYYY-MM-DD)
    #[arg(long = "start-date")]
    pub start_date: String,
    /// Last day of the range (YYYY-MM-DD)
    #[arg(long = "end-date")]
    pub end_date: String,
    #[command(flatten)]
    pub data: DataArgs,
}

#[derive(Debug, Args)]
pub struct TotalsArgs {
    /// Key column to match
    #[arg(value_enum)]
    pub entity: KeyColumn,
    /// Exact key value, e.g. 1|023
    #[arg(short, long)]
    pub key: String,
    #[command(flatten)]
    pub data: DataArgs,
}

#[derive(Debug, Args)]
pub struct HashPasswordArgs {
    /// Password to digest
    pub password: String,
}
