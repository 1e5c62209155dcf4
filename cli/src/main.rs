use std::path::PathBuf;

use clap::Parser;
use dirs::home_dir;
use faxlog_state::state_db_path;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod import_cmd;
mod run_cmd;
mod summary_cmd;

use crate::import_cmd::ImportArgs;
use crate::run_cmd::RunArgs;
use crate::summary_cmd::SummaryArgs;

/// Classify missed fax events and correlate them with their retries.
#[derive(Debug, Parser)]
#[clap(name = "faxlog", version)]
struct Cli {
    #[clap(flatten)]
    store: StoreArgs,

    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[derive(Debug, clap::Args)]
struct StoreArgs {
    /// Path to FAXLOG_HOME. Defaults to $FAXLOG_HOME or ~/.faxlog.
    #[arg(long, env = "FAXLOG_HOME", global = true)]
    home: Option<PathBuf>,

    /// Direct path to the SQLite database. Overrides --home.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

impl StoreArgs {
    fn db_path(&self) -> PathBuf {
        if let Some(db) = self.db.as_ref() {
            return db.clone();
        }
        let faxlog_home = self.home.clone().unwrap_or_else(default_faxlog_home);
        state_db_path(&faxlog_home)
    }
}

#[derive(Debug, clap::Subcommand)]
enum Subcommand {
    /// Run one classification and correlation pass.
    Run(RunArgs),

    /// Load typed events from a JSON Lines file.
    Import(ImportArgs),

    /// Print counts per derived state.
    Summary(SummaryArgs),
}

fn default_faxlog_home() -> PathBuf {
    if let Some(home) = home_dir() {
        return home.join(".faxlog");
    }
    PathBuf::from(".faxlog")
}

fn init_logging() {
    let default_level = "info";
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);
    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();
    let db_path = cli.store.db_path();

    match cli.subcommand {
        Subcommand::Run(args) => {
            let succeeded = run_cmd::run(db_path, args).await?;
            if !succeeded {
                std::process::exit(1);
            }
        }
        Subcommand::Import(args) => import_cmd::run(db_path, args).await?,
        Subcommand::Summary(args) => summary_cmd::run(db_path, args).await?,
    }
    Ok(())
}
