use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod assemble;
mod blob;
mod config;
mod db;
mod error;
mod extract;
mod fetch;
mod reconcile;
mod scrape;
mod store;
#[cfg(test)]
mod testing;
mod types;
mod update;
mod utils;

use config::Config;
use fetch::CachedClient;
use store::CsvStore;
use utils::osc8_file_link;

#[derive(Parser)]
#[command(name = "covid19-stats")]
#[command(about = "Per-country COVID-19 statistics scraper and daily updater")]
struct Cli {
    /// CONL configuration file (defaults to ./covid19.conl when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the CSV files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Year to attach to chart dates, which carry none
    #[arg(long, global = true)]
    year: Option<i32>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract full history from each country page into CSV
    Scrape {
        /// Only this country slug (e.g. "saudi-arabia")
        #[arg(value_name = "SLUG")]
        country: Option<String>,
        /// Quiet mode - suppress progress output
        #[arg(short, long)]
        quiet: bool,
        /// Always fetch pages instead of reusing today's cached copies
        #[arg(long)]
        no_cache: bool,
    },
    /// Rebuild the cross-country totals table
    Overall,
    /// Append today's figures to every country series
    Update,
    /// Mirror the CSV data into SQLite
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Drop and recreate all tables from the CSV files
    Init {
        /// Output SQLite database file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Insert today's rows that are missing from the database
    Update {
        /// Output SQLite database file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if cli.year.is_some() {
        config.year = cli.year;
    }

    let today = Local::now().date_naive();
    let store = CsvStore::new(&config);

    match cli.command {
        Commands::Scrape {
            country,
            quiet,
            no_cache,
        } => {
            let cache = (!no_cache).then_some(config.cache_dir.as_path());
            let client = CachedClient::new(cache, today)?;
            scrape::run_scrape(&config, &client, &store, country.as_deref(), quiet)?;
            if !quiet {
                let dir = config.data_dir.to_string_lossy();
                println!("Done! Series written to {}", osc8_file_link(&dir, &dir));
            }
        }
        Commands::Overall => {
            // the table changes through the day, never serve it from cache
            let client = CachedClient::new(None, today)?;
            aggregate::run_overall(&config, &client, &store, today)?;
        }
        Commands::Update => {
            // all active-case figures depend on this table, so it must load first
            let snapshot = store
                .read_aggregate()
                .context("Run 'covid19-stats overall' to build the aggregate table first")?;
            let client = CachedClient::new(None, today)?;
            update::run_update(&config, &client, &store, &snapshot, today)?;
        }
        Commands::Db { action } => match action {
            DbAction::Init { output } => {
                let output = output.unwrap_or_else(|| config.database.clone());
                db::run_db_init(&config, &output)?;
            }
            DbAction::Update { output } => {
                let output = output.unwrap_or_else(|| config.database.clone());
                db::run_db_update(&config, &output, today)?;
            }
        },
    }

    Ok(())
}
