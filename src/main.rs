mod config;
mod database;
mod error;
mod executor;
mod generator;
mod progress;
mod registry;
mod report;
mod workload;

use crate::config::WorkloadConfig;
use crate::database::{ReadOptions, WriteOptions, get_db};
use crate::workload::Bench;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;

const LONG_ABOUT: &str = "\
Runs a fixed sequence of phases against a key-value store and prints one \
JSON record per phase on stdout:

  small seq fill, small seq overwrite, small rand fill,
  small rand overwrite (x3), sequential read, large rand fill,
  large rand overwrite, sequential read, random read, compaction

Sequential keys count down from the largest 64-bit value; random keys are \
truncated SHA-1 digests of the entry index, so every run writes the same \
key set. Progress and logs go to stderr.";

#[derive(Parser)]
#[command(version, about = "Multi-phase key-value store benchmark", long_about = LONG_ABOUT)]
struct Cli {
    #[arg(value_enum, default_value = "redb")]
    database: DatabaseType,

    /// Directory for the database files (a temporary directory if unset)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// The number of small entries to write in the db
    #[arg(long, default_value_t = 1_000_000)]
    small_fill_limit: u64,

    /// The number of large entries to write in the db
    #[arg(long, default_value_t = 2_000)]
    large_fill_limit: u64,

    /// The number of reads each read phase performs
    #[arg(long, default_value_t = 10_000_000)]
    read_limit: u64,

    /// The number of random bytes to store for small entries
    #[arg(long, default_value_t = 32)]
    small_value_size: usize,

    /// The number of random bytes to store for large entries
    #[arg(long, default_value_t = 102_400)]
    large_value_size: usize,

    /// The byte length of the keys
    #[arg(long, default_value_t = 8)]
    key_size: usize,

    /// The number of concurrent operations
    #[arg(long, default_value_t = 1)]
    degree_of_parallelism: u8,

    /// Sync each write
    #[arg(long)]
    sync_writes: bool,

    /// Disable write merging
    #[arg(long)]
    no_merge_write: bool,

    /// Do not fill the read cache on random reads
    #[arg(long)]
    dont_fill_read_cache: bool,

    /// Make random reads in strict mode (a missing key fails the run)
    #[arg(long)]
    read_strict: bool,

    /// Seed for the value bytes
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Do not draw progress bars
    #[arg(long)]
    no_progress: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
// Update database::get_db when adding new variation
enum DatabaseType {
    MemBtree,
    Redb,
    Sled,
}

impl Cli {
    fn workload_config(&self) -> WorkloadConfig {
        WorkloadConfig {
            key_size: self.key_size,
            small_value_size: self.small_value_size,
            large_value_size: self.large_value_size,
            small_fill_limit: self.small_fill_limit,
            large_fill_limit: self.large_fill_limit,
            read_limit: self.read_limit,
            parallelism: self.degree_of_parallelism as usize,
            seed: self.seed,
            write: WriteOptions {
                sync: self.sync_writes,
                no_write_merge: self.no_merge_write,
            },
            read: ReadOptions {
                dont_fill_cache: self.dont_fill_read_cache,
                strict: self.read_strict,
            },
        }
    }
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt};
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kvphases={level}")));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.workload_config();
    info!(database = ?cli.database, ?config, "starting benchmark");

    let database = get_db(cli.database, cli.db_path.as_deref())?;
    let report = Bench::new(database, config)?
        .with_progress(!cli.no_progress)
        .run()?;
    info!(phases = report.phases().len(), "closing database");

    eprintln!("{}", report);
    println!("{}", report.to_json()?);
    Ok(())
}
