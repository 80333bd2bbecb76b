use clap::{Parser, Subcommand};
use loaded_filter::{
    DateRange, FilterCacheManager, FilterManagerConfig, InMemoryIngestionLog,
    LoadedBatch, MembershipStats,
    common::{bits2hr, from_epoch_millis, to_epoch_millis},
};
use std::{
    ops::Bound,
    path::{Path, PathBuf},
    time::SystemTime,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a lastUpdated search is provably empty
    Query {
        /// JSON file holding the batch log
        #[arg(short, long)]
        log: PathBuf,

        /// Record key (beneficiary id); omit to check bounds only
        #[arg(short, long)]
        key: Option<String>,

        /// Lower bound, epoch milliseconds
        #[arg(long)]
        from_ms: Option<u64>,

        /// Treat the lower bound as exclusive
        #[arg(long, requires = "from_ms")]
        from_exclusive: bool,

        /// Upper bound, epoch milliseconds
        #[arg(long)]
        to_ms: Option<u64>,

        /// Treat the upper bound as exclusive
        #[arg(long, requires = "to_ms")]
        to_exclusive: bool,
    },

    /// Display information about the filters built from a batch log
    Stats {
        /// JSON file holding the batch log
        #[arg(short, long)]
        log: PathBuf,
    },
}

fn bound(millis: Option<u64>, exclusive: bool) -> Bound<SystemTime> {
    match millis.map(from_epoch_millis) {
        Some(t) if exclusive => Bound::Excluded(t),
        Some(t) => Bound::Included(t),
        None => Bound::Unbounded,
    }
}

fn fmt_instant(instant: Option<SystemTime>) -> String {
    instant
        .map(|t| to_epoch_millis(t).to_string())
        .unwrap_or_else(|| "-".to_string())
}

async fn load_manager(
    path: &Path,
) -> Result<FilterCacheManager<InMemoryIngestionLog>, Box<dyn std::error::Error>>
{
    let contents = std::fs::read_to_string(path)?;
    let batches: Vec<LoadedBatch> = serde_json::from_str(&contents)?;
    let log = InMemoryIngestionLog::from_batches(batches);

    let manager = FilterCacheManager::new(log, FilterManagerConfig::from_env()?)?;
    manager.init();
    manager.refresh_filters().await?;
    Ok(manager)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Query {
            log,
            key,
            from_ms,
            from_exclusive,
            to_ms,
            to_exclusive,
        } => {
            let manager = load_manager(log).await?;
            let range = DateRange::new(
                bound(*from_ms, *from_exclusive),
                bound(*to_ms, *to_exclusive),
            );

            println!("In bounds: {}", manager.is_in_bounds(Some(&range))?);
            if let Some(key) = key {
                let empty = manager.is_result_set_empty(key, Some(&range))?;
                if empty {
                    println!("Result set for '{key}': provably empty");
                } else {
                    println!("Result set for '{key}': may contain records");
                }
            }
            println!(
                "Transaction time: {}",
                to_epoch_millis(manager.transaction_time()?)
            );
        }
        Commands::Stats { log } => {
            let manager = load_manager(log).await?;
            let cache = manager.snapshot()?;

            println!("Filters: {}", cache.len());
            println!(
                "First batch created: {}",
                fmt_instant(cache.first_batch_created())
            );
            println!(
                "Last batch created: {}",
                fmt_instant(cache.last_batch_created())
            );
            println!(
                "Last batch id: {}",
                cache
                    .last_batch_id()
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string())
            );
            println!("Total memory: {}", bits2hr(cache.memory_bits()));
            for filter in cache.filters() {
                let membership = filter.membership();
                println!(
                    "  file {:>6} | batches {:>5} | {} .. {} | {} bits, {} hashes, est. fpr {:.4}",
                    filter.loaded_file_id(),
                    filter.batch_count(),
                    to_epoch_millis(filter.created_lower()),
                    to_epoch_millis(filter.created_upper()),
                    membership.bit_size(),
                    membership.num_hashes(),
                    membership.estimated_false_positive_rate()
                );
            }
        }
    }

    Ok(())
}
