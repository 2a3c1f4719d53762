use anyhow::Result;
use clap::Parser;
use rdetl::{init_tracing_once, EtlConfig, RedditDuckDbEtl, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;

/// ETL pipeline for Reddit data: newest subreddit posts into a DuckDB table.
#[derive(Parser, Debug)]
#[command(name = "reddit-duckdb-etl", version)]
struct Args {
    /// Keep posts created on or after this date (YYYY-MM-DD, midnight UTC).
    #[arg(long = "start-date", alias = "start_date")]
    start_date: String,

    /// Maximum number of newest posts to pull.
    #[arg(long = "no-of-threads", aliases = ["no_of_threads", "max-items"], default_value_t = 2000)]
    no_of_threads: usize,

    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Show a progress bar while fetching.
    #[arg(long)]
    progress: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match EtlConfig::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            init_tracing_once("info");
            tracing::error!("{}", e);
            return Err(e.into());
        }
    };
    init_tracing_once(&config.logging.level);
    tracing::debug!(
        "Arguments provided are start_date: {} and no_of_threads: {}",
        args.start_date,
        args.no_of_threads
    );

    let res = RedditDuckDbEtl::from_config(&config)
        .and_then(|etl| etl.progress(args.progress).run(&args.start_date, args.no_of_threads));
    match res {
        Ok(summary) => {
            println!("Loaded {} posts into '{}'", summary.loaded, config.duckdb.table_name);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Error in main ETL process: {:#}", e);
            Err(e)
        }
    }
}
