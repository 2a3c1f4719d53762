use anyhow::Result;
use clap::Parser;
use rdetl::{init_tracing_once, EtlConfig, QueryRunner, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;

/// Run the named SQL statements from the `queries` config section against DuckDB.
#[derive(Parser, Debug)]
#[command(name = "run-duckdb-query", version)]
struct Args {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
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

    let summary = QueryRunner::from_config(&config).run_queries()?;
    if !summary.failed.is_empty() {
        tracing::warn!("{} of {} queries failed: {}", summary.failed.len(),
            summary.failed.len() + summary.succeeded.len(), summary.failed.join(", "));
    }
    Ok(())
}
