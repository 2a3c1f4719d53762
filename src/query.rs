//! Query runner: executes the named SQL statements from the `queries` config
//! section and prints each result.

use crate::config::EtlConfig;
use crate::load::Loader;
use crate::store::{DuckDbConnector, StoreConnector};
use anyhow::{bail, Result};
use indexmap::IndexMap;

/// Names of the queries that ran and the ones that failed, in config order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuerySummary {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

pub struct QueryRunner<C> {
    loader: Loader<C>,
    queries: IndexMap<String, String>,
}

impl QueryRunner<DuckDbConnector> {
    pub fn from_config(cfg: &EtlConfig) -> Self {
        Self::new(Loader::from_config(cfg), cfg.queries.clone())
    }
}

impl<C: StoreConnector> QueryRunner<C> {
    pub fn new(loader: Loader<C>, queries: IndexMap<String, String>) -> Self {
        Self { loader, queries }
    }

    /// A failing query is logged and does not stop the remaining ones.
    pub fn run_queries(&self) -> Result<QuerySummary> {
        if self.queries.is_empty() {
            bail!("No queries found in the config file.");
        }
        let mut summary = QuerySummary::default();
        for (name, sql) in &self.queries {
            match self.loader.query(sql) {
                Ok(table) => {
                    tracing::info!("Results for {} ({} rows)", name, table.num_rows());
                    println!("Results for {name}\n{table}\n");
                    summary.succeeded.push(name.clone());
                }
                Err(e) => {
                    tracing::error!("Error executing {}: {:#}", name, e);
                    summary.failed.push(name.clone());
                }
            }
        }
        Ok(summary)
    }
}
