//! Load stage: full replace of the destination table, plus ad-hoc queries.

use crate::config::EtlConfig;
use crate::store::{DuckDbConnector, StoreConnection, StoreConnector};
use crate::table::Table;
use crate::util::quote_ident;
use anyhow::Result;

/// Name under which the input table is staged during a load.
pub const STAGING_TABLE: &str = "temp_reddit_posts";

pub struct Loader<C> {
    connector: C,
    table_name: String,
}

impl Loader<DuckDbConnector> {
    pub fn from_config(cfg: &EtlConfig) -> Self {
        Self::new(DuckDbConnector::new(&cfg.duckdb), cfg.duckdb.table_name.clone())
    }
}

impl<C: StoreConnector> Loader<C> {
    pub fn new(connector: C, table_name: impl Into<String>) -> Self {
        let table_name = table_name.into();
        tracing::info!("Loader initialized for table: {}", table_name);
        Self { connector, table_name }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Replace the configured destination table with `table`.
    pub fn load(&self, table: &Table) -> Result<()> {
        self.load_into(table, &self.table_name)
    }

    /// Drop `dest`, stage `table`, `CREATE TABLE dest AS SELECT` from the
    /// staging table, then unstage. The connection is released on every path.
    ///
    /// A failure after the drop leaves `dest` absent.
    pub fn load_into(&self, table: &Table, dest: &str) -> Result<()> {
        tracing::debug!("Total no of rows in table before loading: {}", table.num_rows());
        tracing::debug!("Target table: {}, target database: {}", dest, self.connector.target());

        let mut conn = self.connector.connect()?;
        let res = replace_table(&mut conn, table, dest);
        drop(conn);
        match &res {
            Ok(()) => tracing::info!("Data loaded successfully into table '{}'", dest),
            Err(e) => tracing::error!("Error during data loading operation: {:#}", e),
        }
        res
    }

    /// Run trusted SQL (it comes from the local config file) and collect the rows.
    pub fn query(&self, sql: &str) -> Result<Table> {
        let mut conn = self.connector.connect()?;
        let res = conn.query(sql);
        if let Err(e) = &res {
            tracing::error!("Error during query operation: {:#}", e);
        }
        res
    }
}

fn replace_table<S: StoreConnection>(conn: &mut S, table: &Table, dest: &str) -> Result<()> {
    let dest = quote_ident(dest);
    conn.execute(&format!("DROP TABLE IF EXISTS {dest}"))?;
    conn.register(STAGING_TABLE, table)?;
    tracing::info!("Loading data into table {}", dest);
    conn.execute(&format!("CREATE TABLE {dest} AS SELECT * FROM {}", quote_ident(STAGING_TABLE)))?;
    conn.unregister(STAGING_TABLE)?;
    Ok(())
}
