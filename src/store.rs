//! Embedded store adapter. A `StoreConnector` hands out scoped connections;
//! dropping a connection closes it.

use crate::config::DuckDbConfig;
use crate::date::{date_from_epoch_days, datetime_from_epoch_micros, format_date, format_datetime};
use crate::table::{Cell, Column, DataType, Table};
use crate::util::quote_ident;
use anyhow::{bail, Context, Result};
use duckdb::types::{TimeUnit, Value};
use duckdb::Connection;

pub trait StoreConnection {
    /// Run one or more statements that return no rows.
    fn execute(&mut self, sql: &str) -> Result<()>;
    /// Stage `table` under `name` so SQL can select from it.
    fn register(&mut self, name: &str, table: &Table) -> Result<()>;
    fn unregister(&mut self, name: &str) -> Result<()>;
    /// Run `sql` and materialise every result row.
    fn query(&mut self, sql: &str) -> Result<Table>;
}

pub trait StoreConnector {
    type Connection: StoreConnection;
    fn connect(&self) -> Result<Self::Connection>;
    /// Human-readable target, for logs.
    fn target(&self) -> &str;
}

pub struct DuckDbConnector {
    connection_string: String,
}

impl DuckDbConnector {
    pub fn new(cfg: &DuckDbConfig) -> Self {
        tracing::info!("DuckDB connector initialized with connection string.");
        Self { connection_string: cfg.connection_string.clone() }
    }
}

impl StoreConnector for DuckDbConnector {
    type Connection = DuckDbConnection;

    fn connect(&self) -> Result<DuckDbConnection> {
        let target = self.connection_string.trim();
        let conn = if target.is_empty() || target == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(target)
        };
        match conn {
            Ok(conn) => {
                tracing::info!("Connected to DuckDB successfully.");
                Ok(DuckDbConnection { conn })
            }
            Err(e) => {
                tracing::error!("Error connecting to DuckDB: {}", e);
                Err(e).with_context(|| format!("opening DuckDB at '{}'", self.connection_string))
            }
        }
    }

    fn target(&self) -> &str {
        &self.connection_string
    }
}

pub struct DuckDbConnection {
    conn: Connection,
}

impl StoreConnection for DuckDbConnection {
    fn execute(&mut self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql).with_context(|| format!("executing `{sql}`"))
    }

    /// Staged as a temporary table: typed columns, rows bound as parameters.
    fn register(&mut self, name: &str, table: &Table) -> Result<()> {
        if table.num_columns() == 0 {
            bail!("cannot stage '{}': table has no columns", name);
        }
        let ident = quote_ident(name);
        let defs: Vec<String> = table
            .columns()
            .iter()
            .map(|c| format!("{} {}", quote_ident(c.name()), sql_type(c.dtype())))
            .collect();
        self.execute(&format!("CREATE OR REPLACE TEMP TABLE {ident} ({})", defs.join(", ")))?;

        let placeholders: Vec<&str> = table.columns().iter().map(|c| placeholder(c.dtype())).collect();
        let insert = format!("INSERT INTO {ident} VALUES ({})", placeholders.join(", "));
        let mut stmt = self.conn.prepare(&insert).with_context(|| format!("preparing `{insert}`"))?;
        let dtypes: Vec<DataType> = table.columns().iter().map(Column::dtype).collect();
        for (i, row) in table.rows().enumerate() {
            let params = row.iter().zip(&dtypes).map(|(cell, dtype)| to_duck_value(cell, *dtype));
            stmt.execute(duckdb::params_from_iter(params))
                .with_context(|| format!("staging row {i} into {name}"))?;
        }
        Ok(())
    }

    fn unregister(&mut self, name: &str) -> Result<()> {
        self.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)))
    }

    fn query(&mut self, sql: &str) -> Result<Table> {
        let mut stmt = self.conn.prepare(sql).with_context(|| format!("preparing `{sql}`"))?;
        let mut rows = stmt.query([]).with_context(|| format!("running `{sql}`"))?;
        let names: Vec<String> = rows.as_ref().map(|s| s.column_names()).unwrap_or_default();

        let mut cols: Vec<Vec<Cell>> = vec![Vec::new(); names.len()];
        while let Some(row) = rows.next()? {
            for (i, col) in cols.iter_mut().enumerate() {
                let v: Value = row.get(i)?;
                col.push(cell_from_duck(v));
            }
        }
        let columns = names.into_iter().zip(cols).map(|(n, cells)| Column::new(n, cells)).collect();
        Ok(Table::from_columns(columns)?)
    }
}

fn sql_type(dtype: DataType) -> &'static str {
    match dtype {
        DataType::Int64 => "BIGINT",
        DataType::Float64 => "DOUBLE",
        DataType::Boolean => "BOOLEAN",
        DataType::Date => "DATE",
        DataType::Datetime => "TIMESTAMP",
        DataType::Text | DataType::Null | DataType::Mixed => "VARCHAR",
    }
}

fn placeholder(dtype: DataType) -> &'static str {
    match dtype {
        DataType::Date => "CAST(? AS DATE)",
        DataType::Datetime => "CAST(? AS TIMESTAMP)",
        _ => "?",
    }
}

/// Dates and datetimes travel as text and are cast by the INSERT; columns
/// without a single native type are stored as their text rendering.
fn to_duck_value(cell: &Cell, dtype: DataType) -> Value {
    match (cell, dtype) {
        (Cell::Null, _) => Value::Null,
        (Cell::Int(n), DataType::Int64) => Value::BigInt(*n),
        (Cell::Float(x), DataType::Float64) => Value::Double(*x),
        (Cell::Bool(b), DataType::Boolean) => Value::Boolean(*b),
        (Cell::Date(d), DataType::Date) => Value::Text(format_date(*d)),
        (Cell::Datetime(dt), DataType::Datetime) => Value::Text(format_datetime(*dt)),
        (other, _) => Value::Text(other.to_string()),
    }
}

fn cell_from_duck(v: Value) -> Cell {
    match v {
        Value::Null => Cell::Null,
        Value::Boolean(b) => Cell::Bool(b),
        Value::TinyInt(n) => Cell::Int(n.into()),
        Value::SmallInt(n) => Cell::Int(n.into()),
        Value::Int(n) => Cell::Int(n.into()),
        Value::BigInt(n) => Cell::Int(n),
        Value::UTinyInt(n) => Cell::Int(n.into()),
        Value::USmallInt(n) => Cell::Int(n.into()),
        Value::UInt(n) => Cell::Int(n.into()),
        Value::UBigInt(n) => i64::try_from(n).map(Cell::Int).unwrap_or(Cell::Float(n as f64)),
        Value::HugeInt(n) => i64::try_from(n).map(Cell::Int).unwrap_or(Cell::Float(n as f64)),
        Value::Float(x) => Cell::Float(x.into()),
        Value::Double(x) => Cell::Float(x),
        Value::Text(s) | Value::Enum(s) => Cell::Text(s),
        Value::Date32(days) => date_from_epoch_days(days).map(Cell::Date).unwrap_or(Cell::Null),
        Value::Timestamp(unit, t) => {
            let micros = match unit {
                TimeUnit::Second => t.saturating_mul(1_000_000),
                TimeUnit::Millisecond => t.saturating_mul(1_000),
                TimeUnit::Microsecond => t,
                TimeUnit::Nanosecond => t / 1_000,
            };
            datetime_from_epoch_micros(micros).map(Cell::Datetime).unwrap_or(Cell::Null)
        }
        other => Cell::Text(format!("{other:?}")),
    }
}
