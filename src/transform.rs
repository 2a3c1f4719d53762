//! Transform stage: default backfill, derived calendar columns, the
//! `stored_at` ingestion stamp, and schema validation.
//!
//! Each step is public so it can be driven on its own; `transform` runs them
//! in the fixed order fill -> datetime columns + stamp -> validate.

use crate::config::EtlConfig;
use crate::date::{datetime_from_epoch_seconds, iso_week, month_name, now_utc, weekday_name};
use crate::error::{SchemaMismatch, TransformError};
use crate::table::{Cell, Column, DataType, Table};
use indexmap::IndexMap;
use time::PrimitiveDateTime;

pub const CREATED_DATETIME: &str = "created_datetime";
pub const CREATED_DATE: &str = "created_date";
pub const DAY: &str = "day";
pub const MONTH: &str = "month";
pub const WEEK_OF_YEAR: &str = "week_of_year";
pub const STORED_AT: &str = "stored_at";

#[derive(Clone, Debug)]
pub struct Transformer {
    date_column: String,
    default_values: IndexMap<String, Cell>,
    expected_schema: IndexMap<String, DataType>,
}

impl Transformer {
    pub fn new(cfg: &EtlConfig) -> Self {
        tracing::info!("Transformer initialized.");
        Self {
            date_column: cfg.transformation.date_column.clone(),
            default_values: cfg.default_values.iter().map(|(k, v)| (k.clone(), v.to_cell())).collect(),
            expected_schema: cfg.schema.clone(),
        }
    }

    pub fn date_column(&self) -> &str {
        &self.date_column
    }

    pub fn transform(&self, table: Table) -> Result<Table, TransformError> {
        self.transform_at(table, now_utc())
    }

    /// `transform` with an explicit `stored_at` timestamp.
    pub fn transform_at(&self, table: Table, stored_at: PrimitiveDateTime) -> Result<Table, TransformError> {
        tracing::info!("Starting data transformation.");
        let table = self.fill_missing_values(table);
        let table = self.add_datetime_columns(table);
        let table = self.stamp_stored_at(table, stored_at);

        match self.schema_mismatch(&table) {
            None => {
                tracing::info!("Data transformation completed.");
                Ok(table)
            }
            Some(mismatch) => {
                tracing::warn!("{}", mismatch);
                tracing::error!("Table schema validation failed.");
                Err(TransformError::SchemaValidation(mismatch))
            }
        }
    }

    /// Replace nulls in every configured column the table actually has.
    pub fn fill_missing_values(&self, mut table: Table) -> Table {
        for (column, default) in &self.default_values {
            let Some(col) = table.column_mut(column) else { continue };
            let filled = col.fill_nulls(default);
            if filled > 0 {
                tracing::info!(
                    "Column '{}' contained {} missing values. Filled with default value: {}.",
                    column, filled, default
                );
            }
        }
        table
    }

    /// Append created_datetime, created_date, day, month, week_of_year derived
    /// from the date column (Unix seconds, UTC). Without that column the table
    /// comes back untouched. Existing columns with those names are replaced
    /// and move to the end.
    pub fn add_datetime_columns(&self, mut table: Table) -> Table {
        let Some(source) = table.column(&self.date_column) else {
            tracing::warn!("Column '{}' not found in the table.", self.date_column);
            return table;
        };

        let moments: Vec<Option<PrimitiveDateTime>> = source
            .cells()
            .iter()
            .map(|c| c.as_f64().and_then(datetime_from_epoch_seconds))
            .collect();

        let derive = |f: &dyn Fn(PrimitiveDateTime) -> Cell| -> Vec<Cell> {
            moments.iter().map(|m| m.map(f).unwrap_or(Cell::Null)).collect()
        };

        let derived = [
            Column::with_fallback(CREATED_DATETIME, derive(&Cell::Datetime), DataType::Datetime),
            Column::with_fallback(CREATED_DATE, derive(&|dt| Cell::Date(dt.date())), DataType::Date),
            Column::with_fallback(DAY, derive(&|dt| Cell::Text(weekday_name(dt.date()))), DataType::Text),
            Column::with_fallback(MONTH, derive(&|dt| Cell::Text(month_name(dt.date()))), DataType::Text),
            Column::with_fallback(
                WEEK_OF_YEAR,
                derive(&|dt| Cell::Int(i64::from(iso_week(dt.date())))),
                DataType::Int64,
            ),
        ];
        for column in derived {
            table.append_column(column);
        }
        tracing::info!("Datetime columns added to the table.");
        table
    }

    /// Same timestamp on every row.
    pub fn stamp_stored_at(&self, mut table: Table, at: PrimitiveDateTime) -> Table {
        let cells = vec![Cell::Datetime(at); table.num_rows()];
        table.append_column(Column::with_fallback(STORED_AT, cells, DataType::Datetime));
        table
    }

    /// True iff every configured column exists with exactly the expected type.
    /// Logs the first mismatch only.
    pub fn validate_schema(&self, table: &Table) -> bool {
        match self.schema_mismatch(table) {
            None => {
                tracing::info!("Table schema is validated.");
                true
            }
            Some(mismatch) => {
                tracing::warn!("{}", mismatch);
                false
            }
        }
    }

    /// First configured column (in configuration order) that is missing or mistyped.
    pub fn schema_mismatch(&self, table: &Table) -> Option<SchemaMismatch> {
        self.expected_schema.iter().find_map(|(column, &expected)| {
            let found = table.column(column).map(Column::dtype);
            (found != Some(expected)).then(|| SchemaMismatch { column: column.clone(), expected, found })
        })
    }
}
