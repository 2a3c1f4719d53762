//! Column-major in-memory table passed between the extract, transform and load
//! stages, plus the closed set of logical column types used for validation.

use crate::date::{format_date, format_datetime};
use crate::error::TableError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use time::{Date, PrimitiveDateTime};

/// A single scalar value. `Null` is the explicit "absent" sentinel.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(Date),
    Datetime(PrimitiveDateTime),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Logical type of this value, `None` for `Null`.
    pub fn kind(&self) -> Option<DataType> {
        match self {
            Cell::Null => None,
            Cell::Text(_) => Some(DataType::Text),
            Cell::Int(_) => Some(DataType::Int64),
            Cell::Float(_) => Some(DataType::Float64),
            Cell::Bool(_) => Some(DataType::Boolean),
            Cell::Date(_) => Some(DataType::Date),
            Cell::Datetime(_) => Some(DataType::Datetime),
        }
    }

    /// Numeric view of `Int`/`Float` cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(n) => Some(*n as f64),
            Cell::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Map a JSON attribute onto a cell. Nested arrays/objects keep their JSON text.
    pub fn from_json(v: &Value) -> Cell {
        match v {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Int(i),
                None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Null),
            },
            Value::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("NULL"),
            Cell::Text(s) => f.write_str(s),
            Cell::Int(n) => write!(f, "{n}"),
            Cell::Float(x) => write!(f, "{x:?}"),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Date(d) => f.write_str(&format_date(*d)),
            Cell::Datetime(dt) => f.write_str(&format_datetime(*dt)),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}
impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}
impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Int(n)
    }
}
impl From<f64> for Cell {
    fn from(x: f64) -> Self {
        Cell::Float(x)
    }
}
impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Bool(b)
    }
}
impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Cell::Null)
    }
}

/// Logical column type.
///
/// Only the first six variants can be named in a configured schema; `Null`
/// (no non-null values) and `Mixed` (incompatible kinds) exist so that every
/// column has a type to report when validation fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum DataType {
    Text,
    Int64,
    Float64,
    Boolean,
    Date,
    Datetime,
    Null,
    Mixed,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Text => "text",
            DataType::Int64 => "int64",
            DataType::Float64 => "float64",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Datetime => "datetime",
            DataType::Null => "null",
            DataType::Mixed => "mixed",
        }
    }

    /// Type of a column holding `cells`. Ints mixed with floats widen to `Float64`.
    pub fn infer(cells: &[Cell]) -> DataType {
        let mut seen: Option<DataType> = None;
        for kind in cells.iter().filter_map(Cell::kind) {
            seen = Some(match seen {
                None => kind,
                Some(prev) if prev == kind => prev,
                Some(DataType::Int64) if kind == DataType::Float64 => DataType::Float64,
                Some(DataType::Float64) if kind == DataType::Int64 => DataType::Float64,
                Some(_) => return DataType::Mixed,
            });
        }
        seen.unwrap_or(DataType::Null)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "string" | "str" | "varchar" => Ok(DataType::Text),
            "int64" | "int" | "integer" | "bigint" => Ok(DataType::Int64),
            "float64" | "float" | "double" => Ok(DataType::Float64),
            "boolean" | "bool" => Ok(DataType::Boolean),
            "date" => Ok(DataType::Date),
            "datetime" | "timestamp" => Ok(DataType::Datetime),
            other => Err(format!(
                "unsupported column type '{other}' (expected text, int64, float64, boolean, date or datetime)"
            )),
        }
    }
}

impl TryFrom<String> for DataType {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    name: String,
    dtype: DataType,
    cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self::with_fallback(name, cells, DataType::Null)
    }

    /// Like `new`, but an all-null column takes `fallback` as its type.
    pub fn with_fallback(name: impl Into<String>, mut cells: Vec<Cell>, fallback: DataType) -> Self {
        let mut dtype = DataType::infer(&cells);
        if dtype == DataType::Float64 {
            for c in cells.iter_mut() {
                if let Cell::Int(n) = *c {
                    *c = Cell::Float(n as f64);
                }
            }
        }
        if dtype == DataType::Null {
            dtype = fallback;
        }
        Self { name: name.into(), dtype, cells }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn dtype(&self) -> DataType {
        self.dtype
    }
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
    pub fn get(&self, row: usize) -> Option<&Cell> {
        self.cells.get(row)
    }
    pub fn len(&self) -> usize {
        self.cells.len()
    }
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
    pub fn null_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_null()).count()
    }

    /// Replace every null with `value`; returns how many cells changed.
    pub fn fill_nulls(&mut self, value: &Cell) -> usize {
        let mut filled = 0;
        for c in self.cells.iter_mut().filter(|c| c.is_null()) {
            *c = value.clone();
            filled += 1;
        }
        if filled > 0 {
            let fallback = self.dtype;
            let cells = std::mem::take(&mut self.cells);
            *self = Column::with_fallback(std::mem::take(&mut self.name), cells, fallback);
        }
        filled
    }
}

/// Ordered columns of equal length. Row identity is position only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Zero-row table with the given column names.
    pub fn empty<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { columns: names.into_iter().map(|n| Column::new(n, Vec::new())).collect() }
    }

    pub fn from_rows<S: AsRef<str>>(names: &[S], rows: Vec<Vec<Cell>>) -> Result<Self, TableError> {
        let width = names.len();
        let mut cols: Vec<Vec<Cell>> = (0..width).map(|_| Vec::with_capacity(rows.len())).collect();
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(TableError::RowWidth { row: i, expected: width, found: row.len() });
            }
            for (col, cell) in cols.iter_mut().zip(row) {
                col.push(cell);
            }
        }
        Self::from_columns(names.iter().zip(cols).map(|(n, cells)| Column::new(n.as_ref(), cells)).collect())
    }

    pub fn from_columns(columns: Vec<Column>) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        let rows = columns.first().map(Column::len).unwrap_or(0);
        for c in &columns {
            if !seen.insert(c.name()) {
                return Err(TableError::DuplicateColumn(c.name.clone()));
            }
            if c.len() != rows {
                return Err(TableError::ColumnLength { column: c.name.clone(), expected: rows, found: c.len() });
            }
        }
        Ok(Self { columns })
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Append `column`, or replace an existing column of the same name in place.
    pub fn with_column(mut self, column: Column) -> Result<Self, TableError> {
        if !self.columns.is_empty() && column.len() != self.num_rows() {
            return Err(TableError::ColumnLength {
                column: column.name.clone(),
                expected: self.num_rows(),
                found: column.len(),
            });
        }
        self.put_column(column);
        Ok(self)
    }

    /// Caller guarantees `column` has `num_rows()` cells.
    pub(crate) fn put_column(&mut self, column: Column) {
        debug_assert!(self.columns.is_empty() || column.len() == self.num_rows());
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(slot) => *slot = column,
            None => self.columns.push(column),
        }
    }

    /// Put `column` last, dropping any existing column of the same name first.
    /// Caller guarantees `column` has `num_rows()` cells.
    pub(crate) fn append_column(&mut self, column: Column) {
        self.columns.retain(|c| c.name != column.name);
        self.put_column(column);
    }

    pub fn row(&self, i: usize) -> Option<Vec<&Cell>> {
        if i >= self.num_rows() {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.cells[i]).collect())
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<&Cell>> + '_ {
        (0..self.num_rows()).map(move |i| self.columns.iter().map(|c| &c.cells[i]).collect())
    }
}

/// Right-aligned text grid with a leading row index, for printing query results.
impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.num_rows() == 0 {
            return write!(f, "Empty table\nColumns: [{}]", self.column_names().join(", "));
        }
        let rendered: Vec<Vec<String>> =
            self.columns.iter().map(|c| c.cells.iter().map(ToString::to_string).collect()).collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .zip(&rendered)
            .map(|(c, vals)| vals.iter().map(|v| v.chars().count()).chain([c.name.chars().count()]).max().unwrap_or(0))
            .collect();
        let index_width = (self.num_rows() - 1).to_string().len();

        write!(f, "{:index_width$}", "")?;
        for (c, w) in self.columns.iter().zip(&widths) {
            write!(f, "  {:>w$}", c.name, w = *w)?;
        }
        for row in 0..self.num_rows() {
            write!(f, "\n{row:<index_width$}")?;
            for (vals, w) in rendered.iter().zip(&widths) {
                write!(f, "  {:>w$}", vals[row], w = *w)?;
            }
        }
        Ok(())
    }
}
