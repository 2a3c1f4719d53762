mod config;
mod date;
mod error;
mod table;
mod util;
mod progress;

mod reddit;
mod extract;
mod transform;
mod store;
mod load;
mod pipeline;
mod query;

pub use crate::config::{
    DefaultValue, DuckDbConfig, EtlConfig, LoggingConfig, RedditConfig, TransformationConfig,
    DEFAULT_CONFIG_PATH,
};
pub use crate::date::StartDate;
pub use crate::error::{ConfigError, DateParseError, ListingError, SchemaMismatch, TableError, TransformError};
pub use crate::table::{Cell, Column, DataType, Table};

// API client adapter + extraction
pub use crate::reddit::{RedditClient, Submission, SubmissionFeed, SubmissionIter};
pub use crate::extract::Extractor;

// transform stage and the names of the columns it adds
pub use crate::transform::{
    Transformer, CREATED_DATE, CREATED_DATETIME, DAY, MONTH, STORED_AT, WEEK_OF_YEAR,
};

// store adapter, loader and the two entry-point drivers
pub use crate::store::{DuckDbConnection, DuckDbConnector, StoreConnection, StoreConnector};
pub use crate::load::{Loader, STAGING_TABLE};
pub use crate::pipeline::{RedditDuckDbEtl, RunSummary};
pub use crate::query::{QueryRunner, QuerySummary};

pub use crate::util::{init_tracing_once, log_filter_for, quote_ident};
