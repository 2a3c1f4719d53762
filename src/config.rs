use crate::error::ConfigError;
use crate::table::{Cell, DataType};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use std::path::Path;

/// Default location of the shared configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";

/// Typed configuration, built once at start-up and handed to each component.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub reddit: RedditConfig,
    pub duckdb: DuckDbConfig,
    pub transformation: TransformationConfig,
    pub default_values: IndexMap<String, DefaultValue>,
    pub schema: IndexMap<String, DataType>,
    pub queries: IndexMap<String, String>,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
    pub subreddit: String,            // normalized lowercase, no "r/"
    #[serde(deserialize_with = "column_list")]
    pub columns: Vec<String>,         // projection, in output order
    pub auth_url: String,
    pub api_url: String,
    pub page_size: usize,             // listing page size, capped at 100 by the API
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            user_agent: String::new(),
            subreddit: "dataengineering".to_string(),
            columns: ["id", "title", "author", "created_utc", "score", "num_comments", "url"]
                .into_iter()
                .map(String::from)
                .collect(),
            auth_url: "https://www.reddit.com".to_string(),
            api_url: "https://oauth.reddit.com".to_string(),
            page_size: 100,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DuckDbConfig {
    pub connection_string: String,
    pub table_name: String,
}

impl Default for DuckDbConfig {
    fn default() -> Self {
        Self { connection_string: ":memory:".to_string(), table_name: "reddit_posts".to_string() }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TransformationConfig {
    pub date_column: String,
}

impl Default for TransformationConfig {
    fn default() -> Self {
        Self { date_column: "created_utc".to_string() }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

/// Scalar used to replace nulls in one column.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl DefaultValue {
    pub fn to_cell(&self) -> Cell {
        match self {
            DefaultValue::Bool(b) => Cell::Bool(*b),
            DefaultValue::Int(n) => Cell::Int(*n),
            DefaultValue::Float(x) => Cell::Float(*x),
            DefaultValue::Text(s) => Cell::Text(s.clone()),
        }
    }
}

/// Accept either `"id,title,created_utc"` or a YAML list.
fn column_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Columns {
        Csv(String),
        List(Vec<String>),
    }
    let raw = match Columns::deserialize(d)? {
        Columns::Csv(s) => s.split(',').map(String::from).collect::<Vec<_>>(),
        Columns::List(v) => v,
    };
    Ok(raw.into_iter().map(|c| c.trim().to_string()).filter(|c| !c.is_empty()).collect())
}

fn normalize_subreddit(sub: &str) -> String {
    let s = sub.trim().to_lowercase();
    match s.strip_prefix("r/") {
        Some(rest) => rest.to_string(),
        None => s,
    }
}

impl EtlConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let mut cfg: EtlConfig = serde_yaml::from_str(yaml)?;
        cfg.reddit.subreddit = normalize_subreddit(&cfg.reddit.subreddit);
        if cfg.reddit.columns.is_empty() {
            return Err(ConfigError::Missing("reddit.columns"));
        }
        if cfg.duckdb.table_name.trim().is_empty() {
            return Err(ConfigError::Missing("duckdb.table_name"));
        }
        if cfg.transformation.date_column.trim().is_empty() {
            return Err(ConfigError::Missing("transformation.date_column"));
        }
        Ok(cfg)
    }

    pub fn with_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        self.reddit.client_id = client_id.into();
        self.reddit.client_secret = client_secret.into();
        self.reddit.user_agent = user_agent.into();
        self
    }
    pub fn with_subreddit(mut self, sub: impl AsRef<str>) -> Self {
        self.reddit.subreddit = normalize_subreddit(sub.as_ref());
        self
    }
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reddit.columns = columns.into_iter().map(Into::into).collect();
        self
    }
    pub fn with_connection_string(mut self, conn: impl Into<String>) -> Self {
        self.duckdb.connection_string = conn.into();
        self
    }
    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.duckdb.table_name = name.into();
        self
    }
    pub fn with_date_column(mut self, column: impl Into<String>) -> Self {
        self.transformation.date_column = column.into();
        self
    }
    pub fn with_default_value(mut self, column: impl Into<String>, value: DefaultValue) -> Self {
        self.default_values.insert(column.into(), value);
        self
    }
    pub fn with_expected_type(mut self, column: impl Into<String>, dtype: DataType) -> Self {
        self.schema.insert(column.into(), dtype);
        self
    }
    pub fn with_query(mut self, name: impl Into<String>, sql: impl Into<String>) -> Self {
        self.queries.insert(name.into(), sql.into());
        self
    }
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.logging.level = level.into();
        self
    }
}
