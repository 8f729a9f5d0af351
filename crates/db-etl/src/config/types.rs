//! Configuration type definitions.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Default number of rows per insert+commit unit.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Sqlite,
    Mysql,
    #[serde(alias = "postgres")]
    Postgresql,
}

impl DatabaseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DatabaseKind::Sqlite => "sqlite",
            DatabaseKind::Mysql => "mysql",
            DatabaseKind::Postgresql => "postgresql",
        }
    }
}

impl std::fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database the extraction query runs against.
    pub source_db: ConnectionSpec,

    /// Database holding the target table.
    pub target_db: ConnectionSpec,

    /// What to read.
    pub extraction: ExtractionConfig,

    /// Where and how to write.
    pub loading: LoadingConfig,
}

/// Engine tag plus connection parameters.
///
/// Deserialized from `{ type: "...", connection_params: {...} }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "connection_params", rename_all = "lowercase")]
pub enum ConnectionSpec {
    Sqlite(SqliteParams),
    #[serde(alias = "mariadb")]
    Mysql(ServerParams),
    #[serde(alias = "postgres", alias = "pg")]
    Postgresql(ServerParams),
}

impl ConnectionSpec {
    /// Shorthand for a SQLite database file.
    pub fn sqlite(database: impl Into<String>) -> Self {
        ConnectionSpec::Sqlite(SqliteParams {
            database: database.into(),
        })
    }

    pub fn kind(&self) -> DatabaseKind {
        match self {
            ConnectionSpec::Sqlite(_) => DatabaseKind::Sqlite,
            ConnectionSpec::Mysql(_) => DatabaseKind::Mysql,
            ConnectionSpec::Postgresql(_) => DatabaseKind::Postgresql,
        }
    }

    /// Human-readable location for logs. Never includes credentials.
    pub fn describe(&self) -> String {
        match self {
            ConnectionSpec::Sqlite(p) => format!("sqlite:{}", p.database),
            ConnectionSpec::Mysql(p) | ConnectionSpec::Postgresql(p) => format!(
                "{}://{}:{}/{}",
                self.kind(),
                p.host.as_deref().unwrap_or("localhost"),
                p.port
                    .map(|port| port.to_string())
                    .unwrap_or_else(|| "default".to_string()),
                p.database
            ),
        }
    }
}

/// SQLite connection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteParams {
    /// Database file path, or `:memory:`.
    #[serde(default = "default_sqlite_database")]
    pub database: String,
}

/// Parameters for network databases (MySQL, PostgreSQL).
///
/// Unset fields fall back to the engine's defaults when the connection is opened.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(
        default,
        deserialize_with = "deserialize_port",
        skip_serializing_if = "Option::is_none"
    )]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing)]
    pub password: String,

    #[serde(default)]
    pub database: String,
}

impl std::fmt::Debug for ServerParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .finish()
    }
}

/// Extraction step configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Read query run against the source database.
    pub query: String,

    /// Positional parameters bound to the query's placeholders.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<serde_json::Value>,
}

impl ExtractionConfig {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            params: Vec::new(),
        }
    }
}

/// Load step configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadingConfig {
    /// Target table, optionally qualified as `schema.table`.
    pub target_table: String,

    /// Create the table from `column_definitions` when it does not exist.
    #[serde(default)]
    pub create_table: bool,

    /// Column name to type declaration, used verbatim in `CREATE TABLE`.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub column_definitions: IndexMap<String, String>,

    /// Delete every row of the target table before loading.
    #[serde(default)]
    pub truncate_before_load: bool,

    /// Source column to target column renames.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub column_mapping: IndexMap<String, String>,

    /// Positional target names, one per extracted column.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_columns: Vec<String>,

    /// Rows per insert+commit unit.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl LoadingConfig {
    pub fn new(target_table: impl Into<String>) -> Self {
        Self {
            target_table: target_table.into(),
            create_table: false,
            column_definitions: IndexMap::new(),
            truncate_before_load: false,
            column_mapping: IndexMap::new(),
            target_columns: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

fn default_sqlite_database() -> String {
    ":memory:".to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Accept `port: 5432` as well as `port: "5432"`.
fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Option::<Port>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Port::Number(port)) => Ok(Some(port)),
        Some(Port::Text(text)) => text
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid port '{}'", text))),
    }
}
