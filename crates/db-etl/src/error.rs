//! Error types for the transfer pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DatabaseKind;

/// Closed failure taxonomy reported to callers in a [`LoadReport`](crate::LoadReport).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad or missing configuration, invalid column-mapping references.
    Configuration,
    /// A database could not be reached or the session could not be opened.
    Connection,
    /// The extraction query was rejected or failed while running.
    Query,
    /// Table introspection, creation or truncation failed.
    Schema,
    /// A batch insert failed. Earlier batches stay committed.
    Load,
}

impl ErrorKind {
    /// Process exit code for this kind of failure.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Configuration => 1,
            ErrorKind::Connection => 2,
            ErrorKind::Query => 3,
            ErrorKind::Schema => 4,
            ErrorKind::Load => 5,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Connection => "ConnectionError",
            ErrorKind::Query => "QueryError",
            ErrorKind::Schema => "SchemaError",
            ErrorKind::Load => "LoadError",
        };
        f.write_str(name)
    }
}

/// Failure raised by a database driver.
///
/// Drivers know nothing about pipeline stages; the stage that issued the call
/// wraps this into the matching [`EtlError`] variant.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("PostgreSQL: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("MySQL: {0}")]
    Mysql(#[from] mysql_async::Error),

    #[error("SQLite: {0}")]
    Sqlite(#[from] sqlx::Error),

    /// A result value could not be converted into a [`SqlValue`](crate::SqlValue).
    #[error("cannot decode column '{column}': {message}")]
    Decode { column: String, message: String },

    /// A statement was rejected by the engine for a reason not covered above.
    #[error("{0}")]
    Rejected(String),

    /// The connection was used after `close`.
    #[error("connection is closed")]
    Closed,
}

impl DriverError {
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        DriverError::Decode {
            column: column.into(),
            message: message.into(),
        }
    }
}

/// Main error type for pipeline operations.
#[derive(Error, Debug)]
pub enum EtlError {
    /// Configuration error (invalid YAML/JSON, missing fields, bad mapping, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Opening a session against a database failed.
    #[error("Connection to {engine} failed: {source}")]
    Connection {
        engine: DatabaseKind,
        #[source]
        source: DriverError,
    },

    /// The extraction query failed.
    #[error("Extraction query failed: {source}")]
    Query {
        #[source]
        source: DriverError,
    },

    /// DDL or introspection against the target table failed.
    #[error("Provisioning of table {table} failed: {source}")]
    Schema {
        table: String,
        #[source]
        source: DriverError,
    },

    /// A batch insert failed.
    #[error(
        "Load into {table} failed at batch {batch}/{batches_expected} \
         ({batches_committed} batches, {rows_committed} rows already committed): {source}"
    )]
    Load {
        table: String,
        batch: usize,
        batches_expected: usize,
        batches_committed: usize,
        rows_committed: u64,
        #[source]
        source: DriverError,
    },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EtlError {
    pub fn config(message: impl Into<String>) -> Self {
        EtlError::Config(message.into())
    }

    pub fn connection(engine: DatabaseKind, source: DriverError) -> Self {
        EtlError::Connection { engine, source }
    }

    pub fn query(source: DriverError) -> Self {
        EtlError::Query { source }
    }

    pub fn schema(table: impl Into<String>, source: DriverError) -> Self {
        EtlError::Schema {
            table: table.into(),
            source,
        }
    }

    /// Taxonomy entry for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EtlError::Config(_) | EtlError::Io(_) | EtlError::Yaml(_) | EtlError::Json(_) => {
                ErrorKind::Configuration
            }
            EtlError::Connection { .. } => ErrorKind::Connection,
            EtlError::Query { .. } => ErrorKind::Query,
            EtlError::Schema { .. } => ErrorKind::Schema,
            EtlError::Load { .. } => ErrorKind::Load,
        }
    }

    /// Exit code for the CLI. A missing or unreadable config file gets its own code.
    pub fn exit_code(&self) -> u8 {
        match self {
            EtlError::Io(_) => 7,
            other => other.kind().exit_code(),
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, EtlError>;

/// Result type alias for driver calls.
pub type DriverResult<T> = std::result::Result<T, DriverError>;
