//! Database driver implementations.
//!
//! - [`sqlite`]: SQLite through sqlx
//! - [`mysql`]: MySQL/MariaDB through mysql_async
//! - [`postgres`]: PostgreSQL through tokio-postgres
//!
//! Each driver provides a `Dialect` and a `Connection`. The enums below
//! dispatch to them with a plain `match` instead of trait objects.

pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use mysql::{MysqlConn, MysqlDialect};
pub use postgres::{PostgresConn, PostgresDialect};
pub use sqlite::{SqliteConn, SqliteDialect};

use async_trait::async_trait;
use tracing::info;

use crate::config::{ConnectionSpec, DatabaseKind};
use crate::core::identifier::TableName;
use crate::core::traits::{Connection, ConnectionProvider, Dialect};
use crate::core::value::{Row, RowSet, SqlValue};
use crate::error::{DriverResult, EtlError, Result};

/// Enum-based static dispatch for dialects.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    Sqlite(SqliteDialect),
    Mysql(MysqlDialect),
    Postgres(PostgresDialect),
}

impl DialectImpl {
    /// Dialect for an engine.
    pub fn for_kind(kind: DatabaseKind) -> Self {
        match kind {
            DatabaseKind::Sqlite => DialectImpl::Sqlite(SqliteDialect::new()),
            DatabaseKind::Mysql => DialectImpl::Mysql(MysqlDialect::new()),
            DatabaseKind::Postgresql => DialectImpl::Postgres(PostgresDialect::new()),
        }
    }
}

impl Dialect for DialectImpl {
    fn name(&self) -> &str {
        match self {
            DialectImpl::Sqlite(d) => d.name(),
            DialectImpl::Mysql(d) => d.name(),
            DialectImpl::Postgres(d) => d.name(),
        }
    }

    fn quote_ident(&self, name: &str) -> String {
        match self {
            DialectImpl::Sqlite(d) => d.quote_ident(name),
            DialectImpl::Mysql(d) => d.quote_ident(name),
            DialectImpl::Postgres(d) => d.quote_ident(name),
        }
    }

    fn param_placeholder(&self, index: usize) -> String {
        match self {
            DialectImpl::Sqlite(d) => d.param_placeholder(index),
            DialectImpl::Mysql(d) => d.param_placeholder(index),
            DialectImpl::Postgres(d) => d.param_placeholder(index),
        }
    }

    fn max_bind_params(&self) -> usize {
        match self {
            DialectImpl::Sqlite(d) => d.max_bind_params(),
            DialectImpl::Mysql(d) => d.max_bind_params(),
            DialectImpl::Postgres(d) => d.max_bind_params(),
        }
    }
}

/// Enum-based static dispatch for open sessions.
pub enum ConnectionImpl {
    Sqlite(SqliteConn),
    Mysql(MysqlConn),
    Postgres(PostgresConn),
}

impl ConnectionImpl {
    /// Open a session for the given connection settings.
    pub async fn open(spec: &ConnectionSpec) -> Result<Self> {
        let kind = spec.kind();
        let conn = match spec {
            ConnectionSpec::Sqlite(params) => SqliteConn::open(params).await.map(Self::Sqlite),
            ConnectionSpec::Mysql(params) => MysqlConn::open(params).await.map(Self::Mysql),
            ConnectionSpec::Postgresql(params) => {
                PostgresConn::open(params).await.map(Self::Postgres)
            }
        }
        .map_err(|e| EtlError::connection(kind, e))?;

        info!("Connected to {}", spec.describe());
        Ok(conn)
    }
}

#[async_trait]
impl Connection for ConnectionImpl {
    fn kind(&self) -> DatabaseKind {
        match self {
            ConnectionImpl::Sqlite(c) => c.kind(),
            ConnectionImpl::Mysql(c) => c.kind(),
            ConnectionImpl::Postgres(c) => c.kind(),
        }
    }

    async fn query(&mut self, sql: &str, params: &[SqlValue<'static>]) -> DriverResult<RowSet> {
        match self {
            ConnectionImpl::Sqlite(c) => c.query(sql, params).await,
            ConnectionImpl::Mysql(c) => c.query(sql, params).await,
            ConnectionImpl::Postgres(c) => c.query(sql, params).await,
        }
    }

    async fn execute(&mut self, sql: &str) -> DriverResult<u64> {
        match self {
            ConnectionImpl::Sqlite(c) => c.execute(sql).await,
            ConnectionImpl::Mysql(c) => c.execute(sql).await,
            ConnectionImpl::Postgres(c) => c.execute(sql).await,
        }
    }

    async fn table_exists(&mut self, table: &TableName) -> DriverResult<bool> {
        match self {
            ConnectionImpl::Sqlite(c) => c.table_exists(table).await,
            ConnectionImpl::Mysql(c) => c.table_exists(table).await,
            ConnectionImpl::Postgres(c) => c.table_exists(table).await,
        }
    }

    async fn insert_batch(
        &mut self,
        table: &TableName,
        columns: &[String],
        rows: &[Row],
    ) -> DriverResult<u64> {
        match self {
            ConnectionImpl::Sqlite(c) => c.insert_batch(table, columns, rows).await,
            ConnectionImpl::Mysql(c) => c.insert_batch(table, columns, rows).await,
            ConnectionImpl::Postgres(c) => c.insert_batch(table, columns, rows).await,
        }
    }

    async fn close(&mut self) -> DriverResult<()> {
        match self {
            ConnectionImpl::Sqlite(c) => c.close().await,
            ConnectionImpl::Mysql(c) => c.close().await,
            ConnectionImpl::Postgres(c) => c.close().await,
        }
    }
}

/// Default provider: opens real database sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverProvider;

#[async_trait]
impl ConnectionProvider for DriverProvider {
    type Conn = ConnectionImpl;

    async fn open(&self, spec: &ConnectionSpec) -> Result<ConnectionImpl> {
        ConnectionImpl::open(spec).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_for_kind_names() {
        assert_eq!(DialectImpl::for_kind(DatabaseKind::Sqlite).name(), "sqlite");
        assert_eq!(DialectImpl::for_kind(DatabaseKind::Mysql).name(), "mysql");
        assert_eq!(DialectImpl::for_kind(DatabaseKind::Postgresql).name(), "postgres");
    }

    #[test]
    fn test_dialect_bind_limits() {
        assert_eq!(
            DialectImpl::for_kind(DatabaseKind::Sqlite).max_bind_params(),
            32_766
        );
        assert_eq!(
            DialectImpl::for_kind(DatabaseKind::Mysql).max_bind_params(),
            65_535
        );
        assert_eq!(
            DialectImpl::for_kind(DatabaseKind::Postgresql).param_placeholder(3),
            "$3"
        );
    }

    #[tokio::test]
    async fn test_provider_opens_sqlite() {
        let mut conn = DriverProvider
            .open(&ConnectionSpec::sqlite(":memory:"))
            .await
            .unwrap();
        assert_eq!(conn.kind(), DatabaseKind::Sqlite);
        let rows = conn.query("SELECT 1 AS one", &[]).await.unwrap();
        assert_eq!(rows.columns, ["one"]);
        conn.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_unreachable_server_is_connection_error() {
        let spec = ConnectionSpec::Postgresql(crate::config::ServerParams {
            host: Some("127.0.0.1".to_string()),
            port: Some(1),
            user: None,
            password: String::new(),
            database: "none".to_string(),
        });
        let err = ConnectionImpl::open(&spec).await.err().unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::Connection);
    }
}
