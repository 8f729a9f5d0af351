//! SQLite connection using sqlx.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::Connection as _;
use sqlx::{Column as _, Executor, Row as _, Statement as _, TypeInfo, ValueRef};
use tracing::debug;

use crate::config::{DatabaseKind, SqliteParams};
use crate::core::identifier::TableName;
use crate::core::traits::{Connection, Dialect};
use crate::core::value::{Row, RowSet, SqlValue};
use crate::error::{DriverError, DriverResult};

use super::SqliteDialect;

/// A single SQLite session.
///
/// The database file is created if it does not exist yet.
pub struct SqliteConn {
    conn: Option<SqliteConnection>,
    dialect: SqliteDialect,
    database: String,
}

impl SqliteConn {
    /// Open a session on the configured database file, or `:memory:`.
    pub async fn open(params: &SqliteParams) -> DriverResult<Self> {
        let options = if params.database == ":memory:" {
            SqliteConnectOptions::from_str("sqlite::memory:")?
        } else {
            SqliteConnectOptions::new()
                .filename(&params.database)
                .create_if_missing(true)
        };

        let conn = SqliteConnection::connect_with(&options).await?;
        debug!("Connected to SQLite database {}", params.database);

        Ok(Self {
            conn: Some(conn),
            dialect: SqliteDialect::new(),
            database: params.database.clone(),
        })
    }

    fn conn(&mut self) -> DriverResult<&mut SqliteConnection> {
        self.conn.as_mut().ok_or(DriverError::Closed)
    }
}

#[async_trait]
impl Connection for SqliteConn {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Sqlite
    }

    async fn query(&mut self, sql: &str, params: &[SqlValue<'static>]) -> DriverResult<RowSet> {
        let conn = self.conn()?;

        // Preparing gives column names even for an empty result
        let statement = (&mut *conn).prepare(sql).await?;
        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let query = params
            .iter()
            .fold(sqlx::query(sql), |query, value| bind_value(query, value));
        let raw_rows = query.fetch_all(&mut *conn).await?;

        let rows = raw_rows
            .iter()
            .map(|row| row_to_values(row, &columns))
            .collect::<DriverResult<Vec<Row>>>()?;

        Ok(RowSet::new(columns, rows))
    }

    async fn execute(&mut self, sql: &str) -> DriverResult<u64> {
        let conn = self.conn()?;
        let result = sqlx::query(sql).execute(&mut *conn).await?;
        Ok(result.rows_affected())
    }

    async fn table_exists(&mut self, table: &TableName) -> DriverResult<bool> {
        let master = match &table.schema {
            Some(schema) => format!("{}.sqlite_master", self.dialect.quote_ident(schema)),
            None => "sqlite_master".to_string(),
        };
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE type = 'table' AND name = ?",
            master
        );

        let conn = self.conn()?;
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(table.name.clone())
            .fetch_one(&mut *conn)
            .await?;
        Ok(count > 0)
    }

    async fn insert_batch(
        &mut self,
        table: &TableName,
        columns: &[String],
        rows: &[Row],
    ) -> DriverResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let per_statement = self.dialect.rows_per_statement(columns.len());
        let statements: Vec<(String, &[Row])> = rows
            .chunks(per_statement)
            .map(|chunk| {
                (
                    self.dialect.build_insert(table, columns, chunk.len()),
                    chunk,
                )
            })
            .collect();

        let conn = self.conn()?;
        let mut tx = conn.begin().await?;
        let mut inserted = 0u64;
        for (sql, chunk) in &statements {
            let query = chunk
                .iter()
                .flat_map(|row| row.iter())
                .fold(sqlx::query(sql), |query, value| bind_value(query, value));
            inserted += query.execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;

        Ok(inserted)
    }

    async fn close(&mut self) -> DriverResult<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
            debug!("Closed SQLite database {}", self.database);
        }
        Ok(())
    }
}

/// Bind a value using SQLite's storage classes.
fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &SqlValue<'_>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::I16(i) => query.bind(i64::from(*i)),
        SqlValue::I32(i) => query.bind(i64::from(*i)),
        SqlValue::I64(i) => query.bind(*i),
        SqlValue::F32(f) => query.bind(f64::from(*f)),
        SqlValue::F64(f) => query.bind(*f),
        SqlValue::Text(s) => query.bind(s.to_string()),
        SqlValue::Bytes(b) => query.bind(b.to_vec()),
        SqlValue::Uuid(u) => query.bind(u.to_string()),
        SqlValue::Decimal(d) => query.bind(d.to_string()),
        SqlValue::DateTime(dt) => query.bind(*dt),
        SqlValue::DateTimeOffset(dt) => query.bind(*dt),
        SqlValue::Date(d) => query.bind(*d),
        SqlValue::Time(t) => query.bind(*t),
    }
}

/// Decode a row by each value's runtime storage class.
fn row_to_values(row: &SqliteRow, columns: &[String]) -> DriverResult<Row> {
    columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let raw = row.try_get_raw(i)?;
            if raw.is_null() {
                return Ok(SqlValue::Null);
            }
            let storage = raw.type_info().name().to_uppercase();

            let value = match storage.as_str() {
                "INTEGER" => SqlValue::I64(row.try_get::<i64, _>(i)?),
                "REAL" => SqlValue::F64(row.try_get::<f64, _>(i)?),
                "BLOB" => SqlValue::bytes_owned(row.try_get::<Vec<u8>, _>(i)?),
                "TEXT" => SqlValue::text_owned(row.try_get::<String, _>(i)?),
                other => {
                    return Err(DriverError::decode(
                        name.as_str(),
                        format!("unsupported SQLite storage class {}", other),
                    ))
                }
            };
            Ok(value)
        })
        .collect()
}
