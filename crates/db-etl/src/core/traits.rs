//! Core traits for engine-agnostic extract and load.
//!
//! - [`Connection`]: one open session against a database
//! - [`ConnectionProvider`]: opens sessions from a [`ConnectionSpec`]
//! - [`Dialect`]: SQL syntax strategy for an engine

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::config::{ConnectionSpec, DatabaseKind};
use crate::error::{DriverResult, Result};

use super::identifier::TableName;
use super::value::{Row, RowSet, SqlValue};

/// An open session against one database.
///
/// Sessions are used by a single task at a time and are never shared
/// between the source and target side of a run.
#[async_trait]
pub trait Connection: Send {
    /// Engine behind this session.
    fn kind(&self) -> DatabaseKind;

    /// Run a statement that returns rows.
    ///
    /// Column names are reported even when no rows come back.
    async fn query(&mut self, sql: &str, params: &[SqlValue<'static>]) -> DriverResult<RowSet>;

    /// Run a statement without parameters and return the affected row count.
    async fn execute(&mut self, sql: &str) -> DriverResult<u64>;

    /// Check whether a table exists.
    ///
    /// Unqualified names resolve against the session's default schema.
    async fn table_exists(&mut self, table: &TableName) -> DriverResult<bool>;

    /// Insert rows and commit them as one unit.
    ///
    /// The rows may be spread over several statements to stay below the
    /// engine's bind limit, but they share one transaction: either every
    /// row is committed or none is.
    async fn insert_batch(
        &mut self,
        table: &TableName,
        columns: &[String],
        rows: &[Row],
    ) -> DriverResult<u64>;

    /// Release the session. Calling it again is a no-op.
    async fn close(&mut self) -> DriverResult<()>;
}

/// Opens connections from configuration.
///
/// The pipeline asks its provider for both sessions, so tests can swap
/// in scripted connections.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    type Conn: Connection;

    /// Open a session. Failures are reported as connection errors.
    async fn open(&self, spec: &ConnectionSpec) -> Result<Self::Conn>;
}

/// SQL syntax strategy for different database engines.
///
/// Identifiers passed to the builders must already be validated;
/// [`quote_ident`](Dialect::quote_ident) only escapes.
pub trait Dialect: Send + Sync {
    /// Dialect identifier (e.g. "sqlite", "mysql", "postgres").
    fn name(&self) -> &str;

    /// Quote an identifier (table name, column name, etc.).
    ///
    /// - MySQL: `` `identifier` ``
    /// - PostgreSQL, SQLite: `"identifier"`
    fn quote_ident(&self, name: &str) -> String;

    /// Parameter placeholder for the given 1-based index.
    ///
    /// - MySQL, SQLite: `?`
    /// - PostgreSQL: `$1`, `$2`, etc.
    fn param_placeholder(&self, index: usize) -> String;

    /// Maximum number of bound parameters in one statement.
    fn max_bind_params(&self) -> usize;

    /// Quoted, optionally schema-qualified table name.
    fn qualify_table(&self, table: &TableName) -> String {
        match &table.schema {
            Some(schema) => format!(
                "{}.{}",
                self.quote_ident(schema),
                self.quote_ident(&table.name)
            ),
            None => self.quote_ident(&table.name),
        }
    }

    /// `CREATE TABLE` with the declarations used verbatim, in order.
    fn build_create_table(&self, table: &TableName, definitions: &IndexMap<String, String>) -> String {
        let columns: Vec<String> = definitions
            .iter()
            .map(|(name, declaration)| format!("{} {}", self.quote_ident(name), declaration.trim()))
            .collect();
        format!(
            "CREATE TABLE {} ({})",
            self.qualify_table(table),
            columns.join(", ")
        )
    }

    /// Remove every row while keeping the table and its definition.
    fn build_truncate(&self, table: &TableName) -> String {
        format!("DELETE FROM {}", self.qualify_table(table))
    }

    /// Multi-row `INSERT ... VALUES` for `row_count` rows.
    fn build_insert(&self, table: &TableName, columns: &[String], row_count: usize) -> String {
        let col_list = columns
            .iter()
            .map(|c| self.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ",
            self.qualify_table(table),
            col_list
        );

        let mut index = 1;
        for row in 0..row_count {
            if row > 0 {
                sql.push_str(", ");
            }
            sql.push('(');
            for col in 0..columns.len() {
                if col > 0 {
                    sql.push_str(", ");
                }
                sql.push_str(&self.param_placeholder(index));
                index += 1;
            }
            sql.push(')');
        }
        sql
    }

    /// Rows that fit in one insert statement without passing the bind limit.
    fn rows_per_statement(&self, column_count: usize) -> usize {
        (self.max_bind_params() / column_count.max(1)).max(1)
    }
}
