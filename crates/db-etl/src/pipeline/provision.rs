//! Provisioning: makes sure the target table exists and is emptied when asked.

use serde::Serialize;
use tracing::debug;

use crate::config::LoadingConfig;
use crate::core::identifier::TableName;
use crate::core::traits::{Connection, Dialect};
use crate::drivers::DialectImpl;
use crate::error::{EtlError, Result};
use crate::orchestrator::events::{EventSink, PipelineEvent};

/// What provisioning did to the target table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionOutcome {
    pub created: bool,
    pub truncated: bool,
}

/// Create the table if requested and absent, then empty it if requested.
///
/// Creation always runs before truncation so a fresh table is never the
/// target of a delete it cannot satisfy. Any failure is a schema error and
/// happens before a single row is written.
pub async fn provision<C>(
    conn: &mut C,
    table: &TableName,
    loading: &LoadingConfig,
    sink: &dyn EventSink,
) -> Result<ProvisionOutcome>
where
    C: Connection + ?Sized,
{
    let dialect = DialectImpl::for_kind(conn.kind());
    let schema_error = |e| EtlError::schema(table.to_string(), e);
    let mut outcome = ProvisionOutcome::default();

    if loading.create_table {
        if conn.table_exists(table).await.map_err(schema_error)? {
            debug!("Table {} exists, no DDL issued", table);
            sink.emit(&PipelineEvent::TableAlreadyExists {
                table: table.to_string(),
            });
        } else {
            let ddl = dialect.build_create_table(table, &loading.column_definitions);
            debug!("Creating table ({}): {}", dialect.name(), ddl);
            conn.execute(&ddl).await.map_err(schema_error)?;
            outcome.created = true;
            sink.emit(&PipelineEvent::TableCreated {
                table: table.to_string(),
            });
        }
    }

    if loading.truncate_before_load {
        let sql = dialect.build_truncate(table);
        debug!("Emptying table ({}): {}", dialect.name(), sql);
        let rows_deleted = conn.execute(&sql).await.map_err(schema_error)?;
        outcome.truncated = true;
        sink.emit(&PipelineEvent::TableTruncated {
            table: table.to_string(),
            rows_deleted,
        });
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::SqlValue;
    use crate::orchestrator::events::MemorySink;
    use crate::pipeline::fake::FakeConnection;
    use crate::ErrorKind;

    fn loading(create: bool, truncate: bool) -> LoadingConfig {
        let mut loading = LoadingConfig::new("clientes");
        loading.create_table = create;
        loading.truncate_before_load = truncate;
        loading
            .column_definitions
            .insert("id".to_string(), "INTEGER PRIMARY KEY".to_string());
        loading
            .column_definitions
            .insert("nome".to_string(), "TEXT".to_string());
        loading
    }

    #[tokio::test]
    async fn test_creates_missing_table_with_ordered_definitions() {
        let mut conn = FakeConnection::new();
        let sink = MemorySink::new();
        let table = TableName::new("clientes");

        let outcome = provision(&mut conn, &table, &loading(true, false), &sink)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ProvisionOutcome {
                created: true,
                truncated: false
            }
        );
        assert_eq!(
            conn.state().executed,
            ["CREATE TABLE \"clientes\" (\"id\" INTEGER PRIMARY KEY, \"nome\" TEXT)"]
        );
    }

    #[tokio::test]
    async fn test_existing_table_gets_no_ddl() {
        let mut conn = FakeConnection::new().with_table("clientes");
        let sink = MemorySink::new();
        let table = TableName::new("clientes");

        let outcome = provision(&mut conn, &table, &loading(true, false), &sink)
            .await
            .unwrap();

        assert!(!outcome.created);
        assert!(conn.state().executed.is_empty());
        assert_eq!(
            sink.events(),
            [PipelineEvent::TableAlreadyExists {
                table: "clientes".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_provision_twice_is_idempotent() {
        let mut conn = FakeConnection::new();
        let sink = MemorySink::new();
        let table = TableName::new("clientes");
        let config = loading(true, false);

        let first = provision(&mut conn, &table, &config, &sink).await.unwrap();
        let second = provision(&mut conn, &table, &config, &sink).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(conn.state().tables.len(), 1);
    }

    #[tokio::test]
    async fn test_create_runs_before_truncate() {
        let mut conn = FakeConnection::new();
        let sink = MemorySink::new();
        let table = TableName::new("clientes");

        let outcome = provision(&mut conn, &table, &loading(true, true), &sink)
            .await
            .unwrap();

        assert!(outcome.created && outcome.truncated);
        let executed = conn.state().executed;
        assert_eq!(executed.len(), 2);
        assert!(executed[0].starts_with("CREATE TABLE"));
        assert_eq!(executed[1], "DELETE FROM \"clientes\"");
    }

    #[tokio::test]
    async fn test_truncate_empties_existing_rows() {
        let mut conn = FakeConnection::new().with_table("clientes");
        conn.handle()
            .lock()
            .unwrap()
            .tables
            .insert("clientes".to_string(), vec![vec![SqlValue::I64(1)]]);
        let sink = MemorySink::new();

        let outcome = provision(
            &mut conn,
            &TableName::new("clientes"),
            &loading(false, true),
            &sink,
        )
        .await
        .unwrap();

        assert!(outcome.truncated);
        assert!(conn.state().tables["clientes"].is_empty());
        assert_eq!(
            sink.events(),
            [PipelineEvent::TableTruncated {
                table: "clientes".to_string(),
                rows_deleted: 1
            }]
        );
    }

    #[tokio::test]
    async fn test_ddl_failure_is_schema_error() {
        // Truncating a table that was never created fails in the engine
        let mut conn = FakeConnection::new();
        let sink = MemorySink::new();

        let err = provision(
            &mut conn,
            &TableName::new("clientes"),
            &loading(false, true),
            &sink,
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Schema);
    }
}
