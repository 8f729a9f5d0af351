//! PostgreSQL connection using tokio-postgres.

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, warn};

use crate::config::{DatabaseKind, ServerParams};
use crate::core::identifier::TableName;
use crate::core::traits::{Connection, Dialect};
use crate::core::value::{Row, RowSet, SqlValue};
use crate::error::{DriverError, DriverResult};

use super::encode::decode_column;
use super::PostgresDialect;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5432;
const DEFAULT_USER: &str = "postgres";

/// A single PostgreSQL session.
///
/// The protocol driver runs on a spawned task that ends once the client
/// is dropped.
pub struct PostgresConn {
    client: Option<Client>,
    connection: Option<JoinHandle<()>>,
    dialect: PostgresDialect,
}

impl PostgresConn {
    /// Connect, falling back to `postgres@localhost:5432` for unset fields.
    pub async fn open(params: &ServerParams) -> DriverResult<Self> {
        let host = params.host.as_deref().unwrap_or(DEFAULT_HOST);
        let port = params.port.unwrap_or(DEFAULT_PORT);

        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(host)
            .port(port)
            .user(params.user.as_deref().unwrap_or(DEFAULT_USER))
            .password(&params.password)
            .application_name("db-etl");
        if !params.database.is_empty() {
            pg_config.dbname(&params.database);
        }

        let (client, connection) = pg_config.connect(NoTls).await?;
        let handle = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("PostgreSQL connection error: {}", e);
            }
        });

        debug!(
            "Connected to PostgreSQL: {}:{}/{}",
            host, port, params.database
        );

        Ok(Self {
            client: Some(client),
            connection: Some(handle),
            dialect: PostgresDialect::new(),
        })
    }

    fn client(&mut self) -> DriverResult<&mut Client> {
        self.client.as_mut().ok_or(DriverError::Closed)
    }
}

fn as_params<'a>(values: impl Iterator<Item = &'a SqlValue<'static>>) -> Vec<&'a (dyn ToSql + Sync)> {
    values.map(|v| v as &(dyn ToSql + Sync)).collect()
}

#[async_trait]
impl Connection for PostgresConn {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Postgresql
    }

    async fn query(&mut self, sql: &str, params: &[SqlValue<'static>]) -> DriverResult<RowSet> {
        let client = self.client()?;

        let statement = client.prepare(sql).await?;
        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let bound = as_params(params.iter());
        let raw_rows = client.query(&statement, &bound).await?;

        let rows = raw_rows
            .iter()
            .map(|row| {
                (0..columns.len())
                    .map(|idx| decode_column(row, idx))
                    .collect::<DriverResult<Row>>()
            })
            .collect::<DriverResult<Vec<Row>>>()?;

        Ok(RowSet::new(columns, rows))
    }

    async fn execute(&mut self, sql: &str) -> DriverResult<u64> {
        let client = self.client()?;
        Ok(client.execute(sql, &[]).await?)
    }

    async fn table_exists(&mut self, table: &TableName) -> DriverResult<bool> {
        let sql = "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
                   WHERE table_schema = COALESCE($1::text, current_schema()) \
                   AND table_name = $2::text)";
        let schema = table.schema.as_deref();
        let name = table.name.as_str();

        let client = self.client()?;
        let row = client.query_one(sql, &[&schema, &name]).await?;
        Ok(row.try_get::<_, bool>(0)?)
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

        let client = self.client()?;
        let tx = client.transaction().await?;
        let mut inserted = 0u64;
        for (sql, chunk) in &statements {
            let bound = as_params(chunk.iter().flat_map(|row| row.iter()));
            inserted += tx.execute(sql.as_str(), &bound).await?;
        }
        tx.commit().await?;

        Ok(inserted)
    }

    async fn close(&mut self) -> DriverResult<()> {
        // Dropping the client ends the connection task
        if self.client.take().is_some() {
            debug!("Closing PostgreSQL connection");
        }
        if let Some(handle) = self.connection.take() {
            if let Err(e) = handle.await {
                warn!("PostgreSQL connection task failed: {}", e);
            }
        }
        Ok(())
    }
}
