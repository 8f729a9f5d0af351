//! Scripted in-memory connection for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::config::{ConnectionSpec, DatabaseKind};
use crate::core::identifier::TableName;
use crate::core::traits::{Connection, ConnectionProvider};
use crate::core::value::{Row, RowSet, SqlValue};
use crate::error::{DriverError, DriverResult, EtlError, Result};

/// Everything a fake connection saw.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeState {
    pub queries: Vec<String>,
    pub query_params: Vec<Vec<SqlValue<'static>>>,
    pub executed: Vec<String>,
    pub tables: IndexMap<String, Vec<Row>>,
    pub insert_calls: usize,
    pub close_calls: usize,
}

/// Behaves like a SQLite session: `"`-quoted identifiers, tables keyed by
/// their unquoted name.
pub(crate) struct FakeConnection {
    shared: Arc<Mutex<FakeState>>,
    result: Option<RowSet>,
    fail_insert_at: Option<usize>,
    closed: bool,
}

impl FakeConnection {
    pub fn new() -> Self {
        Self::with_result(RowSet::default())
    }

    pub fn with_result(rows: RowSet) -> Self {
        Self {
            shared: Arc::new(Mutex::new(FakeState::default())),
            result: Some(rows),
            fail_insert_at: None,
            closed: false,
        }
    }

    pub fn failing_query() -> Self {
        let mut conn = Self::new();
        conn.result = None;
        conn
    }

    pub fn with_table(self, name: &str) -> Self {
        self.shared
            .lock()
            .unwrap()
            .tables
            .insert(name.to_string(), Vec::new());
        self
    }

    /// Make the n-th `insert_batch` call (1-based) fail.
    pub fn fail_insert_at(mut self, call: usize) -> Self {
        self.fail_insert_at = Some(call);
        self
    }

    pub fn state(&self) -> FakeState {
        self.shared.lock().unwrap().clone()
    }

    pub fn handle(&self) -> Arc<Mutex<FakeState>> {
        Arc::clone(&self.shared)
    }

    fn check_open(&self) -> DriverResult<()> {
        if self.closed {
            Err(DriverError::Closed)
        } else {
            Ok(())
        }
    }
}

fn quoted_name(sql: &str) -> String {
    sql.split('"').nth(1).unwrap_or_default().to_string()
}

#[async_trait]
impl Connection for FakeConnection {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Sqlite
    }

    async fn query(&mut self, sql: &str, params: &[SqlValue<'static>]) -> DriverResult<RowSet> {
        self.check_open()?;
        let mut state = self.shared.lock().unwrap();
        state.queries.push(sql.to_string());
        state.query_params.push(params.to_vec());
        self.result
            .clone()
            .ok_or_else(|| DriverError::Rejected("near \"SELEC\": syntax error".to_string()))
    }

    async fn execute(&mut self, sql: &str) -> DriverResult<u64> {
        self.check_open()?;
        let mut state = self.shared.lock().unwrap();
        state.executed.push(sql.to_string());

        let name = quoted_name(sql);
        if sql.starts_with("CREATE TABLE") {
            if state.tables.contains_key(&name) {
                return Err(DriverError::Rejected(format!("table {} already exists", name)));
            }
            state.tables.insert(name, Vec::new());
            Ok(0)
        } else if sql.starts_with("DELETE FROM") {
            match state.tables.get_mut(&name) {
                Some(rows) => {
                    let deleted = rows.len() as u64;
                    rows.clear();
                    Ok(deleted)
                }
                None => Err(DriverError::Rejected(format!("no such table: {}", name))),
            }
        } else {
            Ok(0)
        }
    }

    async fn table_exists(&mut self, table: &TableName) -> DriverResult<bool> {
        self.check_open()?;
        Ok(self
            .shared
            .lock()
            .unwrap()
            .tables
            .contains_key(&table.to_string()))
    }

    async fn insert_batch(
        &mut self,
        table: &TableName,
        _columns: &[String],
        rows: &[Row],
    ) -> DriverResult<u64> {
        self.check_open()?;
        let mut state = self.shared.lock().unwrap();
        state.insert_calls += 1;
        if Some(state.insert_calls) == self.fail_insert_at {
            return Err(DriverError::Rejected("CHECK constraint failed".to_string()));
        }
        match state.tables.get_mut(&table.to_string()) {
            Some(stored) => {
                stored.extend(rows.iter().cloned());
                Ok(rows.len() as u64)
            }
            None => Err(DriverError::Rejected(format!("no such table: {}", table))),
        }
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        self.shared.lock().unwrap().close_calls += 1;
        Ok(())
    }
}

/// Hands out scripted connections in the order they were queued.
/// An `Err` entry simulates an unreachable database.
pub(crate) struct FakeProvider {
    queue: Mutex<VecDeque<Result<FakeConnection>>>,
}

impl FakeProvider {
    pub fn new(source: FakeConnection, target: FakeConnection) -> Self {
        Self {
            queue: Mutex::new(VecDeque::from([Ok(source), Ok(target)])),
        }
    }

    pub fn target_unreachable(source: FakeConnection) -> Self {
        Self {
            queue: Mutex::new(VecDeque::from([
                Ok(source),
                Err(EtlError::connection(
                    DatabaseKind::Sqlite,
                    DriverError::Rejected("unable to open database file".to_string()),
                )),
            ])),
        }
    }
}

#[async_trait]
impl ConnectionProvider for FakeProvider {
    type Conn = FakeConnection;

    async fn open(&self, spec: &ConnectionSpec) -> Result<FakeConnection> {
        self.queue.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(EtlError::connection(
                spec.kind(),
                DriverError::Rejected("no scripted connection left".to_string()),
            ))
        })
    }
}
