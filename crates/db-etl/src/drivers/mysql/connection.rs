//! MySQL/MariaDB connection using mysql_async.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use mysql_async::consts::ColumnType;
use mysql_async::prelude::*;
use mysql_async::{Column, Conn, OptsBuilder, TxOpts, Value};
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::{DatabaseKind, ServerParams};
use crate::core::identifier::TableName;
use crate::core::traits::{Connection, Dialect};
use crate::core::value::{Row, RowSet, SqlValue};
use crate::error::{DriverError, DriverResult};

use super::MysqlDialect;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 3306;
const DEFAULT_USER: &str = "root";

/// Character set number MySQL reports for binary columns.
const BINARY_CHARSET: u16 = 63;

/// A single MySQL session.
pub struct MysqlConn {
    conn: Option<Conn>,
    dialect: MysqlDialect,
}

impl MysqlConn {
    /// Connect, falling back to `root@localhost:3306` for unset fields.
    pub async fn open(params: &ServerParams) -> DriverResult<Self> {
        let host = params.host.as_deref().unwrap_or(DEFAULT_HOST);
        let port = params.port.unwrap_or(DEFAULT_PORT);
        let database = Some(params.database.as_str()).filter(|db| !db.is_empty());

        let builder = OptsBuilder::default()
            .ip_or_hostname(host)
            .tcp_port(port)
            .user(Some(params.user.as_deref().unwrap_or(DEFAULT_USER)))
            .pass(Some(params.password.as_str()))
            .db_name(database)
            // Use utf8mb4 for full Unicode support
            .init(vec!["SET NAMES utf8mb4"]);

        let conn = Conn::new(builder).await?;
        debug!(
            "Connected to MySQL: {}:{}/{}",
            host,
            port,
            database.unwrap_or("")
        );

        Ok(Self {
            conn: Some(conn),
            dialect: MysqlDialect::new(),
        })
    }

    fn conn(&mut self) -> DriverResult<&mut Conn> {
        self.conn.as_mut().ok_or(DriverError::Closed)
    }
}

#[async_trait]
impl Connection for MysqlConn {
    fn kind(&self) -> DatabaseKind {
        DatabaseKind::Mysql
    }

    async fn query(&mut self, sql: &str, params: &[SqlValue<'static>]) -> DriverResult<RowSet> {
        let bound: Vec<Value> = params.iter().map(sql_value_to_mysql).collect();
        let conn = self.conn()?;

        let result = conn.exec_iter(sql, bound).await?;
        let columns: Vec<Column> = result
            .columns()
            .map(|cols| cols.to_vec())
            .unwrap_or_default();
        let raw_rows: Vec<mysql_async::Row> = result.collect_and_drop().await?;

        let rows = raw_rows
            .into_iter()
            .map(|row| row_to_values(row, &columns))
            .collect::<DriverResult<Vec<Row>>>()?;
        let names = columns
            .iter()
            .map(|c| c.name_str().into_owned())
            .collect();

        Ok(RowSet::new(names, rows))
    }

    async fn execute(&mut self, sql: &str) -> DriverResult<u64> {
        let conn = self.conn()?;
        conn.query_drop(sql).await?;
        Ok(conn.affected_rows())
    }

    async fn table_exists(&mut self, table: &TableName) -> DriverResult<bool> {
        let sql = "SELECT COUNT(*) FROM information_schema.TABLES \
                   WHERE TABLE_SCHEMA = COALESCE(?, DATABASE()) AND TABLE_NAME = ?";
        let conn = self.conn()?;
        let count: Option<i64> = conn
            .exec_first(sql, (table.schema.clone(), table.name.clone()))
            .await?;
        Ok(count.unwrap_or(0) > 0)
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
        let statements: Vec<(String, Vec<Value>)> = rows
            .chunks(per_statement)
            .map(|chunk| {
                let sql = self.dialect.build_insert(table, columns, chunk.len());
                let params = chunk
                    .iter()
                    .flat_map(|row| row.iter().map(sql_value_to_mysql))
                    .collect();
                (sql, params)
            })
            .collect();

        let conn = self.conn()?;
        let mut tx = conn.start_transaction(TxOpts::default()).await?;
        let mut inserted = 0u64;
        for (sql, params) in statements {
            tx.exec_drop(sql.as_str(), params).await?;
            inserted += tx.affected_rows();
        }
        tx.commit().await?;

        Ok(inserted)
    }

    async fn close(&mut self) -> DriverResult<()> {
        if let Some(conn) = self.conn.take() {
            conn.disconnect().await?;
            debug!("Disconnected from MySQL");
        }
        Ok(())
    }
}

/// Convert a value for binding. Chrono types are spelled out as MySQL
/// date/time values.
fn sql_value_to_mysql(value: &SqlValue<'_>) -> Value {
    match value {
        SqlValue::Null => Value::NULL,
        SqlValue::Bool(b) => Value::Int(i64::from(*b)),
        SqlValue::I16(i) => Value::Int(i64::from(*i)),
        SqlValue::I32(i) => Value::Int(i64::from(*i)),
        SqlValue::I64(i) => Value::Int(*i),
        SqlValue::F32(f) => Value::Float(*f),
        SqlValue::F64(f) => Value::Double(*f),
        SqlValue::Text(s) => Value::Bytes(s.as_bytes().to_vec()),
        SqlValue::Bytes(b) => Value::Bytes(b.to_vec()),
        SqlValue::Uuid(u) => Value::Bytes(u.to_string().into_bytes()),
        SqlValue::Decimal(d) => Value::Bytes(d.to_string().into_bytes()),
        SqlValue::DateTime(dt) => datetime_value(dt.date(), dt.time()),
        SqlValue::DateTimeOffset(dto) => {
            let utc = dto.naive_utc();
            datetime_value(utc.date(), utc.time())
        }
        SqlValue::Date(d) => datetime_value(*d, NaiveTime::MIN),
        SqlValue::Time(t) => Value::Time(
            false,
            0,
            t.hour() as u8,
            t.minute() as u8,
            t.second() as u8,
            t.nanosecond() / 1_000,
        ),
    }
}

fn datetime_value(date: NaiveDate, time: NaiveTime) -> Value {
    Value::Date(
        date.year() as u16,
        date.month() as u8,
        date.day() as u8,
        time.hour() as u8,
        time.minute() as u8,
        time.second() as u8,
        time.nanosecond() / 1_000,
    )
}

fn row_to_values(mut row: mysql_async::Row, columns: &[Column]) -> DriverResult<Row> {
    columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let value: Value = row
                .take(i)
                .ok_or_else(|| DriverError::decode(col.name_str(), "value missing from row"))?;
            mysql_to_sql_value(value, col)
        })
        .collect()
}

fn mysql_to_sql_value(value: Value, col: &Column) -> DriverResult<SqlValue<'static>> {
    let value = match value {
        Value::NULL => SqlValue::Null,
        Value::Int(i) => SqlValue::I64(i),
        Value::UInt(u) => match i64::try_from(u) {
            Ok(i) => SqlValue::I64(i),
            Err(_) => SqlValue::Decimal(Decimal::from(u)),
        },
        Value::Float(f) => SqlValue::F32(f),
        Value::Double(f) => SqlValue::F64(f),
        Value::Bytes(bytes) => match col.column_type() {
            ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
                let text = String::from_utf8_lossy(&bytes);
                let decimal = text
                    .parse::<Decimal>()
                    .map_err(|e| DriverError::decode(col.name_str(), e.to_string()))?;
                SqlValue::Decimal(decimal)
            }
            _ if col.character_set() == BINARY_CHARSET => SqlValue::bytes_owned(bytes),
            _ => {
                let text = String::from_utf8(bytes)
                    .map_err(|e| DriverError::decode(col.name_str(), e.to_string()))?;
                SqlValue::text_owned(text)
            }
        },
        Value::Date(year, month, day, hour, minute, second, micros) => {
            // Zero dates have no calendar equivalent
            if year == 0 && month == 0 && day == 0 {
                return Ok(SqlValue::Null);
            }
            let date = NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
                .ok_or_else(|| DriverError::decode(col.name_str(), "invalid date"))?;
            if matches!(
                col.column_type(),
                ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE
            ) {
                SqlValue::Date(date)
            } else {
                let time = NaiveTime::from_hms_micro_opt(
                    u32::from(hour),
                    u32::from(minute),
                    u32::from(second),
                    micros,
                )
                .ok_or_else(|| DriverError::decode(col.name_str(), "invalid time"))?;
                SqlValue::DateTime(date.and_time(time))
            }
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            match NaiveTime::from_hms_micro_opt(
                u32::from(hours),
                u32::from(minutes),
                u32::from(seconds),
                micros,
            ) {
                Some(time) if !negative && days == 0 => SqlValue::Time(time),
                // Durations outside a day are kept as MySQL renders them
                _ => SqlValue::text_owned(format!(
                    "{}{:02}:{:02}:{:02}.{:06}",
                    if negative { "-" } else { "" },
                    u32::from(hours) + days * 24,
                    minutes,
                    seconds,
                    micros
                )),
            }
        }
    };
    Ok(value)
}
