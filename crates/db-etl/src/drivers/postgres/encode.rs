//! Conversions between [`SqlValue`] and the PostgreSQL binary format.
//!
//! Prepared statements carry the server's inferred parameter types, so a
//! value is encoded for the type the server asked for. Integers widen or
//! narrow, text is parsed into numeric, temporal, uuid and json types. This
//! lets rows extracted from SQLite or MySQL land in typed columns.

use std::error::Error;

use bytes::BytesMut;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc};
use rust_decimal::Decimal;
use tokio_postgres::types::{to_sql_checked, IsNull, Kind, ToSql, Type};
use uuid::Uuid;

use crate::core::value::SqlValue;
use crate::error::{DriverError, DriverResult};

type BoxError = Box<dyn Error + Sync + Send>;

impl ToSql for SqlValue<'_> {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        if let Kind::Domain(inner) = ty.kind() {
            return self.to_sql(inner, out);
        }

        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(b) => encode_bool(*b, ty, out),
            SqlValue::I16(v) => encode_int(i64::from(*v), ty, out),
            SqlValue::I32(v) => encode_int(i64::from(*v), ty, out),
            SqlValue::I64(v) => encode_int(*v, ty, out),
            SqlValue::F32(v) => encode_float(f64::from(*v), ty, out),
            SqlValue::F64(v) => encode_float(*v, ty, out),
            SqlValue::Text(s) => encode_text(s, ty, out),
            SqlValue::Bytes(b) => {
                let bytes: &[u8] = b;
                match *ty {
                    Type::BYTEA => bytes.to_sql(ty, out),
                    _ => Err(format!("cannot store {} in a {} column", self.type_name(), ty).into()),
                }
            }
            SqlValue::Uuid(u) => match *ty {
                Type::UUID => u.to_sql(ty, out),
                _ => encode_text(&u.to_string(), ty, out),
            },
            SqlValue::Decimal(d) => match *ty {
                Type::NUMERIC => d.to_sql(ty, out),
                _ => encode_text(&d.to_string(), ty, out),
            },
            SqlValue::DateTime(dt) => match *ty {
                Type::TIMESTAMP => dt.to_sql(ty, out),
                Type::TIMESTAMPTZ => dt.and_utc().to_sql(ty, out),
                Type::DATE => dt.date().to_sql(ty, out),
                _ => encode_text(&dt.to_string(), ty, out),
            },
            SqlValue::DateTimeOffset(dt) => match *ty {
                Type::TIMESTAMPTZ => dt.to_sql(ty, out),
                Type::TIMESTAMP => dt.naive_utc().to_sql(ty, out),
                _ => encode_text(&dt.to_rfc3339(), ty, out),
            },
            SqlValue::Date(d) => match *ty {
                Type::DATE => d.to_sql(ty, out),
                Type::TIMESTAMP => d.and_time(NaiveTime::MIN).to_sql(ty, out),
                Type::TIMESTAMPTZ => d.and_time(NaiveTime::MIN).and_utc().to_sql(ty, out),
                _ => encode_text(&d.to_string(), ty, out),
            },
            SqlValue::Time(t) => match *ty {
                Type::TIME => t.to_sql(ty, out),
                _ => encode_text(&t.to_string(), ty, out),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn encode_bool(value: bool, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::BOOL => value.to_sql(ty, out),
        Type::INT2 | Type::INT4 | Type::INT8 => encode_int(i64::from(value), ty, out),
        _ => encode_text(if value { "true" } else { "false" }, ty, out),
    }
}

fn encode_int(value: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(value)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(value)?.to_sql(ty, out),
        Type::INT8 => value.to_sql(ty, out),
        Type::OID => u32::try_from(value)?.to_sql(ty, out),
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        Type::FLOAT8 => (value as f64).to_sql(ty, out),
        Type::NUMERIC => Decimal::from(value).to_sql(ty, out),
        Type::BOOL => (value != 0).to_sql(ty, out),
        _ => encode_text(&value.to_string(), ty, out),
    }
}

fn encode_float(value: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        Type::FLOAT8 => value.to_sql(ty, out),
        Type::NUMERIC => Decimal::try_from(value)?.to_sql(ty, out),
        Type::INT2 | Type::INT4 | Type::INT8 if value.fract() == 0.0 => {
            encode_int(value as i64, ty, out)
        }
        _ => encode_text(&value.to_string(), ty, out),
    }
}

/// Encode text, parsing it first when the column is not a text type.
fn encode_text(value: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    let trimmed = value.trim();
    match *ty {
        Type::BOOL => parse_bool(trimmed)?.to_sql(ty, out),
        Type::INT2 => trimmed.parse::<i16>()?.to_sql(ty, out),
        Type::INT4 => trimmed.parse::<i32>()?.to_sql(ty, out),
        Type::INT8 => trimmed.parse::<i64>()?.to_sql(ty, out),
        Type::FLOAT4 => trimmed.parse::<f32>()?.to_sql(ty, out),
        Type::FLOAT8 => trimmed.parse::<f64>()?.to_sql(ty, out),
        Type::NUMERIC => trimmed.parse::<Decimal>()?.to_sql(ty, out),
        Type::UUID => Uuid::parse_str(trimmed)?.to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(value)?.to_sql(ty, out),
        Type::DATE => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")?.to_sql(ty, out),
        Type::TIME => NaiveTime::parse_from_str(trimmed, "%H:%M:%S%.f")?.to_sql(ty, out),
        Type::TIMESTAMP => parse_timestamp(trimmed)?.to_sql(ty, out),
        Type::TIMESTAMPTZ => parse_timestamptz(trimmed)?.to_sql(ty, out),
        Type::BYTEA => value.as_bytes().to_sql(ty, out),
        _ => value.to_sql(ty, out),
    }
}

fn parse_bool(value: &str) -> Result<bool, BoxError> {
    match value.to_lowercase().as_str() {
        "t" | "true" | "1" | "y" | "yes" | "on" => Ok(true),
        "f" | "false" | "0" | "n" | "no" | "off" => Ok(false),
        other => Err(format!("invalid boolean '{}'", other).into()),
    }
}

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

fn parse_timestamp(value: &str) -> Result<NaiveDateTime, BoxError> {
    for format in TIMESTAMP_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed);
        }
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("invalid timestamp '{}'", value))?;
    Ok(date.and_time(NaiveTime::MIN))
}

/// Offset-less timestamps are read as UTC.
fn parse_timestamptz(value: &str) -> Result<DateTime<FixedOffset>, BoxError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed);
    }
    if let Ok(parsed) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(parsed);
    }
    let naive = parse_timestamp(value)?;
    Ok(DateTime::from_naive_utc_and_offset(naive, Utc.fix()))
}

/// Decode one column of a result row.
pub(super) fn decode_column(row: &tokio_postgres::Row, idx: usize) -> DriverResult<SqlValue<'static>> {
    let column = &row.columns()[idx];

    let value = match *column.type_() {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(SqlValue::Bool),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.map(SqlValue::I16),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.map(SqlValue::I32),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(SqlValue::I64),
        Type::OID => row
            .try_get::<_, Option<u32>>(idx)?
            .map(|v| SqlValue::I64(i64::from(v))),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx)?.map(SqlValue::F32),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(SqlValue::F64),
        Type::NUMERIC => row
            .try_get::<_, Option<Decimal>>(idx)?
            .map(SqlValue::Decimal),
        Type::UUID => row.try_get::<_, Option<Uuid>>(idx)?.map(SqlValue::Uuid),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(SqlValue::DateTime),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<FixedOffset>>>(idx)?
            .map(SqlValue::DateTimeOffset),
        Type::DATE => row.try_get::<_, Option<NaiveDate>>(idx)?.map(SqlValue::Date),
        Type::TIME => row.try_get::<_, Option<NaiveTime>>(idx)?.map(SqlValue::Time),
        Type::BYTEA => row
            .try_get::<_, Option<Vec<u8>>>(idx)?
            .map(SqlValue::bytes_owned),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)?
            .map(|v| SqlValue::text_owned(v.to_string())),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => row
            .try_get::<_, Option<String>>(idx)?
            .map(SqlValue::text_owned),
        ref other => {
            return Err(DriverError::decode(
                column.name(),
                format!(
                    "unsupported PostgreSQL type {}; cast it to text in the query",
                    other
                ),
            ))
        }
    };

    Ok(value.unwrap_or(SqlValue::Null))
}
