// Value binding and row decoding between SqlValue and SQLite storage classes

use crate::error::map_sqlx_error;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta};
use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};
use stinger_core::application::FromSql;
use stinger_core::domain::value::format_time_span;
use stinger_core::domain::{BoundParameter, BoundValue, ProviderType, RowSet, Schema, SqlValue};
use stinger_core::error::{AppError, Result};
use tracing::debug;
use uuid::Uuid;

pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Round a decimal to `scale` and reject values wider than `precision` digits
pub(crate) fn fit_decimal(value: Decimal, precision: u8, scale: u8) -> Result<Decimal> {
    let rounded = value.round_dp_with_strategy(scale as u32, RoundingStrategy::MidpointAwayFromZero);
    let integer_digits = precision.saturating_sub(scale) as u32;
    let limit = Decimal::from_i128_with_scale(10i128.pow(integer_digits), 0);
    if rounded.abs() >= limit {
        return Err(AppError::Database(format!(
            "Arithmetic overflow converting {} to decimal({}, {})",
            value, precision, scale
        )));
    }
    Ok(rounded)
}

/// Bind one value in SQLite's storage classes
pub(crate) fn bind_value<'q>(query: SqliteQuery<'q>, value: &SqlValue) -> SqliteQuery<'q> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v as i64),
        SqlValue::U8(v) => query.bind(*v as i64),
        SqlValue::I16(v) => query.bind(*v as i64),
        SqlValue::I32(v) => query.bind(*v as i64),
        SqlValue::I64(v) => query.bind(*v),
        SqlValue::F32(v) => query.bind(*v as f64),
        SqlValue::F64(v) => query.bind(*v),
        SqlValue::Decimal(d) => query.bind(d.to_string()),
        SqlValue::Char(c) => query.bind(c.to_string()),
        SqlValue::String(s) => query.bind(s.clone()),
        SqlValue::Bytes(b) => query.bind(b.clone()),
        SqlValue::Guid(g) => query.bind(g.hyphenated().to_string()),
        SqlValue::DateTime(dt) => query.bind(dt.format(DATETIME_FORMAT).to_string()),
        SqlValue::DateTimeOffset(dt) => query.bind(dt.to_rfc3339()),
        SqlValue::TimeSpan(span) => query.bind(format_time_span(span)),
    }
}

/// Bind a procedure parameter, applying its declared decimal facets.
/// Table-valued parameters bind null; their rows live in a temp table.
pub(crate) fn bind_parameter<'q>(
    query: SqliteQuery<'q>,
    parameter: &BoundParameter,
) -> Result<SqliteQuery<'q>> {
    let value = match &parameter.value {
        BoundValue::Table(_) => return Ok(query.bind(None::<String>)),
        BoundValue::Scalar(value) => value,
    };
    match (value, parameter.precision, parameter.scale) {
        (SqlValue::Decimal(d), Some(precision), Some(scale)) => {
            let fitted = fit_decimal(*d, precision, scale)?;
            Ok(query.bind(fitted.to_string()))
        }
        _ => Ok(bind_value(query, value)),
    }
}

fn decode_cell(row: &SqliteRow, index: usize) -> std::result::Result<SqlValue, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let storage = raw.type_info().name().to_string();
    let value = match storage.as_str() {
        "INTEGER" | "BOOLEAN" | "INT8" => SqlValue::I64(row.try_get_unchecked::<i64, _>(index)?),
        "REAL" => SqlValue::F64(row.try_get_unchecked::<f64, _>(index)?),
        "BLOB" => SqlValue::Bytes(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        _ => SqlValue::String(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}

/// Decode fetched rows into one row set sharing a single schema
pub(crate) fn decode_rows(rows: &[SqliteRow]) -> Result<RowSet> {
    let Some(first) = rows.first() else {
        return Ok(RowSet::empty());
    };
    let schema = Schema::new(first.columns().iter().map(|c| c.name().to_string()));

    let mut decoded = Vec::with_capacity(rows.len());
    for row in rows {
        let mut values = Vec::with_capacity(row.len());
        for index in 0..row.len() {
            values.push(decode_cell(row, index).map_err(map_sqlx_error)?);
        }
        decoded.push(values);
    }
    debug!(rows = decoded.len(), columns = schema.len(), "Decoded result set");
    Ok(RowSet::new(schema, decoded))
}

/// Decode a single row into `(column, value)` pairs
pub(crate) fn decode_named(row: &SqliteRow) -> Result<Vec<(String, SqlValue)>> {
    row.columns()
        .iter()
        .map(|column| {
            let value = decode_cell(row, column.ordinal()).map_err(map_sqlx_error)?;
            Ok((column.name().to_string(), value))
        })
        .collect()
}

fn convert<T: FromSql>(value: &SqlValue, wrap: fn(T) -> SqlValue) -> Option<SqlValue> {
    T::from_sql(value).ok().map(wrap)
}

/// Give an output value the storage-independent shape of its declared type.
/// Values that do not convert are returned as stored.
pub(crate) fn coerce_output(value: SqlValue, provider_type: Option<ProviderType>) -> SqlValue {
    if value.is_null() {
        return value;
    }
    let coerced = match provider_type {
        Some(ProviderType::Boolean) => convert::<bool>(&value, SqlValue::Bool),
        Some(ProviderType::Byte) => convert::<u8>(&value, SqlValue::U8),
        Some(ProviderType::Int16) => convert::<i16>(&value, SqlValue::I16),
        Some(ProviderType::Int32) => convert::<i32>(&value, SqlValue::I32),
        Some(ProviderType::Int64) => convert::<i64>(&value, SqlValue::I64),
        Some(ProviderType::Single) => convert::<f32>(&value, SqlValue::F32),
        Some(ProviderType::Double) => convert::<f64>(&value, SqlValue::F64),
        Some(ProviderType::Decimal) => convert::<Decimal>(&value, SqlValue::Decimal),
        Some(ProviderType::StringFixedLength) => convert::<char>(&value, SqlValue::Char),
        Some(ProviderType::String) => convert::<String>(&value, SqlValue::String),
        Some(ProviderType::Binary) => convert::<Vec<u8>>(&value, SqlValue::Bytes),
        Some(ProviderType::Guid) => convert::<Uuid>(&value, SqlValue::Guid),
        Some(ProviderType::DateTime) => convert::<NaiveDateTime>(&value, SqlValue::DateTime),
        Some(ProviderType::DateTimeOffset) => {
            convert::<DateTime<FixedOffset>>(&value, SqlValue::DateTimeOffset)
        }
        Some(ProviderType::Time) => convert::<TimeDelta>(&value, SqlValue::TimeSpan),
        Some(ProviderType::Structured) | None => None,
    };
    coerced.unwrap_or(value)
}
