// Argument specs for `stinger call`: `null`, `out:<kind>`, `<kind>:<value>`

use anyhow::{anyhow, bail, Result};
use stinger_core::application::FromSql;
use stinger_core::domain::{Arg, ConversionError, Parameter, ScalarKind, SqlValue};

fn scalar_kind(name: &str) -> Option<ScalarKind> {
    let kind = match name.to_ascii_lowercase().as_str() {
        "bool" | "bit" => ScalarKind::Bool,
        "u8" | "tinyint" => ScalarKind::U8,
        "i16" | "smallint" => ScalarKind::I16,
        "i32" | "int" => ScalarKind::I32,
        "i64" | "bigint" => ScalarKind::I64,
        "f32" | "real" => ScalarKind::F32,
        "f64" | "float" => ScalarKind::F64,
        "decimal" => ScalarKind::Decimal,
        "char" => ScalarKind::Char,
        "string" | "text" => ScalarKind::String,
        "guid" => ScalarKind::Guid,
        "datetime" => ScalarKind::DateTime,
        "datetimeoffset" => ScalarKind::DateTimeOffset,
        "timespan" | "time" => ScalarKind::TimeSpan,
        _ => return None,
    };
    Some(kind)
}

fn typed<T: FromSql>(text: &str, wrap: fn(T) -> SqlValue) -> Result<SqlValue, ConversionError> {
    T::from_sql(&SqlValue::String(text.to_string())).map(wrap)
}

fn scalar_value(kind: ScalarKind, text: &str) -> Result<SqlValue> {
    let value = match kind {
        ScalarKind::Bool => typed::<bool>(text, SqlValue::Bool),
        ScalarKind::U8 => typed::<u8>(text, SqlValue::U8),
        ScalarKind::I16 => typed::<i16>(text, SqlValue::I16),
        ScalarKind::I32 => typed::<i32>(text, SqlValue::I32),
        ScalarKind::I64 => typed::<i64>(text, SqlValue::I64),
        ScalarKind::F32 => typed::<f32>(text, SqlValue::F32),
        ScalarKind::F64 => typed::<f64>(text, SqlValue::F64),
        ScalarKind::Decimal => typed(text, SqlValue::Decimal),
        ScalarKind::Char => typed::<char>(text, SqlValue::Char),
        ScalarKind::String => Ok(SqlValue::String(text.to_string())),
        ScalarKind::Guid => typed(text, SqlValue::Guid),
        ScalarKind::DateTime => typed(text, SqlValue::DateTime),
        ScalarKind::DateTimeOffset => typed(text, SqlValue::DateTimeOffset),
        ScalarKind::TimeSpan => typed(text, SqlValue::TimeSpan),
        ScalarKind::Bytes => bail!("byte arrays cannot be passed as procedure arguments"),
    };
    value.map_err(|e| anyhow!("{}", e))
}

/// Parse one `--arg` value
pub fn parse_arg(raw: &str) -> Result<Arg> {
    if raw.eq_ignore_ascii_case("null") {
        return Ok(Arg::Null);
    }
    let (head, rest) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("argument '{}' must look like <kind>:<value>, out:<kind> or null", raw))?;

    if head.eq_ignore_ascii_case("out") {
        let kind = scalar_kind(rest).ok_or_else(|| anyhow!("unknown kind '{}'", rest))?;
        return Ok(Arg::Param(Parameter::output(kind)));
    }
    let kind = scalar_kind(head).ok_or_else(|| anyhow!("unknown kind '{}'", head))?;
    scalar_value(kind, rest).map(Arg::Value)
}
