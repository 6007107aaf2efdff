// Cell conversion table
//
// Coerces a non-null provider value into a field type. The mapper handles
// provider null itself before any conversion runs.

use crate::domain::{ConversionError, SqlValue};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Field types a cell can be converted into
pub trait FromSql: Sized {
    /// Target name used in conversion errors
    const TARGET: &'static str;

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError>;
}

fn error(value: &SqlValue, target: &'static str, reason: impl Into<String>) -> ConversionError {
    ConversionError::new(value.kind_name(), target, reason)
}

fn unsupported(value: &SqlValue, target: &'static str) -> ConversionError {
    error(value, target, "unsupported conversion")
}

/// Banker's rounding, as the provider does for float to integer casts
fn round_half_even(v: f64) -> f64 {
    let rounded = v.round();
    if (v - v.trunc()).abs() == 0.5 {
        2.0 * (v / 2.0).round()
    } else {
        rounded
    }
}

fn integral(value: &SqlValue, target: &'static str) -> Result<i128, ConversionError> {
    let out = match value {
        SqlValue::Bool(v) => *v as i128,
        SqlValue::U8(v) => *v as i128,
        SqlValue::I16(v) => *v as i128,
        SqlValue::I32(v) => *v as i128,
        SqlValue::I64(v) => *v as i128,
        SqlValue::F32(v) => float_to_int(*v as f64, value, target)?,
        SqlValue::F64(v) => float_to_int(*v, value, target)?,
        SqlValue::Decimal(d) => d
            .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointNearestEven)
            .to_i128()
            .ok_or_else(|| error(value, target, "out of range"))?,
        SqlValue::String(s) => s
            .trim()
            .parse::<i128>()
            .map_err(|e| error(value, target, e.to_string()))?,
        _ => return Err(unsupported(value, target)),
    };
    Ok(out)
}

fn float_to_int(v: f64, value: &SqlValue, target: &'static str) -> Result<i128, ConversionError> {
    if !v.is_finite() {
        return Err(error(value, target, "not a finite number"));
    }
    Ok(round_half_even(v) as i128)
}

macro_rules! impl_from_sql_int {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl FromSql for $ty {
                const TARGET: &'static str = $name;

                fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
                    let wide = integral(value, Self::TARGET)?;
                    <$ty>::try_from(wide).map_err(|_| error(value, Self::TARGET, "out of range"))
                }
            }
        )*
    };
}

impl_from_sql_int! {
    u8 => "u8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
}

fn floating(value: &SqlValue, target: &'static str) -> Result<f64, ConversionError> {
    match value {
        SqlValue::F32(v) => Ok(*v as f64),
        SqlValue::F64(v) => Ok(*v),
        SqlValue::Decimal(d) => d.to_f64().ok_or_else(|| error(value, target, "out of range")),
        SqlValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| error(value, target, e.to_string())),
        other => integral(other, target).map(|v| v as f64),
    }
}

impl FromSql for f64 {
    const TARGET: &'static str = "f64";

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        floating(value, Self::TARGET)
    }
}

impl FromSql for f32 {
    const TARGET: &'static str = "f32";

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        let v = floating(value, Self::TARGET)?;
        if v.is_finite() && v.abs() > f32::MAX as f64 {
            return Err(error(value, Self::TARGET, "out of range"));
        }
        Ok(v as f32)
    }
}

impl FromSql for Decimal {
    const TARGET: &'static str = "decimal";

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        let out = match value {
            SqlValue::Decimal(d) => Some(*d),
            SqlValue::F32(v) => Decimal::from_f32(*v),
            SqlValue::F64(v) => Decimal::from_f64(*v),
            SqlValue::String(s) => Some(
                Decimal::from_str(s.trim())
                    .or_else(|_| Decimal::from_scientific(s.trim()))
                    .map_err(|e| error(value, Self::TARGET, e.to_string()))?,
            ),
            other => Decimal::from_i128(integral(other, Self::TARGET)?),
        };
        out.ok_or_else(|| error(value, Self::TARGET, "out of range"))
    }
}

impl FromSql for bool {
    const TARGET: &'static str = "bool";

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::Bool(v) => Ok(*v),
            SqlValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(error(value, Self::TARGET, format!("'{}' is not a boolean", s))),
            },
            SqlValue::F32(_) | SqlValue::F64(_) | SqlValue::Decimal(_) => {
                floating(value, Self::TARGET).map(|v| v != 0.0)
            }
            other => integral(other, Self::TARGET).map(|v| v != 0),
        }
    }
}

impl FromSql for NaiveDateTime {
    const TARGET: &'static str = "datetime";

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::DateTime(v) => Ok(*v),
            SqlValue::DateTimeOffset(v) => Ok(v.naive_local()),
            SqlValue::String(s) => parse_naive(s.trim())
                .ok_or_else(|| error(value, Self::TARGET, format!("'{}' is not a date-time", s))),
            other => Err(unsupported(other, Self::TARGET)),
        }
    }
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl FromSql for DateTime<FixedOffset> {
    const TARGET: &'static str = "datetimeoffset";

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::DateTimeOffset(v) => Ok(*v),
            SqlValue::DateTime(v) => Ok(v.and_utc().fixed_offset()),
            SqlValue::String(s) => {
                let text = s.trim();
                DateTime::parse_from_rfc3339(text)
                    .ok()
                    .or_else(|| DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f %:z").ok())
                    .or_else(|| parse_naive(text).map(|n| n.and_utc().fixed_offset()))
                    .ok_or_else(|| {
                        error(value, Self::TARGET, format!("'{}' is not a date-time", s))
                    })
            }
            other => Err(unsupported(other, Self::TARGET)),
        }
    }
}

impl FromSql for String {
    const TARGET: &'static str = "string";

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        value.to_text().ok_or_else(|| unsupported(value, Self::TARGET))
    }
}

impl FromSql for Vec<u8> {
    const TARGET: &'static str = "bytes";

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::Bytes(b) => Ok(b.clone()),
            SqlValue::Guid(g) => Ok(g.as_bytes().to_vec()),
            other => Err(unsupported(other, Self::TARGET)),
        }
    }
}

impl FromSql for Uuid {
    const TARGET: &'static str = "guid";

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::Guid(g) => Ok(*g),
            SqlValue::String(s) => {
                Uuid::parse_str(s.trim()).map_err(|e| error(value, Self::TARGET, e.to_string()))
            }
            SqlValue::Bytes(b) => {
                Uuid::from_slice(b).map_err(|e| error(value, Self::TARGET, e.to_string()))
            }
            other => Err(unsupported(other, Self::TARGET)),
        }
    }
}

impl FromSql for TimeDelta {
    const TARGET: &'static str = "timespan";

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::TimeSpan(v) => Ok(*v),
            SqlValue::String(s) => crate::domain::value::parse_time_span(s)
                .ok_or_else(|| error(value, Self::TARGET, format!("'{}' is not a time span", s))),
            other => Err(unsupported(other, Self::TARGET)),
        }
    }
}

impl FromSql for char {
    const TARGET: &'static str = "char";

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        match value {
            SqlValue::Char(c) => Ok(*c),
            SqlValue::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(error(value, Self::TARGET, "expected exactly one character")),
                }
            }
            other => {
                let code = integral(other, Self::TARGET)?;
                u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| error(other, Self::TARGET, "not a valid character code"))
            }
        }
    }
}

impl FromSql for SqlValue {
    const TARGET: &'static str = "value";

    fn from_sql(value: &SqlValue) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

/// Generic fallback for any other field type: parse the textual form
pub fn parse_text<T>(value: &SqlValue) -> Result<T, ConversionError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let target = std::any::type_name::<T>();
    let text = value
        .to_text()
        .ok_or_else(|| error(value, target, "no textual form"))?;
    text.trim()
        .parse::<T>()
        .map_err(|e| error(value, target, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_integer_widening_and_range() {
        assert_eq!(i64::from_sql(&SqlValue::I32(7)).unwrap(), 7);
        assert_eq!(i32::from_sql(&SqlValue::I64(7)).unwrap(), 7);
        assert!(i32::from_sql(&SqlValue::I64(i64::MAX)).is_err());
        assert!(u8::from_sql(&SqlValue::I16(-1)).is_err());
        assert_eq!(i16::from_sql(&SqlValue::String(" 12 ".into())).unwrap(), 12);
    }

    #[test]
    fn test_float_to_int_rounds_half_to_even() {
        assert_eq!(i32::from_sql(&SqlValue::F64(2.5)).unwrap(), 2);
        assert_eq!(i32::from_sql(&SqlValue::F64(3.5)).unwrap(), 4);
        assert_eq!(i32::from_sql(&SqlValue::F64(-2.5)).unwrap(), -2);
        assert!(i64::from_sql(&SqlValue::F64(f64::NAN)).is_err());
    }

    #[test]
    fn test_bool_from_numbers_and_text() {
        assert!(bool::from_sql(&SqlValue::I64(1)).unwrap());
        assert!(!bool::from_sql(&SqlValue::I64(0)).unwrap());
        assert!(bool::from_sql(&SqlValue::String("True".into())).unwrap());
        assert!(bool::from_sql(&SqlValue::String("yes".into())).is_err());
    }

    #[test]
    fn test_decimal_from_text_and_float() {
        assert_eq!(
            Decimal::from_sql(&SqlValue::String("12.50".into())).unwrap(),
            Decimal::new(1250, 2)
        );
        assert_eq!(Decimal::from_sql(&SqlValue::I64(3)).unwrap(), Decimal::from(3));
        assert!(Decimal::from_sql(&SqlValue::F64(0.25)).is_ok());
    }

    #[test]
    fn test_datetime_from_text() {
        let dt = NaiveDateTime::from_sql(&SqlValue::String("2024-03-01 10:20:30".into())).unwrap();
        assert_eq!(dt.to_string(), "2024-03-01 10:20:30");

        let date_only = NaiveDateTime::from_sql(&SqlValue::String("2024-03-01".into())).unwrap();
        assert_eq!(date_only.to_string(), "2024-03-01 00:00:00");

        let offset =
            DateTime::<FixedOffset>::from_sql(&SqlValue::String("2024-03-01T10:20:30+02:00".into()))
                .unwrap();
        assert_eq!(offset.offset().local_minus_utc(), 7200);
    }

    #[test]
    fn test_guid_char_and_span() {
        let id = Uuid::new_v4();
        assert_eq!(Uuid::from_sql(&SqlValue::String(id.to_string())).unwrap(), id);
        assert_eq!(Uuid::from_sql(&SqlValue::Bytes(id.as_bytes().to_vec())).unwrap(), id);

        assert_eq!(char::from_sql(&SqlValue::String("Y".into())).unwrap(), 'Y');
        assert!(char::from_sql(&SqlValue::String("YN".into())).is_err());
        assert_eq!(char::from_sql(&SqlValue::I32(65)).unwrap(), 'A');

        let span = TimeDelta::from_sql(&SqlValue::String("01:30:00".into())).unwrap();
        assert_eq!(span, TimeDelta::minutes(90));
    }

    #[test]
    fn test_string_and_bytes() {
        assert_eq!(String::from_sql(&SqlValue::I64(5)).unwrap(), "5");
        assert!(String::from_sql(&SqlValue::Bytes(vec![1])).is_err());
        assert!(Vec::<u8>::from_sql(&SqlValue::String("x".into())).is_err());
    }

    #[test]
    fn test_parsed_fallback() {
        let ip: Ipv4Addr = parse_text(&SqlValue::String("10.0.0.1".into())).unwrap();
        assert_eq!(ip, Ipv4Addr::new(10, 0, 0, 1));
        assert!(parse_text::<Ipv4Addr>(&SqlValue::I64(1)).is_err());
    }
}
