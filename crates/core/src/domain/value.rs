// Provider values exchanged with the relational store

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta};
use rust_decimal::Decimal;
use std::fmt;
use uuid::Uuid;

/// Runtime scalar type of a non-null value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    U8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Decimal,
    Char,
    String,
    Bytes,
    Guid,
    DateTime,
    DateTimeOffset,
    TimeSpan,
}

impl ScalarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::U8 => "u8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Decimal => "decimal",
            ScalarKind::Char => "char",
            ScalarKind::String => "string",
            ScalarKind::Bytes => "bytes",
            ScalarKind::Guid => "guid",
            ScalarKind::DateTime => "datetime",
            ScalarKind::DateTimeOffset => "datetimeoffset",
            ScalarKind::TimeSpan => "timespan",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell or argument value. `Null` is the provider null.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    U8(u8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Char(char),
    String(String),
    Bytes(Vec<u8>),
    Guid(Uuid),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    TimeSpan(TimeDelta),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Scalar kind of the value; `None` for the provider null
    pub fn kind(&self) -> Option<ScalarKind> {
        let kind = match self {
            SqlValue::Null => return None,
            SqlValue::Bool(_) => ScalarKind::Bool,
            SqlValue::U8(_) => ScalarKind::U8,
            SqlValue::I16(_) => ScalarKind::I16,
            SqlValue::I32(_) => ScalarKind::I32,
            SqlValue::I64(_) => ScalarKind::I64,
            SqlValue::F32(_) => ScalarKind::F32,
            SqlValue::F64(_) => ScalarKind::F64,
            SqlValue::Decimal(_) => ScalarKind::Decimal,
            SqlValue::Char(_) => ScalarKind::Char,
            SqlValue::String(_) => ScalarKind::String,
            SqlValue::Bytes(_) => ScalarKind::Bytes,
            SqlValue::Guid(_) => ScalarKind::Guid,
            SqlValue::DateTime(_) => ScalarKind::DateTime,
            SqlValue::DateTimeOffset(_) => ScalarKind::DateTimeOffset,
            SqlValue::TimeSpan(_) => ScalarKind::TimeSpan,
        };
        Some(kind)
    }

    /// Kind name used in logs and error messages
    pub fn kind_name(&self) -> &'static str {
        self.kind().map(|k| k.as_str()).unwrap_or("null")
    }

    /// Textual form of a scalar, used by string targets and the parsed fallback.
    /// Byte arrays have no textual form.
    pub fn to_text(&self) -> Option<String> {
        match self {
            SqlValue::Null | SqlValue::Bytes(_) => None,
            SqlValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Bool(v) => write!(f, "{}", v),
            SqlValue::U8(v) => write!(f, "{}", v),
            SqlValue::I16(v) => write!(f, "{}", v),
            SqlValue::I32(v) => write!(f, "{}", v),
            SqlValue::I64(v) => write!(f, "{}", v),
            SqlValue::F32(v) => write!(f, "{}", v),
            SqlValue::F64(v) => write!(f, "{}", v),
            SqlValue::Decimal(v) => write!(f, "{}", v),
            SqlValue::Char(v) => write!(f, "{}", v),
            SqlValue::String(v) => f.write_str(v),
            SqlValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            SqlValue::Guid(v) => write!(f, "{}", v.hyphenated()),
            SqlValue::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%.f")),
            SqlValue::DateTimeOffset(v) => write!(f, "{}", v.to_rfc3339()),
            SqlValue::TimeSpan(v) => f.write_str(&format_time_span(v)),
        }
    }
}

/// Formats a span as `[-][d.]hh:mm:ss[.fffffff]`
pub fn format_time_span(span: &TimeDelta) -> String {
    let negative = *span < TimeDelta::zero();
    let abs = span.abs();
    let total_secs = abs.num_seconds();
    let nanos = abs.subsec_nanos();

    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if days > 0 {
        out.push_str(&format!("{}.", days));
    }
    out.push_str(&format!("{:02}:{:02}:{:02}", hours, minutes, seconds));
    if nanos > 0 {
        // 100ns ticks, trailing zeros trimmed
        let ticks = format!("{:07}", nanos / 100);
        out.push('.');
        out.push_str(ticks.trim_end_matches('0'));
    }
    out
}

/// Parses `[-][d.]hh:mm[:ss[.fffffff]]`
pub fn parse_time_span(text: &str) -> Option<TimeDelta> {
    let text = text.trim();
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let (days, clock) = match body.split_once('.') {
        // a dot before the first colon separates days
        Some((d, rest)) if !d.contains(':') => (d.parse::<i64>().ok()?, rest),
        _ => (0, body),
    };

    let mut parts = clock.split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let (seconds, fraction) = match parts.next() {
        Some(sec) => match sec.split_once('.') {
            Some((s, frac)) => (s.parse::<i64>().ok()?, frac),
            None => (sec.parse::<i64>().ok()?, ""),
        },
        None => (0, ""),
    };
    if parts.next().is_some() || hours > 23 || minutes > 59 || seconds > 59 {
        return None;
    }

    let nanos = if fraction.is_empty() {
        0
    } else {
        if fraction.len() > 9 || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        format!("{:0<9}", fraction).parse::<i64>().ok()?
    };

    let span = TimeDelta::days(days)
        + TimeDelta::hours(hours)
        + TimeDelta::minutes(minutes)
        + TimeDelta::seconds(seconds)
        + TimeDelta::nanoseconds(nanos);
    Some(if negative { -span } else { span })
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(value: $ty) -> Self {
                    SqlValue::$variant(value)
                }
            }
        )*
    };
}

impl_from_scalar! {
    bool => Bool,
    u8 => U8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    char => Char,
    String => String,
    Vec<u8> => Bytes,
    Uuid => Guid,
    NaiveDateTime => DateTime,
    DateTime<FixedOffset> => DateTimeOffset,
    TimeDelta => TimeSpan,
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::String(value.to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}
