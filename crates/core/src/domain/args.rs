// Untyped procedure arguments

use super::parameter::Parameter;
use super::record::{Record, TableArg};
use super::value::SqlValue;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta};
use rust_decimal::Decimal;
use uuid::Uuid;

/// One entry of the ordered argument list handed to a procedure.
///
/// Classification happens in the marshaller; not every variant is a valid
/// argument (a bare byte array or a single record is rejected).
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Null,
    Value(SqlValue),
    Param(Parameter),
    Table(TableArg),
    Record(Record),
}

impl Arg {
    pub fn kind_name(&self) -> String {
        match self {
            Arg::Null => "null".to_string(),
            Arg::Value(v) => v.kind_name().to_string(),
            Arg::Param(p) => format!("parameter<{}>", p.kind()),
            Arg::Table(t) => format!("table<{}>", t.type_name()),
            Arg::Record(r) => format!("record<{}>", r.type_name),
        }
    }
}

impl From<SqlValue> for Arg {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => Arg::Null,
            other => Arg::Value(other),
        }
    }
}

impl From<Parameter> for Arg {
    fn from(value: Parameter) -> Self {
        Arg::Param(value)
    }
}

impl From<TableArg> for Arg {
    fn from(value: TableArg) -> Self {
        Arg::Table(value)
    }
}

impl From<Record> for Arg {
    fn from(value: Record) -> Self {
        Arg::Record(value)
    }
}

macro_rules! impl_arg_from_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    Arg::Value(SqlValue::from(value))
                }
            }

            impl From<Option<$ty>> for Arg {
                fn from(value: Option<$ty>) -> Self {
                    value.map(Arg::from).unwrap_or(Arg::Null)
                }
            }
        )*
    };
}

impl_arg_from_scalar!(
    bool,
    u8,
    i16,
    i32,
    i64,
    f32,
    f64,
    Decimal,
    char,
    String,
    Vec<u8>,
    Uuid,
    NaiveDateTime,
    DateTime<FixedOffset>,
    TimeDelta,
);

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Value(SqlValue::from(value))
    }
}
