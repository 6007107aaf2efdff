// Filter: column predicate translated by the store adapter

use super::record::Schema;
use super::value::SqlValue;
use rust_decimal::prelude::ToPrimitive;
use std::cmp::Ordering;

/// Predicate over named columns.
///
/// Adapters render it into their own query language; the in-memory mock
/// evaluates it directly with [`Filter::matches`].
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, SqlValue),
    Ne(String, SqlValue),
    Lt(String, SqlValue),
    Le(String, SqlValue),
    Gt(String, SqlValue),
    Ge(String, SqlValue),
    IsNull(String),
    IsNotNull(String),
    In(String, Vec<SqlValue>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Filter::Eq(column.into(), value.into())
    }

    pub fn ne(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Filter::Ne(column.into(), value.into())
    }

    pub fn lt(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Filter::Lt(column.into(), value.into())
    }

    pub fn le(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Filter::Le(column.into(), value.into())
    }

    pub fn gt(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Filter::Gt(column.into(), value.into())
    }

    pub fn ge(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Filter::Ge(column.into(), value.into())
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Filter::IsNull(column.into())
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Filter::IsNotNull(column.into())
    }

    pub fn is_in<V: Into<SqlValue>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(column.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::And(mut parts) => {
                parts.push(other);
                Filter::And(parts)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Filter) -> Self {
        match self {
            Filter::Or(mut parts) => {
                parts.push(other);
                Filter::Or(parts)
            }
            first => Filter::Or(vec![first, other]),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Filter::Not(Box::new(self))
    }

    /// Evaluate against one row. Comparisons with NULL are false, as in SQL.
    pub fn matches(&self, schema: &Schema, row: &[SqlValue]) -> bool {
        let cell = |column: &str| schema.ordinal(column).and_then(|i| row.get(i));
        let cmp = |column: &str, value: &SqlValue| cell(column).and_then(|c| compare_values(c, value));

        match self {
            Filter::Eq(c, v) => cmp(c, v) == Some(Ordering::Equal),
            Filter::Ne(c, v) => matches!(cmp(c, v), Some(o) if o != Ordering::Equal),
            Filter::Lt(c, v) => cmp(c, v) == Some(Ordering::Less),
            Filter::Le(c, v) => matches!(cmp(c, v), Some(Ordering::Less | Ordering::Equal)),
            Filter::Gt(c, v) => cmp(c, v) == Some(Ordering::Greater),
            Filter::Ge(c, v) => matches!(cmp(c, v), Some(Ordering::Greater | Ordering::Equal)),
            Filter::IsNull(c) => cell(c).map(SqlValue::is_null).unwrap_or(true),
            Filter::IsNotNull(c) => cell(c).map(|v| !v.is_null()).unwrap_or(false),
            Filter::In(c, values) => values.iter().any(|v| cmp(c, v) == Some(Ordering::Equal)),
            Filter::And(parts) => parts.iter().all(|f| f.matches(schema, row)),
            Filter::Or(parts) => parts.iter().any(|f| f.matches(schema, row)),
            Filter::Not(inner) => !inner.matches(schema, row),
        }
    }
}

/// SQL-style comparison: numbers compare across widths, NULL compares to nothing
pub fn compare_values(left: &SqlValue, right: &SqlValue) -> Option<Ordering> {
    if left.is_null() || right.is_null() {
        return None;
    }
    if let (Some(a), Some(b)) = (as_f64(left), as_f64(right)) {
        return a.partial_cmp(&b);
    }
    match (left, right) {
        (SqlValue::String(a), SqlValue::String(b)) => Some(a.cmp(b)),
        (SqlValue::Char(a), SqlValue::Char(b)) => Some(a.cmp(b)),
        (SqlValue::Bytes(a), SqlValue::Bytes(b)) => Some(a.cmp(b)),
        (SqlValue::Guid(a), SqlValue::Guid(b)) => Some(a.cmp(b)),
        (SqlValue::DateTime(a), SqlValue::DateTime(b)) => Some(a.cmp(b)),
        (SqlValue::DateTimeOffset(a), SqlValue::DateTimeOffset(b)) => Some(a.cmp(b)),
        (SqlValue::TimeSpan(a), SqlValue::TimeSpan(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn as_f64(value: &SqlValue) -> Option<f64> {
    match value {
        SqlValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
        SqlValue::U8(v) => Some(*v as f64),
        SqlValue::I16(v) => Some(*v as f64),
        SqlValue::I32(v) => Some(*v as f64),
        SqlValue::I64(v) => Some(*v as f64),
        SqlValue::F32(v) => Some(*v as f64),
        SqlValue::F64(v) => Some(*v),
        SqlValue::Decimal(v) => v.to_f64(),
        _ => None,
    }
}
