// Type Map: runtime scalar type -> provider parameter type

use super::value::ScalarKind;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// Provider-side parameter types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderType {
    Boolean,
    Byte,
    Int16,
    Int32,
    Int64,
    Single,
    Double,
    Decimal,
    StringFixedLength,
    String,
    Binary,
    Guid,
    DateTime,
    DateTimeOffset,
    Time,
    /// Table-valued parameter; never produced by the type map
    Structured,
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Process-wide, read-only. Built on first access, never mutated.
pub static TYPE_MAP: Lazy<HashMap<ScalarKind, ProviderType>> = Lazy::new(|| {
    HashMap::from([
        (ScalarKind::Bool, ProviderType::Boolean),
        (ScalarKind::U8, ProviderType::Byte),
        (ScalarKind::I16, ProviderType::Int16),
        (ScalarKind::I32, ProviderType::Int32),
        (ScalarKind::I64, ProviderType::Int64),
        (ScalarKind::F32, ProviderType::Single),
        (ScalarKind::F64, ProviderType::Double),
        (ScalarKind::Decimal, ProviderType::Decimal),
        (ScalarKind::Char, ProviderType::StringFixedLength),
        (ScalarKind::String, ProviderType::String),
        (ScalarKind::Bytes, ProviderType::Binary),
        (ScalarKind::Guid, ProviderType::Guid),
        (ScalarKind::DateTime, ProviderType::DateTime),
        (ScalarKind::DateTimeOffset, ProviderType::DateTimeOffset),
        (ScalarKind::TimeSpan, ProviderType::Time),
    ])
});

/// Provider type for a scalar kind, if the kind is mapped
pub fn provider_type_of(kind: ScalarKind) -> Option<ProviderType> {
    TYPE_MAP.get(&kind).copied()
}
