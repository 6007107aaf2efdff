// Domain Error Types

use thiserror::Error;

/// Caller configuration errors. Always raised before the provider is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No write operation was set for entity {0}")]
    MissingWriteOperation(String),

    #[error("Entity payload for {0} is empty")]
    NullPayload(String),

    #[error("Parameter at position {position} of kind {kind} is not a valid procedure argument")]
    InvalidParameterKind { position: usize, kind: String },

    #[error("Procedure name must not be empty")]
    EmptyProcedureName,

    #[error("Mapped procedure {procedure} signature mismatch: {detail}")]
    SignatureMismatch { procedure: String, detail: String },

    #[error("Entity {entity} has {expected} key column(s) but {actual} key value(s) were given")]
    KeyArity {
        entity: String,
        expected: usize,
        actual: usize,
    },

    #[error("Mapped procedure {0} was invoked on a read path and cannot write")]
    ReadOnlyProcedure(String),

    #[error("Field {field} is declared twice in the mapping of {target}")]
    DuplicateField { target: String, field: String },
}

/// A single cell could not be coerced into its declared field type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot convert {source_kind} value to {target}: {reason}")]
pub struct ConversionError {
    pub source_kind: String,
    pub target: &'static str,
    pub reason: String,
}

impl ConversionError {
    pub fn new(source_kind: impl Into<String>, target: &'static str, reason: impl Into<String>) -> Self {
        Self {
            source_kind: source_kind.into(),
            target,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
