// Procedure Dispatcher
//
// Procedures registered by exact name run through their typed handler.
// Everything else takes the raw path. A handler that rejects its arguments
// is a configuration error and is never retried raw.

use crate::domain::{Arg, ConfigError};
use crate::port::{MappedProcedure, MappedReturn};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Execution path chosen for a procedure call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPath {
    Mapped,
    Raw,
}

impl ExecutionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionPath::Mapped => "mapped",
            ExecutionPath::Raw => "raw",
        }
    }
}

impl fmt::Display for ExecutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved route for one call
pub enum Route {
    Mapped(Arc<dyn MappedProcedure>),
    Raw,
}

impl Route {
    pub fn path(&self) -> ExecutionPath {
        match self {
            Route::Mapped(_) => ExecutionPath::Mapped,
            Route::Raw => ExecutionPath::Raw,
        }
    }
}

/// Startup-time table of typed procedure handlers
#[derive(Default, Clone)]
pub struct ProcedureRegistry {
    handlers: HashMap<String, Arc<dyn MappedProcedure>>,
}

impl ProcedureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under the exact procedure name
    pub fn register(mut self, name: impl Into<String>, handler: impl MappedProcedure + 'static) -> Self {
        let name = name.into();
        info!(procedure = %name, "Registered mapped procedure");
        self.handlers.insert(name, Arc::new(handler));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Case-sensitive exact match; no match means the raw path
    pub fn route(&self, procedure: &str) -> Route {
        match self.handlers.get(procedure) {
            Some(handler) => Route::Mapped(handler.clone()),
            None => Route::Raw,
        }
    }
}

/// Reject argument lists the handler cannot accept
pub fn check_arity(
    procedure: &str,
    handler: &dyn MappedProcedure,
    args: &[Arg],
) -> Result<(), ConfigError> {
    match handler.arity() {
        Some(expected) if expected != args.len() => Err(ConfigError::SignatureMismatch {
            procedure: procedure.to_string(),
            detail: format!("expected {} argument(s), got {}", expected, args.len()),
        }),
        _ => Ok(()),
    }
}

/// Adapt a mapped return into typed rows
pub fn expect_rows<T: Send + 'static>(
    procedure: &str,
    returned: MappedReturn,
) -> Result<Vec<T>, ConfigError> {
    let mismatch = |detail: String| ConfigError::SignatureMismatch {
        procedure: procedure.to_string(),
        detail,
    };
    match returned {
        MappedReturn::Rows(rows) => rows.downcast::<Vec<T>>().map(|rows| *rows).map_err(|_| {
            mismatch(format!(
                "handler rows are not of type {}",
                std::any::type_name::<T>()
            ))
        }),
        MappedReturn::Completed => Err(mismatch("handler returned no rows".to_string())),
    }
}
