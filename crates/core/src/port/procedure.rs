// Mapped procedure port: typed handlers registered by procedure name

use super::orm_context::OrmContext;
use super::transaction::UnitOfWork;
use crate::domain::{Arg, ConfigError, ProcedureCall, ProviderOutcome, StagedChange};
use crate::error::Result;
use async_trait::async_trait;
use std::any::Any;
use std::fmt;

/// Return value of a mapped procedure
pub enum MappedReturn {
    /// The procedure ran and produced no rows
    Completed,
    /// Typed rows, expected to be a `Vec<T>` of the caller's row type
    Rows(Box<dyn Any + Send>),
}

impl MappedReturn {
    pub fn rows<T: Send + 'static>(rows: Vec<T>) -> Self {
        MappedReturn::Rows(Box::new(rows))
    }
}

impl fmt::Debug for MappedReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappedReturn::Completed => f.write_str("Completed"),
            MappedReturn::Rows(_) => f.write_str("Rows(..)"),
        }
    }
}

/// What a mapped handler runs against.
///
/// On the write path (`call_procedure`) the scope carries the repository's
/// ambient unit of work, so staged writes and nested procedure calls commit
/// or roll back with everything else. On the read path it only exposes the
/// context, and any write is rejected.
pub struct ProcedureScope<'a> {
    procedure: &'a str,
    context: &'a dyn OrmContext,
    unit: Option<&'a mut dyn UnitOfWork>,
    rows_affected: u64,
}

impl<'a> ProcedureScope<'a> {
    pub fn read_only(procedure: &'a str, context: &'a dyn OrmContext) -> Self {
        Self {
            procedure,
            context,
            unit: None,
            rows_affected: 0,
        }
    }

    pub fn transactional(
        procedure: &'a str,
        context: &'a dyn OrmContext,
        unit: &'a mut dyn UnitOfWork,
    ) -> Self {
        Self {
            procedure,
            context,
            unit: Some(unit),
            rows_affected: 0,
        }
    }

    pub fn procedure(&self) -> &str {
        self.procedure
    }

    /// Non-transactional reads go straight to the context
    pub fn context(&self) -> &'a dyn OrmContext {
        self.context
    }

    pub fn is_transactional(&self) -> bool {
        self.unit.is_some()
    }

    /// Rows reported by `save_changes` and `execute_procedure` so far
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    pub fn stage(&mut self, change: StagedChange) -> Result<()> {
        self.unit()?.stage(change);
        Ok(())
    }

    pub async fn save_changes(&mut self) -> Result<u64> {
        let affected = self.unit()?.save_changes().await?;
        self.rows_affected += affected;
        Ok(affected)
    }

    pub async fn execute_procedure(&mut self, call: &ProcedureCall) -> Result<ProviderOutcome> {
        let outcome = self.unit()?.execute_procedure(call).await?;
        self.rows_affected += outcome.rows_affected;
        Ok(outcome)
    }

    fn unit(&mut self) -> Result<&mut (dyn UnitOfWork + 'a)> {
        match self.unit.as_deref_mut() {
            Some(unit) => Ok(unit),
            None => Err(ConfigError::ReadOnlyProcedure(self.procedure.to_string()).into()),
        }
    }
}

/// Compile-time declared handler for one stored procedure
#[async_trait]
pub trait MappedProcedure: Send + Sync {
    /// Number of arguments the handler accepts, if fixed
    fn arity(&self) -> Option<usize> {
        None
    }

    async fn invoke(&self, scope: &mut ProcedureScope<'_>, args: &[Arg]) -> Result<MappedReturn>;
}
