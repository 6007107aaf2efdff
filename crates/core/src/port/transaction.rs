// Unit-of-work port: one ambient transaction on one connection

use crate::domain::{ProcedureCall, ProviderOutcome, StagedChange};
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Transaction isolation level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction trait for atomic multi-step operations
#[async_trait]
pub trait Transaction: Send {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Work performed inside an open transaction.
///
/// Entity writes and raw procedure calls share the transaction's single
/// connection.
#[async_trait]
pub trait UnitOfWork: Transaction {
    /// Track an entity write; nothing reaches the store until `save_changes`
    fn stage(&mut self, change: StagedChange);

    /// Flush staged writes, returning the number of affected rows
    async fn save_changes(&mut self) -> Result<u64>;

    /// Execute a marshalled stored-procedure call
    async fn execute_procedure(&mut self, call: &ProcedureCall) -> Result<ProviderOutcome>;
}
