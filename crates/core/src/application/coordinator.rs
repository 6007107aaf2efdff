// Transaction Coordinator
//
// Owns the single ambient unit of work of a repository instance. Writers
// serialize on one async mutex; the transaction begins lazily on the first
// write and ends on commit or rollback, after which the connection is closed.

use super::cancel::CancellationToken;
use crate::error::{AppError, Result};
use crate::port::{IsolationLevel, OrmContext, UnitOfWork};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Observable coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    NoTransaction,
    TransactionActive,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::NoTransaction => f.write_str("NO_TRANSACTION"),
            TransactionState::TransactionActive => f.write_str("TRANSACTION_ACTIVE"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Completion {
    Commit,
    Rollback,
}

type Slot = Option<Box<dyn UnitOfWork>>;

pub struct TransactionCoordinator {
    context: Arc<dyn OrmContext>,
    slot: Mutex<Slot>,
}

impl TransactionCoordinator {
    pub fn new(context: Arc<dyn OrmContext>) -> Self {
        Self {
            context,
            slot: Mutex::new(None),
        }
    }

    pub fn context(&self) -> &Arc<dyn OrmContext> {
        &self.context
    }

    /// Wait for exclusive write access. A fired token aborts the wait
    /// without side effects.
    pub async fn acquire(&self, cancel: &CancellationToken, operation: &str) -> Result<WriteGuard<'_>> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled(format!("{} before acquiring the write lock", operation)));
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(operation, "Cancelled while waiting for the write lock");
                Err(AppError::Cancelled(format!("{} while waiting for the write lock", operation)))
            }
            slot = self.slot.lock() => Ok(WriteGuard {
                slot,
                context: self.context.as_ref(),
            }),
        }
    }

    pub async fn state(&self) -> TransactionState {
        if self.slot.lock().await.is_some() {
            TransactionState::TransactionActive
        } else {
            TransactionState::NoTransaction
        }
    }

    /// Commit the active transaction. Succeeds without effect when idle.
    pub async fn commit(&self, cancel: &CancellationToken) -> Result<bool> {
        self.complete(cancel, Completion::Commit).await
    }

    /// Roll back the active transaction. Succeeds without effect when idle.
    pub async fn rollback(&self, cancel: &CancellationToken) -> Result<bool> {
        self.complete(cancel, Completion::Rollback).await
    }

    async fn complete(&self, cancel: &CancellationToken, completion: Completion) -> Result<bool> {
        let operation = match completion {
            Completion::Commit => "commit",
            Completion::Rollback => "rollback",
        };
        let mut guard = self.acquire(cancel, operation).await?;

        let Some(unit) = guard.slot.take() else {
            debug!(operation, "No active transaction");
            return Ok(true);
        };

        let outcome = match completion {
            Completion::Commit => unit.commit().await,
            Completion::Rollback => unit.rollback().await,
        };
        let closed = self.context.close_connection().await;

        outcome?;
        closed?;
        info!(operation, "Transaction completed");
        Ok(true)
    }
}

/// Exclusive write access, released on drop
pub struct WriteGuard<'a> {
    slot: MutexGuard<'a, Slot>,
    context: &'a dyn OrmContext,
}

impl WriteGuard<'_> {
    /// Begin at READ COMMITTED on first write; reuse the active transaction after
    pub async fn ensure_transaction(&mut self) -> Result<&mut Box<dyn UnitOfWork>> {
        if self.slot.is_none() {
            let unit = self
                .context
                .begin_transaction(IsolationLevel::ReadCommitted)
                .await?;
            info!(isolation = %IsolationLevel::ReadCommitted, "Transaction started");
            *self.slot = Some(unit);
        }
        self.slot
            .as_mut()
            .ok_or_else(|| AppError::Internal("transaction slot empty after begin".to_string()))
    }

    pub fn context(&self) -> &dyn OrmContext {
        self.context
    }

    pub fn is_active(&self) -> bool {
        self.slot.is_some()
    }
}
