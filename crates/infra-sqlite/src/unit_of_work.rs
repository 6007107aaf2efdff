// SQLite unit of work: one dedicated connection inside BEGIN IMMEDIATE ... COMMIT

use crate::binding::bind_value;
use crate::catalog::ProcedureCatalog;
use crate::error::map_sqlx_error;
use crate::sql;
use async_trait::async_trait;
use sqlx::SqliteConnection;
use std::sync::Arc;
use stinger_core::domain::{ProcedureCall, ProviderOutcome, StagedChange, WriteOperation};
use stinger_core::error::{AppError, Result};
use stinger_core::port::{Transaction, UnitOfWork};
use tokio::sync::Mutex;
use tracing::debug;

/// Connection handed back after commit or rollback, closed by the context
pub(crate) type Parked = Arc<Mutex<Option<SqliteConnection>>>;

pub struct SqliteUnitOfWork {
    conn: SqliteConnection,
    catalog: Arc<ProcedureCatalog>,
    staged: Vec<StagedChange>,
    parked: Parked,
}

impl SqliteUnitOfWork {
    pub(crate) async fn begin(
        mut conn: SqliteConnection,
        catalog: Arc<ProcedureCatalog>,
        parked: Parked,
    ) -> Result<Self> {
        // Take the write lock up front so a later write waits on busy_timeout
        // instead of failing with a stale read snapshot
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut conn)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self {
            conn,
            catalog,
            staged: Vec::new(),
            parked,
        })
    }

    async fn finish(mut self: Box<Self>, statement: &'static str) -> Result<()> {
        if !self.staged.is_empty() {
            debug!(pending = self.staged.len(), "Discarding unsaved changes");
        }
        let done = sqlx::query(statement)
            .execute(&mut self.conn)
            .await
            .map_err(map_sqlx_error);
        let this = *self;
        *this.parked.lock().await = Some(this.conn);
        done.map(|_| ())
    }
}

#[async_trait]
impl Transaction for SqliteUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.finish("COMMIT").await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.finish("ROLLBACK").await
    }
}

#[async_trait]
impl UnitOfWork for SqliteUnitOfWork {
    fn stage(&mut self, change: StagedChange) {
        self.staged.push(change);
    }

    async fn save_changes(&mut self) -> Result<u64> {
        let mut affected = 0;
        for change in std::mem::take(&mut self.staged) {
            let Some(statement) = sql::change(&change)? else {
                continue;
            };
            debug!(
                table = %change.table,
                operation = %change.operation,
                sql = %statement.sql,
                "Applying change"
            );
            let mut query = sqlx::query(&statement.sql);
            for value in &statement.binds {
                query = bind_value(query, value);
            }
            let done = query.execute(&mut self.conn).await.map_err(map_sqlx_error)?;
            let keyed = matches!(change.operation, WriteOperation::Modify | WriteOperation::Remove);
            if keyed && done.rows_affected() == 0 {
                return Err(AppError::Database(format!(
                    "{} on '{}' affected no rows",
                    change.operation, change.table
                )));
            }
            affected += done.rows_affected();
        }
        Ok(affected)
    }

    async fn execute_procedure(&mut self, call: &ProcedureCall) -> Result<ProviderOutcome> {
        debug!(statement = %call.command_text, "Executing procedure");
        self.catalog.execute(&mut self.conn, call).await
    }
}
