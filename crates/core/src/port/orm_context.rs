// ORM context port: read path, transaction factory and connection control

use super::transaction::{IsolationLevel, UnitOfWork};
use crate::domain::{Filter, RowSet};
use crate::error::Result;
use async_trait::async_trait;

/// Store behind a repository instance
#[async_trait]
pub trait OrmContext: Send + Sync {
    /// Short store identifier, reported as `db.system`
    fn store_kind(&self) -> &'static str;

    /// Open the instance's single transaction connection and begin
    async fn begin_transaction(&self, isolation: IsolationLevel) -> Result<Box<dyn UnitOfWork>>;

    /// Non-tracking, non-transactional read
    async fn select(&self, table: &str, filter: Option<&Filter>) -> Result<RowSet>;

    /// Close the connection used by the last unit of work
    async fn close_connection(&self) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::{
        ProcedureCall, ProviderOutcome, Schema, SqlValue, StagedChange, WriteOperation,
    };
    use crate::error::AppError;
    use crate::port::transaction::Transaction;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Canned response of a procedure known to the mock store
    #[derive(Debug, Clone, Default)]
    pub struct ScriptedProcedure {
        pub rows: Option<RowSet>,
        pub outputs: HashMap<String, SqlValue>,
        pub error: Option<String>,
    }

    impl ScriptedProcedure {
        pub fn returning(rows: RowSet) -> Self {
            Self {
                rows: Some(rows),
                ..Default::default()
            }
        }

        pub fn with_output(mut self, name: &str, value: SqlValue) -> Self {
            self.outputs.insert(name.to_string(), value);
            self
        }

        pub fn failing(message: impl Into<String>) -> Self {
            Self {
                error: Some(message.into()),
                ..Default::default()
            }
        }
    }

    #[derive(Default)]
    struct MemoryState {
        tables: HashMap<String, (Arc<Schema>, Vec<Vec<SqlValue>>)>,
        procedures: HashMap<String, ScriptedProcedure>,
        statements: Vec<String>,
        calls: Vec<ProcedureCall>,
        events: Vec<String>,
        begin_count: usize,
        close_count: usize,
        write_delay: Option<Duration>,
        fail_commit: Option<String>,
    }

    /// In-memory store: committed tables, scripted procedures and a log of
    /// everything the repository did to it
    #[derive(Clone, Default)]
    pub struct MemoryOrmContext {
        state: Arc<Mutex<MemoryState>>,
    }

    impl MemoryOrmContext {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_table(self, name: &str, rows: RowSet) -> Self {
            {
                let mut state = self.state.lock().unwrap();
                let schema = rows.schema().clone();
                state.tables.insert(name.to_string(), (schema, rows.into_rows()));
            }
            self
        }

        pub fn with_procedure(self, name: &str, procedure: ScriptedProcedure) -> Self {
            self.state
                .lock()
                .unwrap()
                .procedures
                .insert(name.to_string(), procedure);
            self
        }

        /// Every `save_changes` sleeps this long between its start and end events
        pub fn with_write_delay(self, delay: Duration) -> Self {
            self.state.lock().unwrap().write_delay = Some(delay);
            self
        }

        pub fn with_failing_commit(self, message: &str) -> Self {
            self.state.lock().unwrap().fail_commit = Some(message.to_string());
            self
        }

        /// Command texts of executed raw calls
        pub fn statements(&self) -> Vec<String> {
            self.state.lock().unwrap().statements.clone()
        }

        pub fn calls(&self) -> Vec<ProcedureCall> {
            self.state.lock().unwrap().calls.clone()
        }

        pub fn events(&self) -> Vec<String> {
            self.state.lock().unwrap().events.clone()
        }

        pub fn begin_count(&self) -> usize {
            self.state.lock().unwrap().begin_count
        }

        pub fn close_count(&self) -> usize {
            self.state.lock().unwrap().close_count
        }

        /// Committed rows of a table
        pub fn table(&self, name: &str) -> Option<RowSet> {
            let state = self.state.lock().unwrap();
            state
                .tables
                .get(name)
                .map(|(schema, rows)| RowSet::new(schema.clone(), rows.clone()))
        }
    }

    #[async_trait]
    impl OrmContext for MemoryOrmContext {
        fn store_kind(&self) -> &'static str {
            "memory"
        }

        async fn begin_transaction(
            &self,
            _isolation: IsolationLevel,
        ) -> Result<Box<dyn UnitOfWork>> {
            let mut state = self.state.lock().unwrap();
            state.begin_count += 1;
            state.events.push("begin".to_string());
            Ok(Box::new(MemoryUnitOfWork {
                state: self.state.clone(),
                staged: Vec::new(),
                saved: Vec::new(),
            }))
        }

        async fn select(&self, table: &str, filter: Option<&Filter>) -> Result<RowSet> {
            let state = self.state.lock().unwrap();
            let (schema, rows) = state
                .tables
                .get(table)
                .ok_or_else(|| AppError::Database(format!("no such table: {}", table)))?;
            let rows = rows
                .iter()
                .filter(|row| filter.map(|f| f.matches(schema, row)).unwrap_or(true))
                .cloned()
                .collect();
            Ok(RowSet::new(schema.clone(), rows))
        }

        async fn close_connection(&self) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.close_count += 1;
            state.events.push("close".to_string());
            Ok(())
        }
    }

    struct MemoryUnitOfWork {
        state: Arc<Mutex<MemoryState>>,
        staged: Vec<StagedChange>,
        saved: Vec<StagedChange>,
    }

    #[async_trait]
    impl Transaction for MemoryUnitOfWork {
        async fn commit(self: Box<Self>) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            if let Some(message) = state.fail_commit.clone() {
                return Err(AppError::Database(message));
            }
            for change in &self.saved {
                apply(&mut state.tables, change);
            }
            state.events.push("commit".to_string());
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<()> {
            self.state.lock().unwrap().events.push("rollback".to_string());
            Ok(())
        }
    }

    #[async_trait]
    impl UnitOfWork for MemoryUnitOfWork {
        fn stage(&mut self, change: StagedChange) {
            self.staged.push(change);
        }

        async fn save_changes(&mut self) -> Result<u64> {
            let delay = {
                let mut state = self.state.lock().unwrap();
                state.events.push("save:start".to_string());
                state.write_delay
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let count = self.staged.len() as u64;
            self.saved.append(&mut self.staged);
            self.state.lock().unwrap().events.push("save:end".to_string());
            Ok(count)
        }

        async fn execute_procedure(&mut self, call: &ProcedureCall) -> Result<ProviderOutcome> {
            let mut state = self.state.lock().unwrap();
            state.statements.push(call.command_text.clone());
            state.calls.push(call.clone());
            let scripted = state.procedures.get(&call.procedure).cloned().ok_or_else(|| {
                AppError::Database(format!(
                    "Could not find stored procedure '{}'",
                    call.procedure
                ))
            })?;
            if let Some(message) = scripted.error {
                return Err(AppError::Database(message));
            }
            Ok(ProviderOutcome {
                rows_affected: scripted.rows.as_ref().map(|r| r.len() as u64).unwrap_or(0),
                rows: scripted.rows,
                outputs: scripted.outputs,
            })
        }
    }

    fn apply(tables: &mut HashMap<String, (Arc<Schema>, Vec<Vec<SqlValue>>)>, change: &StagedChange) {
        let (schema, rows) = tables
            .entry(change.table.clone())
            .or_insert_with(|| (Schema::new(change.columns.iter().cloned()), Vec::new()));
        let key_matches = |row: &Vec<SqlValue>| {
            change.key_pairs().iter().all(|(column, value)| {
                schema.ordinal(column).and_then(|i| row.get(i)) == Some(*value)
            })
        };

        match change.operation {
            WriteOperation::Add => {
                let mut row = vec![SqlValue::Null; schema.len()];
                for (column, value) in change.insert_pairs() {
                    if let Some(i) = schema.ordinal(column) {
                        row[i] = value.clone();
                    }
                }
                if let Some(i) = change.identity.as_deref().and_then(|c| schema.ordinal(c)) {
                    let next = rows
                        .iter()
                        .filter_map(|r| match r.get(i) {
                            Some(SqlValue::I64(v)) => Some(*v),
                            _ => None,
                        })
                        .max()
                        .unwrap_or(0)
                        + 1;
                    row[i] = SqlValue::I64(next);
                }
                rows.push(row);
            }
            WriteOperation::Modify => {
                for row in rows.iter_mut().filter(|r| key_matches(r)) {
                    for (column, value) in change.update_pairs() {
                        if let Some(i) = schema.ordinal(column) {
                            row[i] = value.clone();
                        }
                    }
                }
            }
            WriteOperation::Remove => rows.retain(|r| !key_matches(r)),
            WriteOperation::None => {}
        }
    }
}
