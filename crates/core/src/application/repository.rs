// Repository: the dual-path data-access surface
//
// Writes (save, raw procedure calls, commit, rollback) go through the
// coordinator's lock and share one transaction. Reads bypass the lock and
// run on the context's non-transactional read path.

use super::cancel::{cancellable, CancellationToken};
use super::coordinator::{TransactionCoordinator, TransactionState};
use super::dispatcher::{check_arity, expect_rows, ExecutionPath, ProcedureRegistry, Route};
use super::field_map::FromRecord;
use super::instrumentation::{observe, operation_span, record_path, record_statement};
use super::mapper::map_rows;
use super::marshaller::{collect_outputs, marshal};
use crate::domain::{
    Arg, ConfigError, Entity, EntityWrapper, Filter, OutputValues, ProcedureCall,
    ProviderOutcome, RowSet, SqlValue, StagedChange,
};
use crate::error::{AppError, Result};
use crate::port::{OrmContext, ProcedureScope};
use std::sync::Arc;
use tracing::debug;

/// Result of `call_procedure`
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub path: ExecutionPath,
    /// Output parameter values; always empty on the mapped path
    pub outputs: OutputValues,
    /// On the mapped path, the rows the handler wrote through its scope
    pub rows_affected: u64,
}

/// Typed rows of a procedure together with its output values
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureRows<T> {
    pub rows: Vec<T>,
    pub outputs: OutputValues,
}

pub struct Repository {
    coordinator: TransactionCoordinator,
    procedures: Arc<ProcedureRegistry>,
}

impl Repository {
    /// Repository without mapped procedures; every call takes the raw path
    pub fn new(context: Arc<dyn OrmContext>) -> Self {
        Self::with_procedures(context, Arc::new(ProcedureRegistry::new()))
    }

    pub fn with_procedures(context: Arc<dyn OrmContext>, procedures: Arc<ProcedureRegistry>) -> Self {
        Self {
            coordinator: TransactionCoordinator::new(context),
            procedures,
        }
    }

    pub fn procedures(&self) -> &ProcedureRegistry {
        &self.procedures
    }

    pub async fn transaction_state(&self) -> TransactionState {
        self.coordinator.state().await
    }

    fn context(&self) -> &dyn OrmContext {
        self.coordinator.context().as_ref()
    }

    fn store(&self) -> &'static str {
        self.context().store_kind()
    }

    /// Stage and flush one entity write inside the ambient transaction
    pub async fn save_object<T: Entity>(
        &self,
        entity: EntityWrapper<T>,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let span = operation_span(self.store(), "save_object", T::TABLE);
        observe(
            span,
            async {
                let (payload, operation) = entity.validate()?;
                let change = StagedChange::of(&payload, operation);

                let mut guard = self.coordinator.acquire(cancel, "save_object").await?;
                let affected = cancellable(cancel, "save_object", async {
                    let unit = guard.ensure_transaction().await?;
                    unit.stage(change);
                    unit.save_changes().await
                })
                .await?;

                debug!(table = T::TABLE, %operation, affected, "Entity change saved");
                Ok(affected)
            },
            |affected| Some(*affected),
        )
        .await
        .map(|_| true)
    }

    /// Run a procedure for its side effects and output values
    pub async fn call_procedure(
        &self,
        procedure: &str,
        args: Vec<Arg>,
        cancel: &CancellationToken,
    ) -> Result<CallOutcome> {
        let span = operation_span(self.store(), "call_procedure", procedure);
        observe(
            span,
            async {
                if procedure.trim().is_empty() {
                    return Err(ConfigError::EmptyProcedureName.into());
                }
                match self.procedures.route(procedure) {
                    Route::Mapped(handler) => {
                        record_path(ExecutionPath::Mapped);
                        check_arity(procedure, handler.as_ref(), &args)?;

                        let mut guard = self.coordinator.acquire(cancel, "call_procedure").await?;
                        let rows_affected = cancellable(cancel, "call_procedure", async {
                            let unit = guard.ensure_transaction().await?;
                            let mut scope =
                                ProcedureScope::transactional(procedure, self.context(), &mut **unit);
                            handler.invoke(&mut scope, &args).await?;
                            Ok(scope.rows_affected())
                        })
                        .await?;

                        Ok(CallOutcome {
                            path: ExecutionPath::Mapped,
                            outputs: OutputValues::default(),
                            rows_affected,
                        })
                    }
                    Route::Raw => {
                        record_path(ExecutionPath::Raw);
                        let call = marshal(procedure, &args)?;
                        let outcome = self.execute_raw(&call, cancel).await?;

                        Ok(CallOutcome {
                            path: ExecutionPath::Raw,
                            outputs: collect_outputs(&call, &outcome),
                            rows_affected: outcome.rows_affected,
                        })
                    }
                }
            },
            |outcome| Some(outcome.rows_affected),
        )
        .await
    }

    /// Run a procedure and map its result rows into `T`
    pub async fn get_data_by_procedure<T: FromRecord>(
        &self,
        procedure: &str,
        args: Vec<Arg>,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>> {
        self.fetch_procedure("get_data_by_procedure", procedure, args, cancel)
            .await
            .map(|result| result.rows)
    }

    /// Like `get_data_by_procedure`, also returning output parameter values
    pub async fn get_data_by_procedure_with_outputs<T: FromRecord>(
        &self,
        procedure: &str,
        args: Vec<Arg>,
        cancel: &CancellationToken,
    ) -> Result<ProcedureRows<T>> {
        self.fetch_procedure("get_data_by_procedure_with_outputs", procedure, args, cancel)
            .await
    }

    async fn fetch_procedure<T: FromRecord>(
        &self,
        operation: &'static str,
        procedure: &str,
        args: Vec<Arg>,
        cancel: &CancellationToken,
    ) -> Result<ProcedureRows<T>> {
        let span = operation_span(self.store(), operation, procedure);
        observe(
            span,
            async {
                if procedure.trim().is_empty() {
                    return Err(ConfigError::EmptyProcedureName.into());
                }
                match self.procedures.route(procedure) {
                    Route::Mapped(handler) => {
                        record_path(ExecutionPath::Mapped);
                        check_arity(procedure, handler.as_ref(), &args)?;

                        let mut scope = ProcedureScope::read_only(procedure, self.context());
                        let returned =
                            cancellable(cancel, operation, handler.invoke(&mut scope, &args))
                                .await?;
                        Ok(ProcedureRows {
                            rows: expect_rows::<T>(procedure, returned)?,
                            outputs: OutputValues::default(),
                        })
                    }
                    Route::Raw => {
                        record_path(ExecutionPath::Raw);
                        let call = marshal(procedure, &args)?;
                        let outcome = self.execute_raw(&call, cancel).await?;
                        let outputs = collect_outputs(&call, &outcome);
                        let rows = match &outcome.rows {
                            Some(rows) => map_rows::<T>(rows)?,
                            None => Vec::new(),
                        };
                        Ok(ProcedureRows { rows, outputs })
                    }
                }
            },
            |result| Some(result.rows.len() as u64),
        )
        .await
    }

    /// Execute a marshalled call on the transaction connection, under the lock.
    /// Provider failures carry the statement text.
    async fn execute_raw(
        &self,
        call: &ProcedureCall,
        cancel: &CancellationToken,
    ) -> Result<ProviderOutcome> {
        record_statement(&call.command_text);
        let mut guard = self.coordinator.acquire(cancel, "call_procedure").await?;

        debug!(
            procedure = %call.procedure,
            statement = %call.command_text,
            parameters = call.parameters.len(),
            "Executing stored procedure"
        );
        let result = cancellable(cancel, "call_procedure", async {
            let unit = guard.ensure_transaction().await?;
            unit.execute_procedure(call).await
        })
        .await;

        result.map_err(|e| match e {
            AppError::Database(_) => AppError::procedure(&call.procedure, &call.command_text, e),
            other => other,
        })
    }

    /// Rows of `T`'s table matching `filter`
    pub async fn simple_select<T: Entity + FromRecord>(
        &self,
        filter: Filter,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>> {
        let span = operation_span(self.store(), "simple_select", T::TABLE);
        observe(
            span,
            async {
                let rows = self.read(T::TABLE, Some(&filter), "simple_select", cancel).await?;
                map_rows::<T>(&rows)
            },
            |rows| Some(rows.len() as u64),
        )
        .await
    }

    pub async fn get_all<T: Entity + FromRecord>(&self, cancel: &CancellationToken) -> Result<Vec<T>> {
        let span = operation_span(self.store(), "get_all", T::TABLE);
        observe(
            span,
            async {
                let rows = self.read(T::TABLE, None, "get_all", cancel).await?;
                map_rows::<T>(&rows)
            },
            |rows| Some(rows.len() as u64),
        )
        .await
    }

    /// Entity by primary key; key values follow `T::KEY` order
    pub async fn get_by_id<T: Entity + FromRecord>(
        &self,
        key: Vec<SqlValue>,
        cancel: &CancellationToken,
    ) -> Result<Option<T>> {
        let span = operation_span(self.store(), "get_by_id", T::TABLE);
        observe(
            span,
            async {
                if key.len() != T::KEY.len() {
                    return Err(ConfigError::KeyArity {
                        entity: T::TABLE.to_string(),
                        expected: T::KEY.len(),
                        actual: key.len(),
                    }
                    .into());
                }
                let mut parts: Vec<Filter> = T::KEY
                    .iter()
                    .zip(key)
                    .map(|(column, value)| Filter::Eq(column.to_string(), value))
                    .collect();
                let filter = if parts.len() == 1 {
                    parts.remove(0)
                } else {
                    Filter::And(parts)
                };

                let rows = self.read(T::TABLE, Some(&filter), "get_by_id", cancel).await?;
                Ok(map_rows::<T>(&rows)?.into_iter().next())
            },
            |found| Some(found.is_some() as u64),
        )
        .await
    }

    async fn read(
        &self,
        table: &str,
        filter: Option<&Filter>,
        operation: &str,
        cancel: &CancellationToken,
    ) -> Result<RowSet> {
        cancellable(cancel, operation, self.context().select(table, filter)).await
    }

    /// Commit the ambient transaction. No-op success when none is active.
    pub async fn commit(&self, cancel: &CancellationToken) -> Result<bool> {
        let span = operation_span(self.store(), "commit", "transaction");
        observe(span, self.coordinator.commit(cancel), |_| None).await
    }

    /// Roll back the ambient transaction. No-op success when none is active.
    pub async fn rollback(&self, cancel: &CancellationToken) -> Result<bool> {
        let span = operation_span(self.store(), "rollback", "transaction");
        observe(span, self.coordinator.rollback(cancel), |_| None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::cancel::cancel_channel;
    use crate::application::field_map::FieldMapBuilder;
    use crate::domain::{Parameter, ScalarKind, Schema, TableArg, ToRecord, WriteOperation};
    use crate::port::orm_context::mocks::{MemoryOrmContext, ScriptedProcedure};
    use crate::port::{MappedProcedure, MappedReturn};
    use async_trait::async_trait;
    use std::time::Duration;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Question {
        question_id: i64,
        text: String,
    }

    impl ToRecord for Question {
        const TYPE_NAME: &'static str = "Question";

        fn columns() -> &'static [&'static str] {
            &["QuestionId", "Text"]
        }

        fn to_record(&self) -> Vec<SqlValue> {
            vec![self.question_id.into(), self.text.clone().into()]
        }
    }

    impl Entity for Question {
        const TABLE: &'static str = "Questions";
        const KEY: &'static [&'static str] = &["QuestionId"];
    }

    impl FromRecord for Question {
        fn describe(map: &mut FieldMapBuilder<Self>) {
            map.required("QuestionId", |q: &mut Self, v| q.question_id = v)
                .required("Text", |q: &mut Self, v| q.text = v);
        }
    }

    struct AnswerLine {
        question_id: i64,
        option_id: i64,
    }

    impl ToRecord for AnswerLine {
        const TYPE_NAME: &'static str = "AnswerLine";

        fn columns() -> &'static [&'static str] {
            &["QuestionId", "OptionId"]
        }

        fn to_record(&self) -> Vec<SqlValue> {
            vec![self.question_id.into(), self.option_id.into()]
        }
    }

    struct TypedGetQuestions;

    #[async_trait]
    impl MappedProcedure for TypedGetQuestions {
        async fn invoke(&self, _scope: &mut ProcedureScope<'_>, _args: &[Arg]) -> Result<MappedReturn> {
            Ok(MappedReturn::rows(vec![Question {
                question_id: 1,
                text: "typed".into(),
            }]))
        }
    }

    /// Typed handler that writes the question named by its only argument
    struct AddQuestion;

    #[async_trait]
    impl MappedProcedure for AddQuestion {
        fn arity(&self) -> Option<usize> {
            Some(1)
        }

        async fn invoke(&self, scope: &mut ProcedureScope<'_>, args: &[Arg]) -> Result<MappedReturn> {
            let text = match args.first() {
                Some(Arg::Value(SqlValue::String(text))) => text.clone(),
                _ => String::new(),
            };
            let question = Question { question_id: 9, text };
            scope.stage(StagedChange::of(&question, WriteOperation::Add))?;
            scope.save_changes().await?;
            Ok(MappedReturn::Completed)
        }
    }

    fn question_rows() -> RowSet {
        RowSet::new(
            Schema::new(["QuestionId", "Text"]),
            vec![
                vec![SqlValue::I64(1), SqlValue::from("Favourite colour?")],
                vec![SqlValue::I64(2), SqlValue::from("Favourite food?")],
            ],
        )
    }

    fn repository(context: &MemoryOrmContext) -> Repository {
        Repository::new(Arc::new(context.clone()))
    }

    #[tokio::test]
    async fn test_save_then_commit_persists_one_change() {
        let context = MemoryOrmContext::new();
        let repo = repository(&context);
        let cancel = CancellationToken::none();

        let saved = repo
            .save_object(
                EntityWrapper::add(Question {
                    question_id: 7,
                    text: "New?".into(),
                }),
                &cancel,
            )
            .await
            .unwrap();
        assert!(saved);
        assert!(context.table("Questions").is_none());

        assert!(repo.commit(&cancel).await.unwrap());
        let table = context.table("Questions").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, "Text"), Some(&SqlValue::from("New?")));
        assert_eq!(repo.transaction_state().await, TransactionState::NoTransaction);
    }

    #[tokio::test]
    async fn test_save_with_none_operation_touches_nothing() {
        let context = MemoryOrmContext::new();
        let repo = repository(&context);

        let err = repo
            .save_object(
                EntityWrapper::new(Some(Question::default()), WriteOperation::None),
                &CancellationToken::none(),
            )
            .await
            .unwrap_err();

        assert!(err.is_config());
        assert_eq!(context.begin_count(), 0);
        assert_eq!(repo.transaction_state().await, TransactionState::NoTransaction);
    }

    #[tokio::test]
    async fn test_rollback_discards_changes() {
        let context = MemoryOrmContext::new().with_table("Questions", question_rows());
        let repo = repository(&context);
        let cancel = CancellationToken::none();

        repo.save_object(
            EntityWrapper::remove(Question {
                question_id: 1,
                text: String::new(),
            }),
            &cancel,
        )
        .await
        .unwrap();
        repo.rollback(&cancel).await.unwrap();

        assert_eq!(context.table("Questions").unwrap().len(), 2);
        assert_eq!(context.close_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_saves_do_not_interleave() {
        let context = MemoryOrmContext::new().with_write_delay(Duration::from_millis(30));
        let repo = Arc::new(repository(&context));

        let tasks: Vec<_> = (0..2)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.save_object(
                        EntityWrapper::add(Question {
                            question_id: i,
                            text: format!("q{}", i),
                        }),
                        &CancellationToken::none(),
                    )
                    .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(
            context.events(),
            vec!["begin", "save:start", "save:end", "save:start", "save:end"]
        );
        assert_eq!(context.begin_count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_in_flight_leaves_transaction_open() {
        let context = MemoryOrmContext::new().with_write_delay(Duration::from_secs(30));
        let repo = Arc::new(repository(&context));
        let (handle, token) = cancel_channel();

        let task = {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.save_object(EntityWrapper::add(Question::default()), &token)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();

        assert!(task.await.unwrap().unwrap_err().is_cancelled());
        assert_eq!(repo.transaction_state().await, TransactionState::TransactionActive);
        assert!(repo.rollback(&CancellationToken::none()).await.unwrap());
    }

    #[tokio::test]
    async fn test_raw_call_returns_output_values() {
        let context = MemoryOrmContext::new().with_procedure(
            "Proc_SaveAnswer",
            ScriptedProcedure::default()
                .with_output("parameter1", SqlValue::I32(55))
                .with_output("parameter2", SqlValue::Null),
        );
        let repo = repository(&context);

        let outcome = repo
            .call_procedure(
                "Proc_SaveAnswer",
                vec![
                    Arg::from(3),
                    Arg::from(Parameter::output(ScalarKind::I32)),
                    Arg::from(Parameter::output_sized(ScalarKind::String, 100)),
                ],
                &CancellationToken::none(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.path, ExecutionPath::Raw);
        assert_eq!(outcome.outputs.get(1), Some(&SqlValue::I32(55)));
        assert_eq!(outcome.outputs.get(2), None);
        assert_eq!(
            context.statements(),
            vec!["Proc_SaveAnswer @parameter0, @parameter1 out, @parameter2 out"]
        );
        assert_eq!(repo.transaction_state().await, TransactionState::TransactionActive);
    }

    #[tokio::test]
    async fn test_raw_failure_carries_statement() {
        let context = MemoryOrmContext::new()
            .with_procedure("Proc_Fail", ScriptedProcedure::failing("constraint violated"));
        let repo = repository(&context);

        let err = repo
            .call_procedure("Proc_Fail", vec![Arg::from("x")], &CancellationToken::none())
            .await
            .unwrap_err();

        match err {
            AppError::Procedure {
                statement, message, ..
            } => {
                assert_eq!(statement, "Proc_Fail @parameter0");
                assert_eq!(message, "constraint violated");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_argument_fails_before_provider() {
        let context = MemoryOrmContext::new();
        let repo = repository(&context);

        let err = repo
            .call_procedure("P", vec![Arg::from(vec![0u8])], &CancellationToken::none())
            .await
            .unwrap_err();

        assert!(err.is_config());
        assert!(context.statements().is_empty());
        assert_eq!(context.begin_count(), 0);
    }

    #[tokio::test]
    async fn test_get_questions_falls_back_to_raw_path() {
        let context = MemoryOrmContext::new()
            .with_procedure("Proc_GetQuestions", ScriptedProcedure::returning(question_rows()));
        let repo = repository(&context);

        let questions: Vec<Question> = repo
            .get_data_by_procedure("Proc_GetQuestions", vec![], &CancellationToken::none())
            .await
            .unwrap();

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1].text, "Favourite food?");
        assert_eq!(context.statements(), vec!["Proc_GetQuestions"]);
    }

    #[tokio::test]
    async fn test_get_questions_uses_mapped_handler() {
        let context = MemoryOrmContext::new()
            .with_procedure("Proc_GetQuestions", ScriptedProcedure::returning(question_rows()));
        let registry = ProcedureRegistry::new().register("Proc_GetQuestions", TypedGetQuestions);
        let repo = Repository::with_procedures(Arc::new(context.clone()), Arc::new(registry));
        let cancel = CancellationToken::none();

        let questions: Vec<Question> = repo
            .get_data_by_procedure("Proc_GetQuestions", vec![], &cancel)
            .await
            .unwrap();
        assert_eq!(questions[0].text, "typed");

        let outcome = repo
            .call_procedure("Proc_GetQuestions", vec![], &cancel)
            .await
            .unwrap();
        assert_eq!(outcome.path, ExecutionPath::Mapped);

        assert!(context.statements().is_empty());
        // Only the write path joins a transaction
        assert_eq!(context.begin_count(), 1);
    }

    #[tokio::test]
    async fn test_mapped_write_joins_ambient_transaction() {
        let context = MemoryOrmContext::new();
        let registry = ProcedureRegistry::new().register("Proc_AddQuestion", AddQuestion);
        let repo = Repository::with_procedures(Arc::new(context.clone()), Arc::new(registry));
        let cancel = CancellationToken::none();

        let outcome = repo
            .call_procedure("Proc_AddQuestion", vec![Arg::from("Kept?")], &cancel)
            .await
            .unwrap();
        assert_eq!(outcome.path, ExecutionPath::Mapped);
        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(repo.transaction_state().await, TransactionState::TransactionActive);
        assert!(context.table("Questions").is_none());

        assert!(repo.commit(&cancel).await.unwrap());
        let table = context.table("Questions").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, "Text"), Some(&SqlValue::from("Kept?")));

        repo.call_procedure("Proc_AddQuestion", vec![Arg::from("Dropped?")], &cancel)
            .await
            .unwrap();
        assert!(repo.rollback(&cancel).await.unwrap());
        assert_eq!(context.table("Questions").unwrap().len(), 1);
        assert_eq!(context.begin_count(), 2);
        assert_eq!(
            context.events(),
            vec![
                "begin", "save:start", "save:end", "commit", "close", "begin", "save:start",
                "save:end", "rollback", "close",
            ]
        );
    }

    #[tokio::test]
    async fn test_mapped_write_on_read_path_is_rejected() {
        let context = MemoryOrmContext::new();
        let registry = ProcedureRegistry::new().register("Proc_AddQuestion", AddQuestion);
        let repo = Repository::with_procedures(Arc::new(context.clone()), Arc::new(registry));

        let err = repo
            .get_data_by_procedure::<Question>(
                "Proc_AddQuestion",
                vec![Arg::from("Read only?")],
                &CancellationToken::none(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Config(ConfigError::ReadOnlyProcedure(ref name)) if name == "Proc_AddQuestion"
        ));
        assert_eq!(context.begin_count(), 0);
    }

    #[tokio::test]
    async fn test_mapped_row_type_mismatch_is_not_retried_raw() {
        #[derive(Default)]
        struct Other {
            n: i64,
        }

        impl FromRecord for Other {
            fn describe(map: &mut FieldMapBuilder<Self>) {
                map.required("N", |o: &mut Self, v| o.n = v);
            }
        }

        let context = MemoryOrmContext::new()
            .with_procedure("Proc_GetQuestions", ScriptedProcedure::returning(question_rows()));
        let registry = ProcedureRegistry::new().register("Proc_GetQuestions", TypedGetQuestions);
        let repo = Repository::with_procedures(Arc::new(context.clone()), Arc::new(registry));

        let err = repo
            .get_data_by_procedure::<Other>("Proc_GetQuestions", vec![], &CancellationToken::none())
            .await
            .err()
            .unwrap();

        assert!(matches!(
            err,
            AppError::Config(ConfigError::SignatureMismatch { .. })
        ));
        assert!(context.statements().is_empty());
    }

    #[tokio::test]
    async fn test_record_list_is_one_table_parameter() {
        let context = MemoryOrmContext::new()
            .with_procedure("Proc_SaveAnswers", ScriptedProcedure::default());
        let repo = repository(&context);
        let lines = vec![
            AnswerLine { question_id: 1, option_id: 2 },
            AnswerLine { question_id: 2, option_id: 5 },
        ];

        repo.call_procedure(
            "Proc_SaveAnswers",
            vec![Arg::from(7i64), Arg::from(TableArg::from_records(&lines))],
            &CancellationToken::none(),
        )
        .await
        .unwrap();

        let calls = context.calls();
        assert_eq!(calls[0].parameters.len(), 2);
        assert_eq!(calls[0].parameters[1].type_name.as_deref(), Some("AnswerLine"));
        assert_eq!(calls[0].command_text, "Proc_SaveAnswers @parameter0, @parameter1");
    }

    #[tokio::test]
    async fn test_reads_bypass_transaction() {
        let context = MemoryOrmContext::new().with_table("Questions", question_rows());
        let repo = repository(&context);
        let cancel = CancellationToken::none();

        let all: Vec<Question> = repo.get_all(&cancel).await.unwrap();
        assert_eq!(all.len(), 2);

        let food: Vec<Question> = repo
            .simple_select(Filter::eq("Text", "Favourite food?"), &cancel)
            .await
            .unwrap();
        assert_eq!(food[0].question_id, 2);

        let one: Option<Question> = repo.get_by_id(vec![SqlValue::I64(1)], &cancel).await.unwrap();
        assert_eq!(one.unwrap().text, "Favourite colour?");

        let none: Option<Question> = repo.get_by_id(vec![SqlValue::I64(9)], &cancel).await.unwrap();
        assert!(none.is_none());

        assert_eq!(context.begin_count(), 0);
    }

    #[tokio::test]
    async fn test_get_by_id_key_arity() {
        let context = MemoryOrmContext::new().with_table("Questions", question_rows());
        let repo = repository(&context);

        let err = repo
            .get_by_id::<Question>(vec![SqlValue::I64(1), SqlValue::I64(2)], &CancellationToken::none())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Config(ConfigError::KeyArity { expected: 1, actual: 2, .. })
        ));
    }
}
