// Instrumentation: one span per public repository operation
//
// Observational only. The wrapped future's result is returned as is.

use super::dispatcher::ExecutionPath;
use crate::error::Result;
use std::future::Future;
use tracing::field::Empty;
use tracing::{error, info_span, Instrument, Span};

/// Open the span of one repository operation.
///
/// `name` is the affected table or procedure.
pub fn operation_span(store: &'static str, operation: &'static str, name: &str) -> Span {
    let otel_name = format!("db.{}", operation);
    info_span!(
        "db.operation",
        otel.name = %otel_name,
        db.system = store,
        db.operation = operation,
        db.name = %name,
        db.rows_affected = Empty,
        db.execution_type = Empty,
        db.statement = Empty,
        otel.status_code = Empty,
        error = Empty
    )
}

/// Record the executed statement text on the current operation span
pub fn record_statement(statement: &str) {
    Span::current().record("db.statement", statement);
}

/// Record the chosen dispatch path on the current operation span
pub fn record_path(path: ExecutionPath) {
    Span::current().record("db.execution_type", path.as_str());
}

/// Run `future` inside `span` and record its outcome
pub async fn observe<T, F, A>(span: Span, future: F, affected: A) -> Result<T>
where
    F: Future<Output = Result<T>>,
    A: FnOnce(&T) -> Option<u64>,
{
    let result = future.instrument(span.clone()).await;
    match &result {
        Ok(value) => {
            if let Some(rows) = affected(value) {
                span.record("db.rows_affected", rows);
            }
            span.record("otel.status_code", "OK");
        }
        Err(e) => {
            span.record("otel.status_code", "ERROR");
            span.record("error", tracing::field::display(e));
            span.in_scope(|| error!(error = %e, "Data access operation failed"));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id, Record};
    use tracing::subscriber::DefaultGuard;
    use tracing::Subscriber;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Collects every span field value by name
    #[derive(Clone, Default)]
    struct SpanFields(Arc<Mutex<HashMap<String, String>>>);

    impl SpanFields {
        fn install() -> (Self, DefaultGuard) {
            let fields = Self::default();
            let subscriber = tracing_subscriber::registry().with(fields.clone());
            (fields, tracing::subscriber::set_default(subscriber))
        }

        fn get(&self, name: &str) -> Option<String> {
            self.0.lock().unwrap().get(name).cloned()
        }
    }

    impl Visit for SpanFields {
        fn record_str(&mut self, field: &Field, value: &str) {
            self.0.lock().unwrap().insert(field.name().to_string(), value.to_string());
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.lock().unwrap().insert(field.name().to_string(), format!("{:?}", value));
        }
    }

    impl<S: Subscriber> Layer<S> for SpanFields {
        fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
            attrs.record(&mut self.clone());
        }

        fn on_record(&self, _id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
            values.record(&mut self.clone());
        }
    }

    #[tokio::test]
    async fn test_observe_returns_success_unchanged() {
        let span = operation_span("memory", "get_all", "Questions");
        let result = observe(span, async { Ok(vec![1, 2, 3]) }, |v: &Vec<i32>| {
            Some(v.len() as u64)
        })
        .await;
        assert_eq!(result.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_observe_returns_error_unchanged() {
        let span = operation_span("memory", "call_procedure", "Proc_SaveAnswer");
        let result: Result<bool> = observe(
            span,
            async {
                record_statement("Proc_SaveAnswer @parameter0");
                record_path(ExecutionPath::Raw);
                Err(AppError::Database("locked".to_string()))
            },
            |_| None,
        )
        .await;
        assert!(matches!(result, Err(AppError::Database(ref m)) if m == "locked"));
    }

    #[tokio::test]
    async fn test_span_records_statement_path_and_rows() {
        let (fields, _default) = SpanFields::install();

        let span = operation_span("memory", "call_procedure", "Proc_SaveAnswer");
        let result = observe(
            span,
            async {
                record_statement("Proc_SaveAnswer @parameter0, @parameter1 out");
                record_path(ExecutionPath::Raw);
                Ok(2u64)
            },
            |rows| Some(*rows),
        )
        .await;
        assert_eq!(result.unwrap(), 2);

        assert_eq!(fields.get("otel.name").as_deref(), Some("db.call_procedure"));
        assert_eq!(fields.get("db.system").as_deref(), Some("memory"));
        assert_eq!(fields.get("db.operation").as_deref(), Some("call_procedure"));
        assert_eq!(fields.get("db.name").as_deref(), Some("Proc_SaveAnswer"));
        assert_eq!(
            fields.get("db.statement").as_deref(),
            Some("Proc_SaveAnswer @parameter0, @parameter1 out")
        );
        assert_eq!(fields.get("db.execution_type").as_deref(), Some("raw"));
        assert_eq!(fields.get("db.rows_affected").as_deref(), Some("2"));
        assert_eq!(fields.get("otel.status_code").as_deref(), Some("OK"));
        assert_eq!(fields.get("error"), None);
    }

    #[tokio::test]
    async fn test_span_records_failure() {
        let (fields, _default) = SpanFields::install();

        let span = operation_span("memory", "get_data_by_procedure", "Proc_GetQuestions");
        let result: Result<Vec<i32>> = observe(
            span,
            async {
                record_path(ExecutionPath::Mapped);
                Err(AppError::Database("locked".to_string()))
            },
            |rows: &Vec<i32>| Some(rows.len() as u64),
        )
        .await;
        assert!(result.is_err());

        assert_eq!(fields.get("db.execution_type").as_deref(), Some("mapped"));
        assert_eq!(fields.get("otel.status_code").as_deref(), Some("ERROR"));
        assert_eq!(fields.get("error").as_deref(), Some("Database error: locked"));
        assert_eq!(fields.get("db.rows_affected"), None);
        assert_eq!(fields.get("db.statement"), None);
    }
}
