// Application Layer - Data-access services

pub mod cancel;
pub mod convert;
pub mod coordinator;
pub mod dispatcher;
pub mod field_map;
pub mod instrumentation;
pub mod mapper;
pub mod marshaller;
pub mod repository;

// Re-exports
pub use cancel::{cancel_channel, CancelHandle, CancellationToken};
pub use convert::FromSql;
pub use coordinator::{TransactionCoordinator, TransactionState};
pub use dispatcher::{ExecutionPath, ProcedureRegistry};
pub use field_map::{register, FieldMapBuilder, FromRecord};
pub use mapper::{map_rows, PARALLEL_THRESHOLD};
pub use marshaller::{collect_outputs, marshal};
pub use repository::{CallOutcome, ProcedureRows, Repository};
