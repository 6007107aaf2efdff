// Port Layer - Interfaces for external dependencies

pub mod orm_context;
pub mod procedure;
pub mod transaction;

// Re-exports
pub use orm_context::OrmContext;
pub use procedure::{MappedProcedure, MappedReturn, ProcedureScope};
pub use transaction::{IsolationLevel, Transaction, UnitOfWork};
