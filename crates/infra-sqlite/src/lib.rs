// Stinger Infrastructure - SQLite Adapter
// Implements: OrmContext, UnitOfWork; stored procedures via ProcedureCatalog

mod binding;
mod catalog;
mod connection;
mod context;
mod error;
mod sql;
mod unit_of_work;

pub use catalog::{NamedProcedure, ProcedureCatalog, ProcedureDefinition};
pub use connection::{connect_options, create_pool, PoolSettings};
pub use context::SqliteOrmContext;
pub use unit_of_work::SqliteUnitOfWork;

