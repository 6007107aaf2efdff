// Domain Layer - Pure data-access types

pub mod args;
pub mod call;
pub mod entity;
pub mod error;
pub mod filter;
pub mod parameter;
pub mod record;
pub mod type_map;
pub mod value;

// Re-exports
pub use args::Arg;
pub use call::{
    BoundParameter, BoundValue, OutputSlot, OutputValues, ProcedureCall, ProviderOutcome,
    StagedChange,
};
pub use entity::{Entity, EntityWrapper, WriteOperation};
pub use error::{ConfigError, ConversionError};
pub use filter::Filter;
pub use parameter::{Direction, Parameter};
pub use record::{Record, RowSet, Schema, TableArg, ToRecord};
pub use type_map::{provider_type_of, ProviderType, TYPE_MAP};
pub use value::{ScalarKind, SqlValue};
