// Entity Wrapper: payload paired with the intended write

use super::error::{ConfigError, Result};
use super::record::ToRecord;
use std::fmt;

/// Intended write for an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOperation {
    None,
    Add,
    Modify,
    Remove,
}

impl fmt::Display for WriteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WriteOperation::None => "NONE",
            WriteOperation::Add => "ADD",
            WriteOperation::Modify => "MODIFY",
            WriteOperation::Remove => "REMOVE",
        };
        f.write_str(s)
    }
}

/// A persisted table row type.
///
/// `KEY` lists the primary-key columns in declaration order; `get_by_id`
/// expects key values in the same order. When `IDENTITY` is set, that column
/// is generated by the store and left out of inserts.
pub trait Entity: ToRecord + Send + Sync + 'static {
    const TABLE: &'static str;
    const KEY: &'static [&'static str];
    const IDENTITY: Option<&'static str> = None;
}

/// Payload submitted for one write. Consumed by `save_object`.
#[derive(Debug, Clone)]
pub struct EntityWrapper<T> {
    payload: Option<T>,
    operation: WriteOperation,
}

impl<T> EntityWrapper<T> {
    pub fn new(payload: Option<T>, operation: WriteOperation) -> Self {
        Self { payload, operation }
    }

    pub fn add(payload: T) -> Self {
        Self::new(Some(payload), WriteOperation::Add)
    }

    pub fn modify(payload: T) -> Self {
        Self::new(Some(payload), WriteOperation::Modify)
    }

    pub fn remove(payload: T) -> Self {
        Self::new(Some(payload), WriteOperation::Remove)
    }

    pub fn operation(&self) -> WriteOperation {
        self.operation
    }

    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }
}

impl<T: Entity> EntityWrapper<T> {
    /// Checks the write state and hands out the payload
    pub fn validate(self) -> Result<(T, WriteOperation)> {
        if self.operation == WriteOperation::None {
            return Err(ConfigError::MissingWriteOperation(T::TABLE.to_string()));
        }
        match self.payload {
            Some(payload) => Ok((payload, self.operation)),
            None => Err(ConfigError::NullPayload(T::TABLE.to_string())),
        }
    }
}
