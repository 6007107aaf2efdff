// Provider-level call and change descriptions

use super::entity::{Entity, WriteOperation};
use super::parameter::Direction;
use super::record::{RowSet, TableArg, ToRecord};
use super::type_map::ProviderType;
use super::value::SqlValue;
use std::collections::HashMap;

/// Value carried by a bound parameter
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Scalar(SqlValue),
    Table(TableArg),
}

/// One positional parameter of a marshalled call
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParameter {
    /// Placeholder name without the `@` prefix, e.g. `parameter0`
    pub name: String,
    pub provider_type: Option<ProviderType>,
    pub direction: Direction,
    pub size: Option<u32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
    /// Declared table type for table-valued parameters
    pub type_name: Option<String>,
    pub value: BoundValue,
}

impl BoundParameter {
    pub fn placeholder(&self) -> String {
        format!("@{}", self.name)
    }

    pub fn is_table(&self) -> bool {
        matches!(self.value, BoundValue::Table(_))
    }
}

/// Side-table entry for an output-capable parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSlot {
    pub position: usize,
    pub name: String,
}

/// Fully marshalled stored-procedure call
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureCall {
    pub procedure: String,
    /// `Name @parameter0, @parameter1 out`
    pub command_text: String,
    pub parameters: Vec<BoundParameter>,
    pub outputs: Vec<OutputSlot>,
}

/// What the provider hands back after executing a call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderOutcome {
    pub rows: Option<RowSet>,
    /// Output values keyed by placeholder name (`parameter1`)
    pub outputs: HashMap<String, SqlValue>,
    pub rows_affected: u64,
}

/// Output values of a completed raw call, in argument order.
/// Provider null is reported as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputValues {
    entries: Vec<(OutputSlot, Option<SqlValue>)>,
}

impl OutputValues {
    pub fn new(entries: Vec<(OutputSlot, Option<SqlValue>)>) -> Self {
        Self { entries }
    }

    /// Value of the output argument at `position` in the original argument list
    pub fn get(&self, position: usize) -> Option<&SqlValue> {
        self.entries
            .iter()
            .find(|(slot, _)| slot.position == position)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn by_name(&self, name: &str) -> Option<&SqlValue> {
        let name = name.trim_start_matches('@');
        self.entries
            .iter()
            .find(|(slot, _)| slot.name == name)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OutputSlot, Option<&SqlValue>)> {
        self.entries.iter().map(|(slot, v)| (slot, v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A tracked entity write waiting for `save_changes`
#[derive(Debug, Clone, PartialEq)]
pub struct StagedChange {
    pub table: String,
    pub operation: WriteOperation,
    pub columns: Vec<String>,
    pub values: Vec<SqlValue>,
    pub key: Vec<String>,
    pub identity: Option<String>,
}

impl StagedChange {
    pub fn of<T: Entity>(entity: &T, operation: WriteOperation) -> Self {
        Self {
            table: T::TABLE.to_string(),
            operation,
            columns: T::columns().iter().map(|c| c.to_string()).collect(),
            values: entity.to_record(),
            key: T::KEY.iter().map(|c| c.to_string()).collect(),
            identity: T::IDENTITY.map(str::to_string),
        }
    }

    /// Value of a column in this change
    pub fn value(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Column/value pairs written by an insert; the identity column is skipped
    pub fn insert_pairs(&self) -> Vec<(&str, &SqlValue)> {
        self.pairs()
            .filter(|(c, _)| Some(*c) != self.identity.as_deref())
            .collect()
    }

    /// Non-key column/value pairs written by an update
    pub fn update_pairs(&self) -> Vec<(&str, &SqlValue)> {
        self.pairs()
            .filter(|(c, _)| !self.key.iter().any(|k| k == c))
            .collect()
    }

    pub fn key_pairs(&self) -> Vec<(&str, &SqlValue)> {
        self.key
            .iter()
            .filter_map(|k| self.value(k).map(|v| (k.as_str(), v)))
            .collect()
    }

    fn pairs(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }
}
