// Parameter Wrapper: typed call argument with direction and size

use super::value::{ScalarKind, SqlValue};
use std::fmt;

/// Parameter direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
    InputOutput,
    ReturnValue,
}

impl Direction {
    /// Whether the provider produces a value for this parameter
    pub fn is_output_capable(&self) -> bool {
        !matches!(self, Direction::Input)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Input => "INPUT",
            Direction::Output => "OUTPUT",
            Direction::InputOutput => "INPUT_OUTPUT",
            Direction::ReturnValue => "RETURN_VALUE",
        };
        f.write_str(s)
    }
}

/// Generic call argument. Kind, direction and size are fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    kind: ScalarKind,
    direction: Direction,
    size: Option<u32>,
    value: SqlValue,
}

impl Parameter {
    /// Input parameter; the kind is taken from the value.
    /// A null input needs an explicit kind, see [`Parameter::typed_input`].
    pub fn input(value: impl Into<SqlValue>) -> Option<Self> {
        let value = value.into();
        let kind = value.kind()?;
        Some(Self {
            kind,
            direction: Direction::Input,
            size: None,
            value,
        })
    }

    pub fn typed_input(kind: ScalarKind, value: impl Into<SqlValue>) -> Self {
        Self {
            kind,
            direction: Direction::Input,
            size: None,
            value: value.into(),
        }
    }

    pub fn output(kind: ScalarKind) -> Self {
        Self {
            kind,
            direction: Direction::Output,
            size: None,
            value: SqlValue::Null,
        }
    }

    /// Output parameter with a declared size (strings, binaries)
    pub fn output_sized(kind: ScalarKind, size: u32) -> Self {
        Self {
            size: Some(size),
            ..Self::output(kind)
        }
    }

    pub fn input_output(kind: ScalarKind, value: impl Into<SqlValue>, size: Option<u32>) -> Self {
        Self {
            kind,
            direction: Direction::InputOutput,
            size,
            value: value.into(),
        }
    }

    pub fn return_value(kind: ScalarKind) -> Self {
        Self {
            kind,
            direction: Direction::ReturnValue,
            size: None,
            value: SqlValue::Null,
        }
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn size(&self) -> Option<u32> {
        self.size
    }

    pub fn value(&self) -> &SqlValue {
        &self.value
    }
}
