// Field mapping descriptors and their process-wide cache

use super::convert::{parse_text, FromSql};
use crate::domain::{ConfigError, ConversionError, SqlValue};
use crate::error::{AppError, Result};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

type Setter<T> =
    Arc<dyn Fn(&mut T, &SqlValue) -> std::result::Result<(), ConversionError> + Send + Sync>;

/// A row type that can be filled from named columns.
///
/// `describe` runs once per type for the life of the process.
pub trait FromRecord: Default + Send + Sync + 'static {
    fn describe(map: &mut FieldMapBuilder<Self>);
}

fn setter<T, F>(f: F) -> Setter<T>
where
    F: Fn(&mut T, &SqlValue) -> std::result::Result<(), ConversionError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// One settable field
pub struct Field<T> {
    name: &'static str,
    setter: Setter<T>,
}

impl<T> Field<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Assign a cell. Provider null sets the field's null or default value.
    pub fn set(&self, target: &mut T, cell: &SqlValue) -> std::result::Result<(), ConversionError> {
        (self.setter)(target, cell)
    }
}

/// Immutable accessor table of a row type, keyed by case-sensitive field name
pub struct FieldMap<T> {
    target: &'static str,
    fields: Vec<Field<T>>,
}

impl<T> FieldMap<T> {
    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn fields(&self) -> &[Field<T>] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Collects the field declarations of a [`FromRecord`] type
pub struct FieldMapBuilder<T> {
    fields: Vec<Field<T>>,
    duplicate: Option<&'static str>,
}

impl<T: 'static> FieldMapBuilder<T> {
    fn new() -> Self {
        Self {
            fields: Vec::new(),
            duplicate: None,
        }
    }

    fn push(&mut self, name: &'static str, setter: Setter<T>) -> &mut Self {
        if self.duplicate.is_none() && self.fields.iter().any(|f| f.name == name) {
            self.duplicate = Some(name);
        }
        self.fields.push(Field { name, setter });
        self
    }

    /// Non-nullable field; provider null assigns `V::default()`
    pub fn required<V, F>(&mut self, name: &'static str, set: F) -> &mut Self
    where
        V: FromSql + Default,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.push(
            name,
            setter(move |target, cell| {
                let value = if cell.is_null() {
                    V::default()
                } else {
                    V::from_sql(cell)?
                };
                set(target, value);
                Ok(())
            }),
        )
    }

    /// Nullable field; provider null assigns `None`
    pub fn optional<V, F>(&mut self, name: &'static str, set: F) -> &mut Self
    where
        V: FromSql,
        F: Fn(&mut T, Option<V>) + Send + Sync + 'static,
    {
        self.push(
            name,
            setter(move |target, cell| {
                let value = if cell.is_null() {
                    None
                } else {
                    Some(V::from_sql(cell)?)
                };
                set(target, value);
                Ok(())
            }),
        )
    }

    /// Any other field type, converted from the cell's textual form
    pub fn parsed<V, F>(&mut self, name: &'static str, set: F) -> &mut Self
    where
        V: FromStr + Default,
        V::Err: Display,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.push(
            name,
            setter(move |target, cell| {
                let value = if cell.is_null() {
                    V::default()
                } else {
                    parse_text::<V>(cell)?
                };
                set(target, value);
                Ok(())
            }),
        )
    }

    fn build(self, target: &'static str) -> std::result::Result<FieldMap<T>, ConfigError> {
        if let Some(field) = self.duplicate {
            return Err(ConfigError::DuplicateField {
                target: target.to_string(),
                field: field.to_string(),
            });
        }
        Ok(FieldMap {
            target,
            fields: self.fields,
        })
    }
}

static FIELD_MAPS: Lazy<DashMap<TypeId, Arc<dyn Any + Send + Sync>>> = Lazy::new(DashMap::new);

/// Cached field map of `T`, built on first use
pub fn field_map<T: FromRecord>() -> Result<Arc<FieldMap<T>>> {
    let id = TypeId::of::<T>();

    let cached = match FIELD_MAPS.get(&id) {
        Some(entry) => entry.value().clone(),
        None => FIELD_MAPS
            .entry(id)
            .or_try_insert_with(|| {
                let target = std::any::type_name::<T>();
                let mut builder = FieldMapBuilder::new();
                T::describe(&mut builder);
                let map = builder.build(target)?;
                debug!(target_type = target, fields = map.len(), "Built field map");
                Ok::<_, ConfigError>(Arc::new(map) as Arc<dyn Any + Send + Sync>)
            })?
            .value()
            .clone(),
    };

    cached
        .downcast::<FieldMap<T>>()
        .map_err(|_| {
            AppError::Internal(format!(
                "field map cache holds a foreign entry for {}",
                std::any::type_name::<T>()
            ))
        })
}

/// Build and validate the field map of `T` ahead of first use
pub fn register<T: FromRecord>() -> Result<()> {
    field_map::<T>().map(|_| ())
}
