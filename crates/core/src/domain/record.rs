// Tabular data: row schemas, row sets and table-valued arguments

use super::value::SqlValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Column layout of a result set.
///
/// The column-name -> ordinal lookup is computed once per schema instance and
/// shared by every row that uses it. On duplicate names the first column wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<String>,
    ordinals: HashMap<String, usize>,
}

impl Schema {
    pub fn new<I, S>(columns: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut ordinals = HashMap::with_capacity(columns.len());
        for (ordinal, name) in columns.iter().enumerate() {
            ordinals.entry(name.clone()).or_insert(ordinal);
        }
        Arc::new(Self { columns, ordinals })
    }

    /// Case-sensitive ordinal lookup
    pub fn ordinal(&self, column: &str) -> Option<usize> {
        self.ordinals.get(column).copied()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Ordered rows sharing one schema
#[derive(Debug, Clone, PartialEq)]
pub struct RowSet {
    schema: Arc<Schema>,
    rows: Vec<Vec<SqlValue>>,
}

impl RowSet {
    pub fn new(schema: Arc<Schema>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self { schema, rows }
    }

    pub fn empty() -> Self {
        Self::new(Schema::new(Vec::<String>::new()), Vec::new())
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<SqlValue>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<SqlValue>> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell by row index and column name
    pub fn value(&self, row: usize, column: &str) -> Option<&SqlValue> {
        let ordinal = self.schema.ordinal(column)?;
        self.rows.get(row)?.get(ordinal)
    }
}

/// Projection of a structured value into named columns.
///
/// Used for table-valued arguments (the type name becomes the provider's
/// declared table type) and for entity writes.
pub trait ToRecord {
    const TYPE_NAME: &'static str;

    fn columns() -> &'static [&'static str];

    /// Values aligned with `columns()`
    fn to_record(&self) -> Vec<SqlValue>;
}

/// A single structured value with its column names
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub type_name: String,
    pub columns: Vec<String>,
    pub values: Vec<SqlValue>,
}

impl Record {
    pub fn of<T: ToRecord>(item: &T) -> Self {
        Self {
            type_name: T::TYPE_NAME.to_string(),
            columns: T::columns().iter().map(|c| c.to_string()).collect(),
            values: item.to_record(),
        }
    }
}

/// Sequence of records sent as one table-valued parameter
#[derive(Debug, Clone, PartialEq)]
pub struct TableArg {
    type_name: String,
    schema: Arc<Schema>,
    rows: Vec<Vec<SqlValue>>,
}

impl TableArg {
    /// Rows keep the original sequence order
    pub fn from_records<T: ToRecord>(items: &[T]) -> Self {
        Self {
            type_name: T::TYPE_NAME.to_string(),
            schema: Schema::new(T::columns().iter().copied()),
            rows: items.iter().map(ToRecord::to_record).collect(),
        }
    }

    pub fn new(type_name: impl Into<String>, schema: Arc<Schema>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            type_name: type_name.into(),
            schema,
            rows,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<SqlValue>] {
        &self.rows
    }
}
