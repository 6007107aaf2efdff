// Result Mapper
//
// Decodes row sets into typed values. Field-to-column binding is resolved
// once per row set; cells that fail to convert are logged and skipped.

use super::field_map::{field_map, FieldMap, FromRecord};
use crate::domain::{RowSet, Schema, SqlValue};
use crate::error::Result;
use rayon::prelude::*;
use tracing::{debug, warn};

/// Row counts above this are mapped in parallel partitions
pub const PARALLEL_THRESHOLD: usize = 100;

/// (field index, column ordinal) pairs for one schema
struct Binding {
    pairs: Vec<(usize, usize)>,
}

impl Binding {
    fn resolve<T>(map: &FieldMap<T>, schema: &Schema) -> Self {
        let pairs = map
            .fields()
            .iter()
            .enumerate()
            .filter_map(|(i, f)| schema.ordinal(f.name()).map(|ordinal| (i, ordinal)))
            .collect();
        Self { pairs }
    }
}

/// Map every row of `rows` into `T`, preserving row order
pub fn map_rows<T: FromRecord>(rows: &RowSet) -> Result<Vec<T>> {
    let map = field_map::<T>()?;
    let binding = Binding::resolve(&map, rows.schema());
    let data = rows.rows();

    if data.len() > PARALLEL_THRESHOLD {
        let threads = rayon::current_num_threads().max(1);
        let chunk = data.len().div_ceil(threads).max(1);
        debug!(
            target_type = map.target(),
            rows = data.len(),
            chunk,
            "Mapping rows in parallel"
        );
        let parts: Vec<Vec<T>> = data
            .par_chunks(chunk)
            .map(|part| part.iter().map(|row| map_row(&map, &binding, row)).collect())
            .collect();
        Ok(parts.into_iter().flatten().collect())
    } else {
        Ok(data.iter().map(|row| map_row(&map, &binding, row)).collect())
    }
}

fn map_row<T: FromRecord>(map: &FieldMap<T>, binding: &Binding, row: &[SqlValue]) -> T {
    let mut item = T::default();
    for &(field_index, ordinal) in &binding.pairs {
        let field = &map.fields()[field_index];
        let Some(cell) = row.get(ordinal) else {
            continue;
        };
        if let Err(e) = field.set(&mut item, cell) {
            warn!(
                target_type = map.target(),
                field = field.name(),
                error = %e,
                "Column value could not be converted; field left unset"
            );
        }
    }
    item
}
