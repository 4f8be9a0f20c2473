//! Column alignment against a trained model's manifest.

use crate::common::error::{TitanicError, TitanicResult};
use crate::data::domain::{Column, ColumnData, Table};

use super::domain::ColumnManifest;

/// Reindex `table` to exactly the manifest's columns, in manifest order.
/// Manifest columns the table lacks are filled with zeros; table columns the
/// manifest does not name are discarded. A manifest naming a column twice
/// cannot be satisfied and is rejected.
pub fn align_columns(table: &Table, manifest: &ColumnManifest) -> TitanicResult<Table> {
    if let Some(name) = manifest.first_duplicate() {
        return Err(TitanicError::invalid(format!(
            "column manifest lists `{name}` more than once"
        )));
    }
    let rows = table.n_rows();
    let mut aligned = Table::with_rows(rows);
    for name in manifest.columns() {
        let column = match table.column(name) {
            Some(col) => col.clone(),
            None => Column {
                name: name.clone(),
                data: ColumnData::Numeric(vec![Some(0.0); rows]),
            },
        };
        aligned.push(column)?;
    }
    Ok(aligned)
}
