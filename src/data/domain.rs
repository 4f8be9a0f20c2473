//! Core table definitions.
//!
//! A `Table` is a small column store: every column has a name and either
//! numeric or text cells, `None` marking a missing value. Passenger batches are
//! a few thousand rows at most so columns are plain vectors.

use serde::{Deserialize, Serialize};

use crate::common::error::{TitanicError, TitanicResult};

/// Cells of a single column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::Text(v) => v.iter().filter(|c| c.is_none()).count(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnData::Numeric(_))
    }

    fn select(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Text(v) => {
                ColumnData::Text(rows.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }

    /// Render a cell back to text. Whole numbers print without a fraction so
    /// identifiers such as `892` survive a load/write cycle unchanged.
    pub fn render(&self, row: usize) -> Option<String> {
        match self {
            ColumnData::Numeric(v) => v[row].map(|x| x.to_string()),
            ColumnData::Text(v) => v[row].clone(),
        }
    }
}

/// Named column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }
}

/// Ordered collection of equally sized columns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with no columns yet but a fixed row count; columns pushed later
    /// must match it.
    pub fn with_rows(rows: usize) -> Self {
        Self {
            columns: Vec::new(),
            rows,
        }
    }

    /// Build a table from columns, rejecting ragged input and duplicate names.
    pub fn from_columns(columns: Vec<Column>) -> TitanicResult<Self> {
        let mut table = Table::new();
        for col in columns {
            if table.has_column(&col.name) {
                return Err(TitanicError::invalid(format!(
                    "duplicate column `{}`",
                    col.name
                )));
            }
            table.push(col)?;
        }
        Ok(table)
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Borrow a column or fail with `MissingColumn`.
    pub fn require(&self, name: &str) -> TitanicResult<&ColumnData> {
        self.column(name)
            .map(|c| &c.data)
            .ok_or_else(|| TitanicError::missing_column(name))
    }

    /// Numeric view of a column.
    pub fn numeric(&self, name: &str) -> TitanicResult<&[Option<f64>]> {
        match self.require(name)? {
            ColumnData::Numeric(v) => Ok(v),
            ColumnData::Text(_) => Err(TitanicError::invalid(format!(
                "column `{name}` is not numeric"
            ))),
        }
    }

    /// Text view of a column. Numeric columns are rendered, which lets a
    /// categorical column that happened to parse as numbers (e.g. a port coded
    /// `1`/`2`) still be treated as text.
    pub fn text(&self, name: &str) -> TitanicResult<Vec<Option<String>>> {
        let data = self.require(name)?;
        Ok((0..data.len()).map(|row| data.render(row)).collect())
    }

    /// Append a column, or replace an existing column of the same name in place.
    pub fn push(&mut self, column: Column) -> TitanicResult<()> {
        let fixed = !self.columns.is_empty() || self.rows > 0;
        if fixed && column.data.len() != self.rows {
            return Err(TitanicError::invalid(format!(
                "column `{}` has {} rows, table has {}",
                column.name,
                column.data.len(),
                self.rows
            )));
        }
        self.rows = column.data.len();
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => existing.data = column.data,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// Remove the named columns; names that are not present are ignored.
    pub fn drop_columns(&mut self, names: &[&str]) {
        self.columns.retain(|c| !names.contains(&c.name.as_str()));
    }

    /// Remove and return a column.
    pub fn take(&mut self, name: &str) -> Option<Column> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(idx))
    }

    /// New table holding the given rows, in the given order.
    pub fn subset(&self, rows: &[usize]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    data: c.data.select(rows),
                })
                .collect(),
            rows: rows.len(),
        }
    }

    /// Total number of missing cells.
    pub fn null_count(&self) -> usize {
        self.columns.iter().map(|c| c.data.null_count()).sum()
    }

    /// Names of columns that are not numeric.
    pub fn non_numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !c.data.is_numeric())
            .map(|c| c.name.clone())
            .collect()
    }

    /// Row-major feature matrix. Every column must be numeric and complete.
    pub fn to_matrix(&self) -> TitanicResult<Vec<Vec<f64>>> {
        let mut matrix = vec![Vec::with_capacity(self.columns.len()); self.rows];
        for col in &self.columns {
            let values = match &col.data {
                ColumnData::Numeric(v) => v,
                ColumnData::Text(_) => {
                    return Err(TitanicError::invalid(format!(
                        "column `{}` is not numeric",
                        col.name
                    )))
                }
            };
            for (row, cell) in values.iter().enumerate() {
                let value = cell.ok_or_else(|| {
                    TitanicError::invalid(format!("column `{}` has a missing value", col.name))
                })?;
                matrix[row].push(value);
            }
        }
        Ok(matrix)
    }
}

/// Passenger record as described by the Kaggle schema. Used to build single
/// rows (interactive form) without going through CSV.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PassengerRecord {
    pub passenger_id: Option<i64>,
    pub pclass: u8,
    pub name: Option<String>,
    pub sex: String,
    pub age: Option<f64>,
    pub sibsp: u32,
    pub parch: u32,
    pub ticket: Option<String>,
    pub fare: Option<f64>,
    pub cabin: Option<String>,
    pub embarked: Option<String>,
}

impl PassengerRecord {
    /// One-row-per-record table using the Kaggle column names. Optional
    /// identifier/text fields only become columns when at least one record
    /// carries them.
    pub fn to_table(records: &[PassengerRecord]) -> TitanicResult<Table> {
        let mut columns = Vec::new();
        if records.iter().any(|r| r.passenger_id.is_some()) {
            columns.push(Column::numeric(
                "PassengerId",
                records.iter().map(|r| r.passenger_id.map(|v| v as f64)).collect(),
            ));
        }
        columns.push(Column::numeric(
            "Pclass",
            records.iter().map(|r| Some(f64::from(r.pclass))).collect(),
        ));
        if records.iter().any(|r| r.name.is_some()) {
            columns.push(Column::text(
                "Name",
                records.iter().map(|r| r.name.clone()).collect(),
            ));
        }
        columns.push(Column::text(
            "Sex",
            records.iter().map(|r| Some(r.sex.clone())).collect(),
        ));
        columns.push(Column::numeric("Age", records.iter().map(|r| r.age).collect()));
        columns.push(Column::numeric(
            "SibSp",
            records.iter().map(|r| Some(f64::from(r.sibsp))).collect(),
        ));
        columns.push(Column::numeric(
            "Parch",
            records.iter().map(|r| Some(f64::from(r.parch))).collect(),
        ));
        columns.push(Column::numeric("Fare", records.iter().map(|r| r.fare).collect()));
        columns.push(Column::text(
            "Embarked",
            records.iter().map(|r| r.embarked.clone()).collect(),
        ));
        Table::from_columns(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_columns(vec![
            Column::numeric("Age", vec![Some(22.0), None, Some(30.0)]),
            Column::text(
                "Sex",
                vec![Some("male".into()), Some("female".into()), None],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let mut table = sample();
        let err = table
            .push(Column::numeric("Fare", vec![Some(1.0)]))
            .unwrap_err();
        assert!(err.to_string().contains("has 1 rows"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = Table::from_columns(vec![
            Column::numeric("Age", vec![Some(1.0)]),
            Column::numeric("Age", vec![Some(2.0)]),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn push_replaces_existing_column_in_place() {
        let mut table = sample();
        table
            .push(Column::numeric("Age", vec![Some(1.0), Some(2.0), Some(3.0)]))
            .unwrap();
        assert_eq!(table.names(), vec!["Age", "Sex"]);
        assert_eq!(table.numeric("Age").unwrap()[1], Some(2.0));
    }

    #[test]
    fn nulls_and_kinds_are_reported() {
        let table = sample();
        assert_eq!(table.null_count(), 2);
        assert_eq!(table.non_numeric_columns(), vec!["Sex"]);
        assert!(table.to_matrix().is_err());
    }

    #[test]
    fn subset_keeps_requested_order() {
        let table = sample().subset(&[2, 0]);
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.numeric("Age").unwrap(), &[Some(30.0), Some(22.0)]);
    }

    #[test]
    fn drop_ignores_absent_names() {
        let mut table = sample();
        table.drop_columns(&["Sex", "Cabin"]);
        assert_eq!(table.names(), vec!["Age"]);
    }

    #[test]
    fn numeric_cells_render_without_trailing_fraction() {
        let col = ColumnData::Numeric(vec![Some(892.0), Some(3.5)]);
        assert_eq!(col.render(0).as_deref(), Some("892"));
        assert_eq!(col.render(1).as_deref(), Some("3.5"));
    }

    #[test]
    fn record_table_skips_absent_optional_columns() {
        let record = PassengerRecord {
            pclass: 3,
            sex: "male".into(),
            age: Some(30.0),
            fare: Some(7.25),
            embarked: Some("S".into()),
            ..Default::default()
        };
        let table = PassengerRecord::to_table(&[record]).unwrap();
        assert!(!table.has_column("PassengerId"));
        assert!(!table.has_column("Name"));
        assert_eq!(table.n_rows(), 1);
        assert_eq!(table.numeric("Pclass").unwrap(), &[Some(3.0)]);
    }
}
