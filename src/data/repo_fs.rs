//! Filesystem-backed tables: delimited text in, delimited text out.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim, WriterBuilder};
use tracing::debug;

use crate::common::config::AppCfg;
use crate::common::error::{TitanicError, TitanicResult};

use super::domain::{Column, Table};

/// Repository contract for tabular files.
pub trait DataRepo {
    fn get_table(&self, file: &str) -> TitanicResult<Table>;
    fn put_table(&self, file: &str, table: &Table) -> TitanicResult<PathBuf>;
    fn exists(&self, file: &str) -> bool;
}

/// Filesystem repository rooted at `cfg.data_root`.
pub struct FsDataRepo {
    root: PathBuf,
}

impl FsDataRepo {
    pub fn new(cfg: &AppCfg) -> Self {
        Self::at(&cfg.data_root)
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }
}

impl DataRepo for FsDataRepo {
    fn get_table(&self, file: &str) -> TitanicResult<Table> {
        read_csv(&self.path(file))
    }

    fn put_table(&self, file: &str, table: &Table) -> TitanicResult<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let path = self.path(file);
        write_csv(&path, table)?;
        Ok(path)
    }

    fn exists(&self, file: &str) -> bool {
        self.path(file).is_file()
    }
}

/// Cell values read as missing, in addition to the empty cell.
pub const MISSING_TOKENS: [&str; 6] = ["NA", "N/A", "NaN", "nan", "NULL", "null"];

fn is_missing(cell: &str) -> bool {
    cell.is_empty() || MISSING_TOKENS.contains(&cell)
}

/// Read a headed CSV file. A column is numeric when every present cell
/// parses as a finite `f64`; empty cells and `MISSING_TOKENS` are missing
/// values.
pub fn read_csv(path: &Path) -> TitanicResult<Table> {
    read_csv_with(path, &[])
}

/// Like `read_csv`, but the `verbatim` columns always stay text so their
/// cells come back exactly as written (identifiers such as `0892`).
pub fn read_csv_with(path: &Path, verbatim: &[&str]) -> TitanicResult<Table> {
    if !path.is_file() {
        return Err(TitanicError::MissingFile(path.to_path_buf()));
    }
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(file);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

    for record in reader.records() {
        let record = record?;
        for (idx, column) in cells.iter_mut().enumerate() {
            let value = record.get(idx).filter(|v| !is_missing(v));
            column.push(value.map(str::to_string));
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, values)| {
            if verbatim.contains(&name.as_str()) {
                Ok(Column::text(name, values))
            } else {
                infer_column(name, values)
            }
        })
        .collect::<TitanicResult<Vec<_>>>()?;
    let table = Table::from_columns(columns)?;
    debug!(path = %path.display(), rows = table.n_rows(), cols = table.n_columns(), "csv read");
    Ok(table)
}

fn infer_column(name: String, values: Vec<Option<String>>) -> TitanicResult<Column> {
    let parsed: Option<Vec<Option<f64>>> = values
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(text) => text.parse::<f64>().ok().map(Some),
        })
        .collect();

    let Some(numbers) = parsed else {
        return Ok(Column::text(name, values));
    };
    if let Some(row) = numbers.iter().position(|v| v.is_some_and(|x| !x.is_finite())) {
        return Err(TitanicError::invalid(format!(
            "column `{name}` row {row} is not a finite number"
        )));
    }
    Ok(Column::numeric(name, numbers))
}

/// Write a table as headed CSV; missing cells become empty fields.
pub fn write_csv(path: &Path, table: &Table) -> TitanicResult<()> {
    let mut writer = WriterBuilder::new().from_path(path)?;
    writer.write_record(table.names())?;
    for row in 0..table.n_rows() {
        let record: Vec<String> = table
            .columns()
            .iter()
            .map(|c| c.data.render(row).unwrap_or_default())
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    debug!(path = %path.display(), rows = table.n_rows(), "csv written");
    Ok(())
}
