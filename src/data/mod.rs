//! Data domain: loading, in-memory tables and tabular output.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{Column, ColumnData, PassengerRecord, Table};
pub use repo_fs::{DataRepo, FsDataRepo};
pub use service::{ID_COLUMN, LABEL};
