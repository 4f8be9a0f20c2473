//! Loading batches and the initial health check on the label column.

use std::path::Path;

use tracing::{error, info, warn};

use crate::common::error::{TitanicError, TitanicResult};

use super::domain::Table;
use super::repo_fs;

/// Name of the binary label column.
pub const LABEL: &str = "Survived";

/// Passenger identifier. Loaded as text so it is written back exactly as read.
pub const ID_COLUMN: &str = "PassengerId";

/// Minority share (percent) below which a training batch is flagged as skewed.
const IMBALANCE_THRESHOLD_PCT: f64 = 20.0;

/// Load a batch from disk.
pub fn load_table(path: &Path) -> TitanicResult<Table> {
    let table = repo_fs::read_csv_with(path, &[ID_COLUMN])?;
    info!(path = %path.display(), rows = table.n_rows(), "loaded batch");
    Ok(table)
}

/// Load a batch, turning a missing file into `None` after reporting it.
/// Callers decide whether absence is fatal.
pub fn try_load_table(path: &Path) -> TitanicResult<Option<Table>> {
    match load_table(path) {
        Ok(table) => Ok(Some(table)),
        Err(TitanicError::MissingFile(p)) => {
            error!(path = %p.display(), "batch not found");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Survived / not-survived split of a labelled batch, in percent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassBalance {
    pub not_survived_pct: f64,
    pub survived_pct: f64,
}

impl ClassBalance {
    pub fn minority_pct(&self) -> f64 {
        self.not_survived_pct.min(self.survived_pct)
    }

    pub fn is_skewed(&self) -> bool {
        self.minority_pct() < IMBALANCE_THRESHOLD_PCT
    }
}

/// Share of each label value. `Ok(None)` for unlabelled (test) batches.
pub fn check_class_balance(table: &Table) -> TitanicResult<Option<ClassBalance>> {
    if !table.has_column(LABEL) {
        info!("no target column found, treating batch as unlabelled");
        return Ok(None);
    }

    let labels: Vec<f64> = table.numeric(LABEL)?.iter().flatten().copied().collect();
    if labels.is_empty() {
        return Err(TitanicError::degenerate(LABEL));
    }
    let survived = labels.iter().filter(|&&v| v > 0.5).count() as f64;
    let total = labels.len() as f64;
    let balance = ClassBalance {
        not_survived_pct: 100.0 * (total - survived) / total,
        survived_pct: 100.0 * survived / total,
    };

    if balance.is_skewed() {
        warn!(
            not_survived_pct = format_args!("{:.2}", balance.not_survived_pct),
            survived_pct = format_args!("{:.2}", balance.survived_pct),
            "significant class imbalance detected"
        );
    } else {
        info!(
            not_survived_pct = format_args!("{:.2}", balance.not_survived_pct),
            survived_pct = format_args!("{:.2}", balance.survived_pct),
            "class balance is healthy for training"
        );
    }
    Ok(Some(balance))
}
