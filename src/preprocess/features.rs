//! Derived passenger features: family size, travelling alone, fare quartile.

use crate::common::error::{TitanicError, TitanicResult};
use crate::data::domain::{Column, Table};

use super::domain::FareBins;
use super::stats;

pub const FAMILY_SIZE: &str = "FamilySize";
pub const IS_ALONE: &str = "IsAlone";
pub const FARE_BIN: &str = "FareBin";

/// Append `FamilySize = SibSp + Parch + 1` and `IsAlone = 1 iff FamilySize == 1`.
pub fn create_family_features(table: &mut Table) -> TitanicResult<()> {
    let sibsp = table.numeric("SibSp")?;
    let parch = table.numeric("Parch")?;

    let family: Vec<Option<f64>> = sibsp
        .iter()
        .zip(parch)
        .map(|(s, p)| Some((*s)? + (*p)? + 1.0))
        .collect();
    let alone = family
        .iter()
        .map(|size| Some(if *size == Some(1.0) { 1.0 } else { 0.0 }))
        .collect();

    table.push(Column::numeric(FAMILY_SIZE, family))?;
    table.push(Column::numeric(IS_ALONE, alone))?;
    Ok(())
}

impl FareBins {
    /// Quartile edges of the known fares in `fares`.
    pub fn fit(fares: &[Option<f64>]) -> TitanicResult<Self> {
        let sorted = stats::sorted_known(fares);
        let mut edges = [0.0; 5];
        for (i, edge) in edges.iter_mut().enumerate() {
            *edge = stats::quantile_sorted(&sorted, i as f64 / 4.0)
                .ok_or_else(|| TitanicError::degenerate("Fare"))?;
        }
        Ok(Self { edges })
    }
}

/// Append `FareBin` using the given edges. Missing fares stay missing.
pub fn bin_fare(table: &mut Table, bins: &FareBins) -> TitanicResult<()> {
    let binned = table
        .numeric("Fare")?
        .iter()
        .map(|fare| fare.map(|f| bins.bin(f) as f64))
        .collect();
    table.push(Column::numeric(FARE_BIN, binned))
}

/// Batch-local feature engineering: the fare quartiles come from this very
/// batch, so the same fare can land in different bins in different batches.
/// Inference paths go through `Preprocessor::transform` with fitted edges.
pub fn run_feature_engineering(table: &mut Table) -> TitanicResult<FareBins> {
    create_family_features(table)?;
    let bins = FareBins::fit(table.numeric("Fare")?)?;
    bin_fare(table, &bins)?;
    Ok(bins)
}
