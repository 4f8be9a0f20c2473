//! Types shared by feature engineering, cleaning and alignment.
//!
//! `PreprocessStats` is the set of batch statistics fitted once on the training
//! batch and persisted next to the manifest, so that inference batches (and
//! single rows from the form) are transformed with the same quartile edges,
//! medians, mode and one-hot vocabulary the model was trained with.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::common::ids;

/// Columns removed before encoding: identifiers and free text the model would
/// memorise rather than generalise from.
pub const LEAKAGE_COLUMNS: [&str; 4] = ["PassengerId", "Name", "Ticket", "Cabin"];

/// Categorical columns expanded into indicators, in output order.
pub const CATEGORICAL_COLUMNS: [&str; 3] = ["Sex", "Embarked", "Title"];

const RARE_TITLES: [&str; 11] = [
    "Lady", "Countess", "Capt", "Col", "Don", "Dr", "Major", "Rev", "Sir", "Jonkheer", "Dona",
];

/// Collapse honorifics into the fixed vocabulary. Tokens outside the known
/// aliases pass through unchanged.
pub fn normalize_title(raw: &str) -> String {
    if RARE_TITLES.contains(&raw) {
        return "Rare".to_string();
    }
    match raw {
        "Mlle" | "Ms" => "Miss".to_string(),
        "Mme" => "Mrs".to_string(),
        other => other.to_string(),
    }
}

/// Ordered feature column names a trained model expects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnManifest {
    columns: Vec<String>,
}

impl ColumnManifest {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
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

    pub fn fingerprint(&self) -> String {
        ids::fingerprint_columns(&self.columns)
    }

    /// First name listed more than once, if any.
    pub fn first_duplicate(&self) -> Option<&str> {
        let mut seen = BTreeSet::new();
        for name in &self.columns {
            if !seen.insert(name.as_str()) {
                return Some(name);
            }
        }
        None
    }
}

/// Quartile edges of the fare distribution (min, q1, median, q3, max).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FareBins {
    pub edges: [f64; 5],
}

impl FareBins {
    pub const N_BINS: usize = 4;

    /// Bin index 0..=3. Bins are right-closed with the lowest edge included;
    /// values outside the fitted range clamp to the outer bins.
    pub fn bin(&self, fare: f64) -> usize {
        self.edges[1..]
            .iter()
            .position(|&upper| fare <= upper)
            .unwrap_or(Self::N_BINS - 1)
    }
}

/// Sorted category vocabularies observed while fitting. The first entry of
/// each list is the reference level and gets no indicator column.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub sex: Vec<String>,
    pub embarked: Vec<String>,
    pub title: Vec<String>,
}

impl Vocabulary {
    pub fn categories(&self, column: &str) -> &[String] {
        match column {
            "Sex" => &self.sex,
            "Embarked" => &self.embarked,
            "Title" => &self.title,
            _ => &[],
        }
    }

    /// Indicator column names for one categorical column.
    pub fn indicator_names(&self, column: &str) -> Vec<String> {
        self.categories(column)
            .iter()
            .skip(1)
            .map(|cat| format!("{column}_{cat}"))
            .collect()
    }
}

/// Statistics fitted on the training batch and applied to every later batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreprocessStats {
    pub fare_median: f64,
    pub fare_bins: FareBins,
    pub age_by_title: BTreeMap<String, f64>,
    pub age_median: f64,
    pub embarked_mode: String,
    pub vocabulary: Vocabulary,
}

impl PreprocessStats {
    /// Age substituted for a missing value: the title group's median, falling
    /// back to the overall median for unknown or missing titles.
    pub fn age_for(&self, title: Option<&str>) -> f64 {
        title
            .and_then(|t| self.age_by_title.get(t))
            .copied()
            .unwrap_or(self.age_median)
    }
}
