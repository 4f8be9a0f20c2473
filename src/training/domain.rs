//! Domain types for model training and the persisted artefact.

use serde::{Deserialize, Serialize};

use crate::common::config::AppCfg;
use crate::common::error::{TitanicError, TitanicResult};
use crate::data::domain::{ColumnData, Table};
use crate::data::service::{ClassBalance, LABEL};
use crate::preprocess::domain::{ColumnManifest, PreprocessStats};

use super::forest::RandomForest;

/// Forest hyper-parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` means ceil(sqrt(n_features)).
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 5,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

/// Training run settings.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainConfig {
    pub forest: ForestConfig,
    pub cv_folds: usize,
    pub test_ratio: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            forest: ForestConfig::default(),
            cv_folds: 5,
            test_ratio: 0.2,
        }
    }
}

impl TrainConfig {
    pub fn from_cfg(cfg: &AppCfg) -> Self {
        Self {
            forest: ForestConfig {
                n_trees: cfg.trees,
                max_depth: cfg.max_depth,
                seed: cfg.seed,
                ..ForestConfig::default()
            },
            ..Self::default()
        }
    }
}

/// Feature matrix with binary labels, split off a cleaned table.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
    pub feature_names: Vec<String>,
}

impl Dataset {
    /// Separate the label column from a cleaned table; the remaining columns,
    /// in order, are the features.
    pub fn from_cleaned(cleaned: &Table) -> TitanicResult<Self> {
        let mut features = cleaned.clone();
        let label = features
            .take(LABEL)
            .ok_or_else(|| TitanicError::missing_column(LABEL))?;
        let labels = match label.data {
            ColumnData::Numeric(values) => values
                .into_iter()
                .map(|v| v.map(|x| u8::from(x > 0.5)))
                .collect::<Option<Vec<u8>>>()
                .ok_or_else(|| TitanicError::invalid("label column has missing values"))?,
            ColumnData::Text(_) => {
                return Err(TitanicError::invalid("label column is not numeric"))
            }
        };
        Ok(Self {
            feature_names: features.names(),
            features: features.to_matrix()?,
            labels,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.labels.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            feature_names: self.feature_names.clone(),
        }
    }
}

/// Trained classifier plus everything needed to feed it: created once by the
/// trainer, read-only afterwards.
#[derive(Clone, Debug)]
pub struct ModelArtifact {
    pub forest: RandomForest,
    pub manifest: ColumnManifest,
    pub stats: PreprocessStats,
}

/// Cross-validation accuracy summary (informational only).
#[derive(Clone, Debug, PartialEq)]
pub struct CvSummary {
    pub fold_accuracies: Vec<f64>,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
}

impl CvSummary {
    pub fn from_scores(fold_accuracies: Vec<f64>) -> Self {
        let n = fold_accuracies.len().max(1) as f64;
        let mean = fold_accuracies.iter().sum::<f64>() / n;
        let var = fold_accuracies.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;
        Self {
            fold_accuracies,
            mean,
            std: var.sqrt(),
        }
    }
}

/// What a training run measured.
#[derive(Clone, Debug)]
pub struct TrainReport {
    pub balance: Option<ClassBalance>,
    pub cv: CvSummary,
    pub train_rows: usize,
    pub holdout_rows: usize,
    pub holdout_accuracy: f64,
    pub top_features: Vec<(String, f64)>,
}

/// Repository contract for model artefacts.
pub trait ModelRepo {
    fn put_model(&self, artifact: &ModelArtifact) -> TitanicResult<()>;
    fn get_model(&self) -> TitanicResult<ModelArtifact>;
}

/// Interface for components that can perform training.
pub trait Trainer {
    fn train(&self, raw: &Table) -> TitanicResult<(ModelArtifact, TrainReport)>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::domain::Column;

    #[test]
    fn label_is_split_from_features() {
        let table = Table::from_columns(vec![
            Column::numeric("Pclass", vec![Some(3.0), Some(1.0)]),
            Column::numeric(LABEL, vec![Some(0.0), Some(1.0)]),
            Column::numeric("Age", vec![Some(22.0), Some(38.0)]),
        ])
        .unwrap();

        let ds = Dataset::from_cleaned(&table).unwrap();
        assert_eq!(ds.feature_names, vec!["Pclass", "Age"]);
        assert_eq!(ds.labels, vec![0, 1]);
        assert_eq!(ds.features[1], vec![1.0, 38.0]);
        assert_eq!(ds.subset(&[1]).labels, vec![1]);
    }

    #[test]
    fn unlabelled_table_cannot_train() {
        let table = Table::from_columns(vec![Column::numeric("Age", vec![Some(1.0)])]).unwrap();
        assert!(matches!(
            Dataset::from_cleaned(&table),
            Err(TitanicError::MissingColumn(_))
        ));
    }

    #[test]
    fn cv_summary_uses_population_std() {
        let cv = CvSummary::from_scores(vec![0.8, 0.9, 0.7, 0.8]);
        assert!((cv.mean - 0.8).abs() < 1e-12);
        assert!((cv.std - 0.0707106781).abs() < 1e-9);
    }
}
