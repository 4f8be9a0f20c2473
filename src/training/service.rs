//! Service layer orchestrating preprocessing, validation and model fitting.

use tracing::{info, info_span};

use crate::common::config::AppCfg;
use crate::common::error::TitanicResult;
use crate::common::time;
use crate::data::domain::Table;
use crate::data::service::{self as data_service, check_class_balance};
use crate::preprocess::domain::ColumnManifest;
use crate::preprocess::Preprocessor;

use super::domain::{CvSummary, Dataset, ModelArtifact, ModelRepo, TrainConfig, TrainReport, Trainer};
use super::forest::RandomForest;
use super::repo_fs::FsModelRepo;
use super::split::{stratified_k_fold, stratified_split};

/// Number of features listed in the training report.
const TOP_FEATURES: usize = 10;

/// Fraction of `indices` whose prediction matches the label.
fn accuracy_on(forest: &RandomForest, data: &Dataset, indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    let correct = indices
        .iter()
        .filter(|&&i| forest.predict_one(&data.features[i]) == data.labels[i])
        .count();
    correct as f64 / indices.len() as f64
}

/// Random-forest trainer: cross-validates on the whole cleaned batch, then
/// fits the final model on a stratified training split.
#[derive(Clone, Debug, Default)]
pub struct ForestTrainer {
    config: TrainConfig,
}

impl ForestTrainer {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Mean and spread of fold accuracies. Informational only; the scored
    /// models are discarded.
    pub fn cross_validate(&self, data: &Dataset) -> TitanicResult<CvSummary> {
        let folds = stratified_k_fold(&data.labels, self.config.cv_folds)?;
        let mut scores = Vec::with_capacity(folds.len());
        for (fold, split) in folds.iter().enumerate() {
            let forest = RandomForest::fit(&self.config.forest, &data.subset(&split.train))?;
            let score = accuracy_on(&forest, data, &split.test);
            info!(fold, accuracy = format_args!("{score:.4}"), "fold scored");
            scores.push(score);
        }
        Ok(CvSummary::from_scores(scores))
    }
}

impl Trainer for ForestTrainer {
    fn train(&self, raw: &Table) -> TitanicResult<(ModelArtifact, TrainReport)> {
        let span = info_span!("train", rows = raw.n_rows());
        let _guard = span.enter();
        let started = time::now_ms();

        let balance = check_class_balance(raw)?;
        let (pre, cleaned) = Preprocessor::fit_transform(raw)?;
        let data = Dataset::from_cleaned(&cleaned)?;

        info!(folds = self.config.cv_folds, "running cross-validation");
        let cv = self.cross_validate(&data)?;
        info!(
            mean = format_args!("{:.2}", cv.mean),
            std = format_args!("{:.2}", cv.std),
            "cross-validation accuracy"
        );

        let split = stratified_split(&data.labels, self.config.test_ratio, self.config.forest.seed)?;
        let forest = RandomForest::fit(&self.config.forest, &data.subset(&split.train))?;
        let holdout_accuracy = accuracy_on(&forest, &data, &split.test);

        let mut top_features = forest.feature_importance_ranking();
        top_features.truncate(TOP_FEATURES);
        for (name, importance) in &top_features {
            info!(feature = %name, importance = format_args!("{importance:.4}"), "feature importance");
        }

        info!(
            train_rows = split.train.len(),
            holdout_rows = split.test.len(),
            holdout_accuracy = format_args!("{holdout_accuracy:.4}"),
            elapsed_ms = time::since_ms(started) as u64,
            "model fitted"
        );

        let artifact = ModelArtifact {
            forest,
            manifest: ColumnManifest::new(data.feature_names.clone()),
            stats: pre.into_stats(),
        };
        let report = TrainReport {
            balance,
            cv,
            train_rows: split.train.len(),
            holdout_rows: split.test.len(),
            holdout_accuracy,
            top_features,
        };
        Ok((artifact, report))
    }
}

/// Load the configured training batch, train and persist the artefacts.
pub fn train_model(cfg: &AppCfg) -> TitanicResult<(ModelArtifact, TrainReport)> {
    let raw = data_service::load_table(&cfg.train_path())?;
    let trainer = ForestTrainer::new(TrainConfig::from_cfg(cfg));
    let (artifact, report) = trainer.train(&raw)?;
    FsModelRepo::new(cfg).put_model(&artifact)?;
    Ok((artifact, report))
}

/// Load the current model for inference.
pub fn load_model(cfg: &AppCfg) -> TitanicResult<ModelArtifact> {
    FsModelRepo::new(cfg).get_model()
}
