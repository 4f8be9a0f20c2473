//! Inference orchestration: raw passengers to model predictions.
//!
//! Every entry point goes through the same fitted `Preprocessor` and the
//! model's column manifest, so a batch row and a form record describing the
//! same passenger produce the same feature vector.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::common::config::AppCfg;
use crate::common::error::{TitanicError, TitanicResult};
use crate::common::time;
use crate::data::domain::{PassengerRecord, Table};
use crate::data::service::{self as data_service, ID_COLUMN};
use crate::preprocess::{align_columns, Preprocessor};
use crate::training::domain::ModelArtifact;

use super::domain::{Prediction, Verdict};

/// Predicts with one trained model; the artefact is borrowed read-only.
pub struct Predictor<'a> {
    artifact: &'a ModelArtifact,
    preprocessor: Preprocessor,
}

impl<'a> Predictor<'a> {
    pub fn new(artifact: &'a ModelArtifact) -> Self {
        Self {
            artifact,
            preprocessor: Preprocessor::new(artifact.stats.clone()),
        }
    }

    /// Clean and align a raw batch into the model's feature matrix.
    pub fn features(&self, raw: &Table) -> TitanicResult<Vec<Vec<f64>>> {
        let cleaned = self.preprocessor.transform(raw)?;
        let aligned = align_columns(&cleaned, &self.artifact.manifest)?;
        aligned.to_matrix()
    }

    /// Predicted labels for every row of `raw`, in input order.
    pub fn predict_labels(&self, raw: &Table) -> TitanicResult<Vec<u8>> {
        let started = time::now_ms();
        let matrix = self.features(raw)?;
        let labels = self.artifact.forest.predict(&matrix)?;
        debug!(rows = labels.len(), latency_ms = time::since_ms(started) as u64, "batch predicted");
        Ok(labels)
    }

    /// Submission rows keyed by the batch's `PassengerId` values, rendered
    /// exactly as they were read.
    pub fn predict_table(&self, raw: &Table) -> TitanicResult<Vec<Prediction>> {
        let ids = raw.text(ID_COLUMN)?;
        let labels = self.predict_labels(raw)?;
        ids.into_iter()
            .zip(labels)
            .enumerate()
            .map(|(row, (id, survived))| {
                let id = id.ok_or_else(|| {
                    TitanicError::invalid(format!("row {row} has no {ID_COLUMN}"))
                })?;
                Ok(Prediction { id, survived })
            })
            .collect()
    }

    /// Verdict for a single passenger.
    pub fn predict_record(&self, record: &PassengerRecord) -> TitanicResult<Verdict> {
        let table = PassengerRecord::to_table(std::slice::from_ref(record))?;
        let matrix = self.features(&table)?;
        let row = matrix
            .first()
            .ok_or_else(|| TitanicError::invalid("record produced no feature row"))?;
        Ok(Verdict::from_probability(
            self.artifact.forest.predict_proba_one(row),
        ))
    }
}

/// Write submission rows as CSV with a `PassengerId,Survived` header.
pub fn write_submission(path: &Path, predictions: &[Prediction]) -> TitanicResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    if predictions.is_empty() {
        writer.write_record([ID_COLUMN, "Survived"])?;
    }
    for prediction in predictions {
        writer.serialize(prediction)?;
    }
    writer.flush()?;
    Ok(())
}

/// Predict the configured test batch and write the submission file.
pub fn generate_predictions(cfg: &AppCfg, artifact: &ModelArtifact) -> TitanicResult<usize> {
    let raw = data_service::load_table(&cfg.test_path())?;
    let predictions = Predictor::new(artifact).predict_table(&raw)?;
    let path = cfg.submission_path();
    write_submission(&path, &predictions)?;
    info!(path = %path.display(), rows = predictions.len(), "submission written");
    Ok(predictions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::domain::Column;
    use crate::data::repo_fs::read_csv;
    use crate::preprocess::domain::ColumnManifest;
    use crate::training::domain::{Dataset, ForestConfig};
    use crate::training::forest::RandomForest;
    use tempfile::tempdir;

    fn text(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|s| Some(s.to_string())).collect()
    }

    fn train_batch() -> Table {
        Table::from_columns(vec![
            Column::numeric("PassengerId", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
            Column::numeric("Survived", vec![Some(0.0), Some(1.0), Some(1.0), Some(0.0)]),
            Column::numeric("Pclass", vec![Some(3.0), Some(1.0), Some(3.0), Some(1.0)]),
            Column::text("Name", text(&["A, Mr. X", "B, Mrs. Y", "C, Miss. Z", "D, Mr. W"])),
            Column::text("Sex", text(&["male", "female", "female", "male"])),
            Column::numeric("Age", vec![Some(22.0), Some(38.0), Some(26.0), Some(54.0)]),
            Column::numeric("SibSp", vec![Some(1.0), Some(1.0), Some(0.0), Some(0.0)]),
            Column::numeric("Parch", vec![Some(0.0); 4]),
            Column::numeric("Fare", vec![Some(7.25), Some(71.28), Some(7.92), Some(51.86)]),
            Column::text("Embarked", text(&["S", "C", "S", "S"])),
        ])
        .unwrap()
    }

    fn artifact() -> ModelArtifact {
        let (pre, cleaned) = Preprocessor::fit_transform(&train_batch()).unwrap();
        let data = Dataset::from_cleaned(&cleaned).unwrap();
        let config = ForestConfig {
            n_trees: 10,
            bootstrap: false,
            max_features: Some(data.n_features()),
            ..ForestConfig::default()
        };
        ModelArtifact {
            forest: RandomForest::fit(&config, &data).unwrap(),
            manifest: ColumnManifest::new(data.feature_names.clone()),
            stats: pre.into_stats(),
        }
    }

    fn test_batch() -> Table {
        Table::from_columns(vec![
            Column::numeric("PassengerId", vec![Some(892.0), Some(893.0), Some(894.0)]),
            Column::numeric("Pclass", vec![Some(3.0), Some(1.0), Some(2.0)]),
            Column::text(
                "Name",
                text(&["Kelly, Mr. James", "Wilkes, Mrs. James", "Rothes, Countess. of"]),
            ),
            Column::text("Sex", text(&["male", "female", "female"])),
            Column::numeric("Age", vec![Some(34.5), None, Some(33.0)]),
            Column::numeric("SibSp", vec![Some(0.0), Some(1.0), Some(0.0)]),
            Column::numeric("Parch", vec![Some(0.0); 3]),
            Column::numeric("Fare", vec![Some(7.83), None, Some(86.5)]),
            Column::text("Embarked", vec![Some("Q".into()), Some("S".into()), None]),
        ])
        .unwrap()
    }

    #[test]
    fn one_prediction_per_row_keyed_by_id() {
        let art = artifact();
        let preds = Predictor::new(&art).predict_table(&test_batch()).unwrap();
        let ids: Vec<&str> = preds.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["892", "893", "894"]);
        assert!(preds.iter().all(|p| p.survived <= 1));
    }

    #[test]
    fn batch_without_ids_is_rejected() {
        let art = artifact();
        let mut raw = test_batch();
        raw.drop_columns(&[ID_COLUMN]);
        assert!(matches!(
            Predictor::new(&art).predict_table(&raw),
            Err(TitanicError::MissingColumn(_))
        ));
    }

    #[test]
    fn record_and_batch_agree() {
        let art = artifact();
        let predictor = Predictor::new(&art);
        let record = PassengerRecord {
            pclass: 1,
            sex: "female".into(),
            age: Some(38.0),
            sibsp: 1,
            parch: 0,
            fare: Some(71.28),
            embarked: Some("C".into()),
            ..PassengerRecord::default()
        };

        let verdict = predictor.predict_record(&record).unwrap();
        let table = PassengerRecord::to_table(&[record]).unwrap();
        assert_eq!(predictor.predict_labels(&table).unwrap(), vec![u8::from(verdict.survived)]);
    }

    #[test]
    fn submission_has_header_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("submission.csv");
        let preds = vec![
            Prediction {
                id: "892".into(),
                survived: 0,
            },
            Prediction {
                id: "893".into(),
                survived: 1,
            },
        ];
        write_submission(&path, &preds).unwrap();

        let body = fs::read_to_string(&path).unwrap();
        assert_eq!(body, "PassengerId,Survived\n892,0\n893,1\n");
        assert_eq!(read_csv(&path).unwrap().n_rows(), 2);
    }

    #[test]
    fn identifiers_are_written_exactly_as_read() {
        let dir = tempdir().unwrap();
        let cfg = AppCfg {
            data_root: dir.path().to_path_buf(),
            ..AppCfg::default()
        };
        fs::write(
            cfg.test_path(),
            "PassengerId,Pclass,Name,Sex,Age,SibSp,Parch,Fare,Embarked\n\
             0892,3,\"Kelly, Mr. James\",male,34.5,0,0,7.83,Q\n\
             1e3,1,\"Wilkes, Mrs. James\",female,47,1,0,7,S\n\
             9007199254740993,2,\"Myles, Mr. Thomas\",male,NA,0,0,NaN,\n",
        )
        .unwrap();

        assert_eq!(generate_predictions(&cfg, &artifact()).unwrap(), 3);
        let ids: Vec<String> = fs::read_to_string(cfg.submission_path())
            .unwrap()
            .lines()
            .skip(1)
            .map(|line| line.split(',').next().unwrap_or_default().to_string())
            .collect();
        assert_eq!(ids, vec!["0892", "1e3", "9007199254740993"]);
    }
}
