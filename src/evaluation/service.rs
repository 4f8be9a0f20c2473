//! Bias audit: predictions on a labelled batch, sliced by sex and class.

use tracing::{info, warn};

use crate::common::config::AppCfg;
use crate::common::error::{TitanicError, TitanicResult};
use crate::data::domain::Table;
use crate::data::service::{self as data_service, LABEL};
use crate::inference::Predictor;
use crate::training::domain::ModelArtifact;

use super::domain::{BiasReport, GroupMetrics};
use super::metrics;

const SEX_GROUPS: [&str; 2] = ["male", "female"];

/// Audits one trained model; holds it by reference for its lifetime.
pub struct BiasAuditor<'a> {
    predictor: Predictor<'a>,
}

fn group_metrics(
    group: String,
    rows: &[usize],
    labels: &[u8],
    predictions: &[u8],
    with_recall: bool,
) -> GroupMetrics {
    let l: Vec<u8> = rows.iter().map(|&i| labels[i]).collect();
    let p: Vec<u8> = rows.iter().map(|&i| predictions[i]).collect();
    GroupMetrics {
        group,
        rows: rows.len(),
        accuracy: metrics::accuracy(&l, &p).unwrap_or(0.0),
        recall: if with_recall {
            metrics::recall(&l, &p)
        } else {
            None
        },
    }
}

impl<'a> BiasAuditor<'a> {
    pub fn new(artifact: &'a ModelArtifact) -> Self {
        Self {
            predictor: Predictor::new(artifact),
        }
    }

    /// Run the model over a labelled raw batch and report per-group metrics.
    /// Sex groups absent from the batch are left out of the report.
    pub fn audit(&self, raw: &Table) -> TitanicResult<BiasReport> {
        let labels = raw
            .numeric(LABEL)?
            .iter()
            .map(|v| v.map(|x| u8::from(x > 0.5)))
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(|| TitanicError::invalid("audit batch has missing labels"))?;
        let predictions = self.predictor.predict_labels(raw)?;

        let sex = raw.text("Sex")?;
        let mut by_sex = Vec::new();
        for group in SEX_GROUPS {
            let rows: Vec<usize> = (0..raw.n_rows())
                .filter(|&i| sex[i].as_deref() == Some(group))
                .collect();
            if rows.is_empty() {
                warn!(group, "no rows for sex group");
                continue;
            }
            by_sex.push(group_metrics(group.to_string(), &rows, &labels, &predictions, true));
        }

        let pclass = raw.numeric("Pclass")?;
        let mut classes: Vec<f64> = pclass.iter().flatten().copied().collect();
        classes.sort_by(f64::total_cmp);
        classes.dedup();
        let by_class = classes
            .into_iter()
            .map(|class| {
                let rows: Vec<usize> = (0..raw.n_rows())
                    .filter(|&i| pclass[i] == Some(class))
                    .collect();
                group_metrics(class.to_string(), &rows, &labels, &predictions, false)
            })
            .collect();

        Ok(BiasReport { by_sex, by_class })
    }
}

/// Audit `artifact` on the configured training batch and log the report.
pub fn run_bias_audit(cfg: &AppCfg, artifact: &ModelArtifact) -> TitanicResult<BiasReport> {
    let raw = data_service::load_table(&cfg.train_path())?;
    let report = BiasAuditor::new(artifact).audit(&raw)?;
    for g in report.by_sex.iter().chain(&report.by_class) {
        info!(
            group = %g.group,
            rows = g.rows,
            accuracy = format_args!("{:.2}", g.accuracy),
            recall = ?g.recall,
            "bias audit slice"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::domain::Column;
    use crate::preprocess::domain::ColumnManifest;
    use crate::preprocess::Preprocessor;
    use crate::training::domain::{Dataset, ForestConfig};
    use crate::training::forest::RandomForest;

    fn text(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|s| Some(s.to_string())).collect()
    }

    fn batch() -> Table {
        Table::from_columns(vec![
            Column::numeric(
                "Survived",
                vec![Some(0.0), Some(1.0), Some(1.0), Some(0.0), Some(1.0), Some(0.0)],
            ),
            Column::numeric(
                "Pclass",
                vec![Some(3.0), Some(1.0), Some(3.0), Some(1.0), Some(2.0), Some(2.0)],
            ),
            Column::text(
                "Name",
                text(&[
                    "A, Mr. X",
                    "B, Mrs. Y",
                    "C, Miss. Z",
                    "D, Mr. W",
                    "E, Mrs. V",
                    "F, Mr. U",
                ]),
            ),
            Column::text(
                "Sex",
                text(&["male", "female", "female", "male", "female", "male"]),
            ),
            Column::numeric(
                "Age",
                vec![Some(22.0), Some(38.0), Some(26.0), Some(54.0), None, Some(30.0)],
            ),
            Column::numeric("SibSp", vec![Some(0.0); 6]),
            Column::numeric("Parch", vec![Some(0.0); 6]),
            Column::numeric(
                "Fare",
                vec![Some(7.0), Some(70.0), Some(8.0), Some(50.0), Some(20.0), Some(15.0)],
            ),
            Column::text("Embarked", text(&["S", "C", "S", "S", "Q", "S"])),
        ])
        .unwrap()
    }

    fn artifact(raw: &Table) -> ModelArtifact {
        let (pre, cleaned) = Preprocessor::fit_transform(raw).unwrap();
        let data = Dataset::from_cleaned(&cleaned).unwrap();
        let config = ForestConfig {
            n_trees: 20,
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

    #[test]
    fn audit_slices_by_sex_then_class() {
        let raw = batch();
        let art = artifact(&raw);
        let report = BiasAuditor::new(&art).audit(&raw).unwrap();

        let groups: Vec<&str> = report.by_sex.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(groups, vec!["male", "female"]);
        let classes: Vec<&str> = report.by_class.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(classes, vec!["1", "2", "3"]);

        // sex separates the labels perfectly, so a full-feature forest fits it
        let male = report.sex("male").unwrap();
        assert_eq!(male.rows, 3);
        assert_eq!(male.accuracy, 1.0);
        assert_eq!(male.recall, None);
        assert_eq!(report.sex("female").unwrap().recall, Some(1.0));
        assert!(report.by_class.iter().all(|g| g.recall.is_none()));
    }

    #[test]
    fn audit_needs_labels() {
        let raw = batch();
        let art = artifact(&raw);
        let mut unlabelled = raw.clone();
        unlabelled.drop_columns(&["Survived"]);
        assert!(matches!(
            BiasAuditor::new(&art).audit(&unlabelled),
            Err(TitanicError::MissingColumn(_))
        ));
    }
}
