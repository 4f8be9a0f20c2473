//! Cleaning pipeline: titles, imputation, leakage removal and encoding.
//!
//! `Preprocessor::transform` is the one transformation every entry point runs
//! (training, batch prediction, bias audit, the single-row form). Batch
//! statistics are never recomputed there; they come from `PreprocessStats`
//! fitted on the training batch.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::common::error::{TitanicError, TitanicResult};
use crate::data::domain::{Column, Table};

use super::domain::{
    normalize_title, FareBins, PreprocessStats, Vocabulary, CATEGORICAL_COLUMNS, LEAKAGE_COLUMNS,
};
use super::features;
use super::stats;

pub const TITLE: &str = "Title";

fn title_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r" ([A-Za-z]+)\.").expect("valid regex"))
}

/// Honorific preceding the first period in a name, normalised.
pub fn parse_title(name: &str) -> Option<String> {
    title_pattern()
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| normalize_title(m.as_str()))
}

/// Add a `Title` column parsed from `Name`. Without a `Name` column (single
/// rows from the form) every title is missing.
pub fn extract_titles(table: &mut Table) -> TitanicResult<()> {
    let titles = if table.has_column("Name") {
        table
            .text("Name")?
            .iter()
            .map(|name| name.as_deref().and_then(parse_title))
            .collect()
    } else {
        vec![None; table.n_rows()]
    };
    table.push(Column::text(TITLE, titles))
}

/// Median known age per title.
fn age_medians(table: &Table) -> TitanicResult<BTreeMap<String, f64>> {
    let ages = table.numeric("Age")?;
    let titles = table.text(TITLE)?;

    let mut groups: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
    for (title, age) in titles.into_iter().zip(ages) {
        if let Some(title) = title {
            groups.entry(title).or_default().push(*age);
        }
    }
    Ok(groups
        .into_iter()
        .filter_map(|(title, ages)| stats::median(&ages).map(|m| (title, m)))
        .collect())
}

fn fill_age(table: &mut Table, medians: &BTreeMap<String, f64>, fallback: Option<f64>) -> TitanicResult<()> {
    let titles = table.text(TITLE)?;
    let filled = table
        .numeric("Age")?
        .iter()
        .zip(&titles)
        .map(|(age, title)| {
            age.or_else(|| {
                title
                    .as_ref()
                    .and_then(|t| medians.get(t))
                    .copied()
                    .or(fallback)
            })
        })
        .collect();
    table.push(Column::numeric("Age", filled))
}

/// Batch-local age imputation: missing ages take the median of their title
/// group in this batch, or the batch-wide median when the group has no known
/// age. Requires `extract_titles` to have run.
pub fn impute_age(table: &mut Table) -> TitanicResult<()> {
    let medians = age_medians(table)?;
    let fallback = stats::median(table.numeric("Age")?);
    fill_age(table, &medians, fallback)
}

fn fill_numeric(table: &mut Table, column: &str, value: f64) -> TitanicResult<()> {
    let filled = table
        .numeric(column)?
        .iter()
        .map(|cell| Some(cell.unwrap_or(value)))
        .collect();
    table.push(Column::numeric(column, filled))
}

fn fill_text(table: &mut Table, column: &str, value: &str) -> TitanicResult<()> {
    let filled = table
        .text(column)?
        .into_iter()
        .map(|cell| Some(cell.unwrap_or_else(|| value.to_string())))
        .collect();
    table.push(Column::text(column, filled))
}

/// Sorted distinct non-missing values of a column.
fn categories(table: &Table, column: &str) -> TitanicResult<Vec<String>> {
    let distinct: BTreeSet<String> = table.text(column)?.into_iter().flatten().collect();
    Ok(distinct.into_iter().collect())
}

/// Replace each categorical column with one indicator per non-reference
/// category of the vocabulary. Values outside the vocabulary, and missing
/// values, encode as all zeros.
fn one_hot(table: &mut Table, vocabulary: &Vocabulary) -> TitanicResult<()> {
    let mut indicators = Vec::new();
    for column in CATEGORICAL_COLUMNS {
        let values = table.text(column)?;
        for category in vocabulary.categories(column).iter().skip(1) {
            let flags = values
                .iter()
                .map(|v| Some(if v.as_deref() == Some(category.as_str()) { 1.0 } else { 0.0 }))
                .collect();
            indicators.push(Column::numeric(format!("{column}_{category}"), flags));
        }
    }
    table.drop_columns(&CATEGORICAL_COLUMNS);
    for col in indicators {
        table.push(col)?;
    }
    Ok(())
}

impl PreprocessStats {
    /// Fit every batch statistic on a raw (un-engineered) training batch.
    pub fn fit(raw: &Table) -> TitanicResult<Self> {
        let mut work = raw.clone();

        let fare_median =
            stats::median(work.numeric("Fare")?).ok_or_else(|| TitanicError::degenerate("Fare"))?;
        fill_numeric(&mut work, "Fare", fare_median)?;
        let fare_bins = FareBins::fit(work.numeric("Fare")?)?;

        extract_titles(&mut work)?;
        let age_by_title = age_medians(&work)?;
        let age_median =
            stats::median(work.numeric("Age")?).ok_or_else(|| TitanicError::degenerate("Age"))?;

        let embarked_mode = stats::mode(work.text("Embarked")?.iter().map(|v| v.as_deref()))
            .ok_or_else(|| TitanicError::degenerate("Embarked"))?;
        fill_text(&mut work, "Embarked", &embarked_mode)?;

        let vocabulary = Vocabulary {
            sex: categories(&work, "Sex")?,
            embarked: categories(&work, "Embarked")?,
            title: categories(&work, TITLE)?,
        };

        Ok(Self {
            fare_median,
            fare_bins,
            age_by_title,
            age_median,
            embarked_mode,
            vocabulary,
        })
    }
}

/// Fitted cleaning pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct Preprocessor {
    stats: PreprocessStats,
}

impl Preprocessor {
    pub fn new(stats: PreprocessStats) -> Self {
        Self { stats }
    }

    /// Fit on `raw` and return the fitted pipeline with the cleaned batch.
    pub fn fit_transform(raw: &Table) -> TitanicResult<(Self, Table)> {
        let pre = Self::new(PreprocessStats::fit(raw)?);
        let cleaned = pre.transform(raw)?;
        Ok((pre, cleaned))
    }

    pub fn stats(&self) -> &PreprocessStats {
        &self.stats
    }

    pub fn into_stats(self) -> PreprocessStats {
        self.stats
    }

    /// Raw passenger batch to a fully numeric, complete table. Row count and
    /// order are preserved; the label column, when present, passes through.
    pub fn transform(&self, raw: &Table) -> TitanicResult<Table> {
        let stats = &self.stats;
        let mut table = raw.clone();

        fill_numeric(&mut table, "Fare", stats.fare_median)?;
        features::create_family_features(&mut table)?;
        features::bin_fare(&mut table, &stats.fare_bins)?;

        extract_titles(&mut table)?;
        fill_age(&mut table, &stats.age_by_title, Some(stats.age_median))?;
        fill_text(&mut table, "Embarked", &stats.embarked_mode)?;

        table.drop_columns(&LEAKAGE_COLUMNS);
        one_hot(&mut table, &stats.vocabulary)?;

        let text_columns = table.non_numeric_columns();
        if !text_columns.is_empty() {
            return Err(TitanicError::invalid(format!(
                "unexpected non-numeric columns after cleaning: {}",
                text_columns.join(", ")
            )));
        }
        if table.null_count() > 0 {
            let incomplete: Vec<String> = table
                .columns()
                .iter()
                .filter(|c| c.data.null_count() > 0)
                .map(|c| c.name.clone())
                .collect();
            return Err(TitanicError::invalid(format!(
                "missing values remain after cleaning in: {}",
                incomplete.join(", ")
            )));
        }

        debug!(rows = table.n_rows(), cols = table.n_columns(), "batch cleaned");
        Ok(table)
    }
}

/// Clean a training batch with statistics fitted on that same batch.
pub fn clean_data(raw: &Table) -> TitanicResult<Table> {
    Preprocessor::fit_transform(raw).map(|(_, cleaned)| cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::LABEL;

    fn num(name: &str, v: &[Option<f64>]) -> Column {
        Column::numeric(name, v.to_vec())
    }

    fn txt(name: &str, v: &[Option<&str>]) -> Column {
        Column::text(name, v.iter().map(|s| s.map(str::to_string)).collect())
    }

    /// Four passengers in the Kaggle layout.
    fn raw_batch() -> Table {
        Table::from_columns(vec![
            num("PassengerId", &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
            num(LABEL, &[Some(0.0), Some(1.0), Some(1.0), Some(0.0)]),
            num("Pclass", &[Some(3.0), Some(1.0), Some(3.0), Some(3.0)]),
            txt(
                "Name",
                &[
                    Some("Braund, Mr. Owen Harris"),
                    Some("Cumings, Mrs. John Bradley"),
                    Some("Heikkinen, Miss. Laina"),
                    Some("Allen, Mr. William Henry"),
                ],
            ),
            txt("Sex", &[Some("male"), Some("female"), Some("female"), Some("male")]),
            num("Age", &[Some(22.0), Some(38.0), Some(26.0), None]),
            num("SibSp", &[Some(1.0), Some(1.0), Some(0.0), Some(0.0)]),
            num("Parch", &[Some(0.0), Some(0.0), Some(0.0), Some(0.0)]),
            txt("Ticket", &[Some("A/5 21171"), Some("PC 17599"), Some("STON/O2."), Some("373450")]),
            num("Fare", &[Some(7.25), Some(71.28), Some(7.93), Some(8.05)]),
            txt("Cabin", &[None, Some("C85"), None, None]),
            txt("Embarked", &[Some("S"), Some("C"), Some("S"), None]),
        ])
        .unwrap()
    }

    #[test]
    fn titles_follow_the_first_period_token() {
        assert_eq!(parse_title("Braund, Mr. Owen Harris").as_deref(), Some("Mr"));
        assert_eq!(parse_title("Reuchlin, Jonkheer. John George").as_deref(), Some("Rare"));
        assert_eq!(parse_title("Aubart, Mme. Leontine Pauline").as_deref(), Some("Mrs"));
        assert_eq!(parse_title("no honorific here"), None);
    }

    #[test]
    fn missing_age_takes_title_median() {
        let mut table = Table::from_columns(vec![
            txt("Name", &[Some("A, Mr. X"), Some("B, Mr. Y"), Some("C, Mr. Z"), Some("D, Mrs. W")]),
            num("Age", &[Some(22.0), Some(24.0), None, Some(60.0)]),
        ])
        .unwrap();
        extract_titles(&mut table).unwrap();
        impute_age(&mut table).unwrap();
        assert_eq!(table.numeric("Age").unwrap()[2], Some(23.0));
    }

    #[test]
    fn title_group_without_ages_falls_back_to_batch_median() {
        let mut table = Table::from_columns(vec![
            txt("Name", &[Some("A, Mr. X"), Some("B, Master. Y"), Some("C, Mr. Z")]),
            num("Age", &[Some(20.0), None, Some(40.0)]),
        ])
        .unwrap();
        extract_titles(&mut table).unwrap();
        impute_age(&mut table).unwrap();
        assert_eq!(table.numeric("Age").unwrap()[1], Some(30.0));
    }

    #[test]
    fn cleaned_batch_is_numeric_complete_and_leak_free() {
        let cleaned = clean_data(&raw_batch()).unwrap();

        assert_eq!(cleaned.null_count(), 0);
        assert!(cleaned.non_numeric_columns().is_empty());
        for leak in LEAKAGE_COLUMNS {
            assert!(!cleaned.has_column(leak), "{leak} survived cleaning");
        }
        assert_eq!(
            cleaned.names(),
            [
                LABEL, "Pclass", "Age", "SibSp", "Parch", "Fare", "FamilySize", "IsAlone",
                "FareBin", "Sex_male", "Embarked_S", "Title_Mr", "Title_Mrs",
            ]
        );
        // Allen (Mr, no age) gets the Mr median; missing port becomes the mode.
        assert_eq!(cleaned.numeric("Age").unwrap()[3], Some(22.0));
        assert_eq!(cleaned.numeric("Embarked_S").unwrap()[3], Some(1.0));
        assert_eq!(cleaned.numeric("Sex_male").unwrap(), &[Some(1.0), Some(0.0), Some(0.0), Some(1.0)]);
    }

    #[test]
    fn transform_reuses_fitted_statistics() {
        let (pre, _) = Preprocessor::fit_transform(&raw_batch()).unwrap();

        // A later batch with a different fare spread and an unseen title.
        let later = Table::from_columns(vec![
            num("PassengerId", &[Some(900.0)]),
            num("Pclass", &[Some(1.0)]),
            txt("Name", &[Some("Rothes, Countess. of")]),
            txt("Sex", &[Some("female")]),
            num("Age", &[None]),
            num("SibSp", &[Some(0.0)]),
            num("Parch", &[Some(0.0)]),
            num("Fare", &[None]),
            txt("Embarked", &[Some("Q")]),
        ])
        .unwrap();

        let cleaned = pre.transform(&later).unwrap();
        let stats = pre.stats();
        assert_eq!(cleaned.numeric("Fare").unwrap(), &[Some(stats.fare_median)]);
        assert_eq!(cleaned.numeric("Age").unwrap(), &[Some(stats.age_median)]);
        // "Q" was never seen while fitting: no indicator fires.
        assert_eq!(cleaned.numeric("Embarked_S").unwrap(), &[Some(0.0)]);
        assert!(!cleaned.has_column("Embarked_Q"));
        assert!(!cleaned.has_column("Title_Rare"));
    }

    #[test]
    fn fitted_title_group_without_ages_uses_fitted_median() {
        let mut raw = raw_batch();
        raw.push(txt(
            "Name",
            &[
                Some("Braund, Mr. Owen Harris"),
                Some("Cumings, Mrs. John Bradley"),
                Some("Heikkinen, Miss. Laina"),
                Some("Allen, Master. William Henry"),
            ],
        ))
        .unwrap();

        let (pre, cleaned) = Preprocessor::fit_transform(&raw).unwrap();
        let stats = pre.stats();
        assert!(!stats.age_by_title.contains_key("Master"));
        assert_eq!(stats.age_median, 26.0);
        assert_eq!(cleaned.numeric("Age").unwrap()[3], Some(26.0));

        let later = raw.subset(&[3]);
        assert_eq!(pre.transform(&later).unwrap().numeric("Age").unwrap(), &[Some(26.0)]);
    }

    #[test]
    fn fitting_without_any_port_is_degenerate() {
        let mut raw = raw_batch();
        raw.push(txt("Embarked", &[None, None, None, None])).unwrap();
        let err = PreprocessStats::fit(&raw).unwrap_err();
        assert!(matches!(err, TitanicError::DegenerateImputation { ref column } if column == "Embarked"));
    }
}
