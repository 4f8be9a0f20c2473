//! Runtime configuration loaded from the environment.
//!
//! CLI flags are applied on top of this snapshot in `api::cli`.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Snapshot of configuration values consumed by the pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct AppCfg {
    pub data_root: PathBuf,
    pub train_file: String,
    pub test_file: String,
    pub model_dir: PathBuf,
    pub submission_file: String,
    pub log_level: String,
    pub log_json: bool,
    pub trees: usize,
    pub max_depth: usize,
    pub seed: u64,
}

impl Default for AppCfg {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("."),
            train_file: "train.csv".to_string(),
            test_file: "test.csv".to_string(),
            model_dir: PathBuf::from("."),
            submission_file: "submission.csv".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            trees: 100,
            max_depth: 5,
            seed: 42,
        }
    }
}

impl AppCfg {
    /// Create a configuration snapshot from the process environment.
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a snapshot from an arbitrary key lookup; unparsable values fall
    /// back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let string_or = |key: &str, default: String| lookup(key).unwrap_or(default);

        Self {
            data_root: lookup("TITANIC_DATA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_root),
            train_file: string_or("TITANIC_TRAIN_FILE", defaults.train_file),
            test_file: string_or("TITANIC_TEST_FILE", defaults.test_file),
            model_dir: lookup("TITANIC_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            submission_file: string_or("TITANIC_SUBMISSION", defaults.submission_file),
            log_level: string_or("TITANIC_LOG_LEVEL", defaults.log_level),
            log_json: lookup("TITANIC_LOG_JSON")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(defaults.log_json),
            trees: parsed_or(&lookup, "TITANIC_TREES", defaults.trees),
            max_depth: parsed_or(&lookup, "TITANIC_MAX_DEPTH", defaults.max_depth),
            seed: parsed_or(&lookup, "TITANIC_SEED", defaults.seed),
        }
    }

    pub fn train_path(&self) -> PathBuf {
        self.data_root.join(&self.train_file)
    }

    pub fn test_path(&self) -> PathBuf {
        self.data_root.join(&self.test_file)
    }

    pub fn submission_path(&self) -> PathBuf {
        self.data_root.join(&self.submission_file)
    }
}

fn parsed_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
