//! Preprocessing domain: feature engineering, cleaning and column alignment.
//!
//! Every path that feeds the model goes engineer -> clean -> align, with the
//! statistics fitted on the training batch.

pub mod align;
pub mod domain;
pub mod features;
pub mod service;
pub mod stats;

pub use align::align_columns;
pub use domain::{ColumnManifest, FareBins, PreprocessStats, Vocabulary};
pub use features::run_feature_engineering;
pub use service::{clean_data, extract_titles, impute_age, Preprocessor};
