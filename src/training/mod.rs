//! Training domain: the forest, validation splits and artefact lifecycle.

pub mod domain;
pub mod forest;
pub mod repo_fs;
pub mod service;
pub mod split;

pub use domain::{
    CvSummary, Dataset, ForestConfig, ModelArtifact, ModelRepo, TrainConfig, TrainReport, Trainer,
};
pub use forest::RandomForest;
pub use repo_fs::FsModelRepo;
pub use service::{load_model, train_model, ForestTrainer};
