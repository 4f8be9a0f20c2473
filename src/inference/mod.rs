//! Inference domain: batch predictions, single-record verdicts and the
//! submission file.

pub mod domain;
pub mod service;

pub use domain::{Prediction, Verdict};
pub use service::{generate_predictions, write_submission, Predictor};
