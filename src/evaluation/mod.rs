//! Evaluation domain: per-group fairness audit of a trained model.

pub mod domain;
pub mod metrics;
pub mod service;

pub use domain::{BiasReport, GroupMetrics};
pub use service::{run_bias_audit, BiasAuditor};
