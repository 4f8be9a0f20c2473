//! Command line surface and batch orchestration.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, info_span};

use crate::common::config::AppCfg;
use crate::common::error::TitanicError;
use crate::common::time;
use crate::data::domain::Table;
use crate::data::service as data_service;
use crate::evaluation::{run_bias_audit, BiasAuditor};
use crate::inference::generate_predictions;
use crate::training::{
    load_model, train_model, ForestTrainer, FsModelRepo, ModelArtifact, ModelRepo, TrainConfig,
    TrainReport, Trainer,
};

use super::form::{predict_form, FormArgs, FormInput};

fn parse_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{s}' is not a valid number")),
    }
}

/// Titanic survival pipeline: train, audit, predict.
///
/// Run without a subcommand to execute the whole batch pipeline.
#[derive(Parser, Debug)]
#[command(name = "titanic", version)]
pub struct Cli {
    /// Directory holding the input and submission files
    #[arg(long, global = true)]
    pub data_root: Option<PathBuf>,

    /// Training file name, relative to the data root
    #[arg(long, global = true)]
    pub train: Option<String>,

    /// Test file name, relative to the data root
    #[arg(long, global = true)]
    pub test: Option<String>,

    /// Directory for the model and column manifest files
    #[arg(long, global = true)]
    pub model_dir: Option<PathBuf>,

    /// Submission file name, relative to the data root
    #[arg(long, global = true)]
    pub submission: Option<String>,

    /// Number of trees in the forest
    #[arg(long, global = true, value_parser = parse_positive)]
    pub trees: Option<usize>,

    /// Maximum tree depth
    #[arg(long, global = true, value_parser = parse_positive)]
    pub max_depth: Option<usize>,

    /// Random seed for bootstrapping and the hold-out split
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Train, audit on the training file, then predict the test file if present
    Pipeline,
    /// Train and save the model artefacts
    Train,
    /// Audit a saved model on the training file
    Audit,
    /// Predict the test file with a saved model and write the submission
    Predict,
    /// Predict survival for a single passenger
    Form(FormArgs),
}

impl Cli {
    /// Apply flags on top of the environment configuration.
    pub fn apply(&self, cfg: &mut AppCfg) {
        if let Some(v) = &self.data_root {
            cfg.data_root = v.clone();
        }
        if let Some(v) = &self.train {
            cfg.train_file = v.clone();
        }
        if let Some(v) = &self.test {
            cfg.test_file = v.clone();
        }
        if let Some(v) = &self.model_dir {
            cfg.model_dir = v.clone();
        }
        if let Some(v) = &self.submission {
            cfg.submission_file = v.clone();
        }
        if let Some(v) = self.trees {
            cfg.trees = v;
        }
        if let Some(v) = self.max_depth {
            cfg.max_depth = v;
        }
        if let Some(v) = self.seed {
            cfg.seed = v;
        }
        if let Some(v) = &self.log_level {
            cfg.log_level = v.clone();
        }
    }
}

/// Dispatch the parsed command.
pub fn run(cli: Cli, cfg: &AppCfg) -> Result<()> {
    match cli.command.unwrap_or(Command::Pipeline) {
        Command::Pipeline => run_pipeline(cfg),
        Command::Train => train(cfg).map(drop),
        Command::Audit => {
            let artifact = load(cfg)?;
            audit(cfg, &artifact)
        }
        Command::Predict => {
            let artifact = load(cfg)?;
            predict(cfg, &artifact)
        }
        Command::Form(args) => {
            let artifact = load(cfg)?;
            let stdin = io::stdin();
            let form = FormInput::collect(&args, &mut stdin.lock(), &mut io::stdout())?;
            let verdict = predict_form(&artifact, &form)?;
            println!("This passenger would likely have {verdict}");
            Ok(())
        }
    }
}

/// Batch pipeline in fixed order: train, audit, predict. Stops before
/// training when the training file is missing; prediction is skipped when
/// the test file is missing.
pub fn run_pipeline(cfg: &AppCfg) -> Result<()> {
    let span = info_span!("pipeline");
    let _guard = span.enter();
    let started = time::now_ms();

    let train_path = cfg.train_path();
    let Some(raw) = data_service::try_load_table(&train_path)? else {
        error!(path = %train_path.display(), "add the dataset and rerun");
        return Err(TitanicError::MissingFile(train_path).into());
    };
    info!("starting survival pipeline");

    info!(step = 1, "training model");
    let artifact = train_on(cfg, &raw)?;

    info!(step = 2, "running bias audit");
    let report = BiasAuditor::new(&artifact)
        .audit(&raw)
        .context("bias audit failed")?;
    print!("{report}");

    if cfg.test_path().is_file() {
        info!(step = 3, "generating predictions");
        predict(cfg, &artifact)?;
    } else {
        info!(step = 3, path = %cfg.test_path().display(), "test file not found, skipping predictions");
    }

    info!(elapsed_ms = time::since_ms(started) as u64, "pipeline finished");
    Ok(())
}

fn print_report(report: &TrainReport) {
    println!("Mean CV Accuracy: {:.2}", report.cv.mean);
    println!("Accuracy Deviation: +/- {:.2}", report.cv.std);
    println!(
        "Hold-out Accuracy: {:.2} ({} rows)",
        report.holdout_accuracy, report.holdout_rows
    );
    println!("Top features:");
    for (name, importance) in &report.top_features {
        println!("  {name:<14} {importance:.3}");
    }
}

fn train_on(cfg: &AppCfg, raw: &Table) -> Result<ModelArtifact> {
    let (artifact, report) = ForestTrainer::new(TrainConfig::from_cfg(cfg))
        .train(raw)
        .context("training failed")?;
    FsModelRepo::new(cfg)
        .put_model(&artifact)
        .context("saving model artefacts")?;
    print_report(&report);
    Ok(artifact)
}

fn train(cfg: &AppCfg) -> Result<ModelArtifact> {
    let (artifact, report) = train_model(cfg).with_context(|| {
        format!("training on {} failed", cfg.train_path().display())
    })?;
    print_report(&report);
    Ok(artifact)
}

fn load(cfg: &AppCfg) -> Result<ModelArtifact> {
    load_model(cfg).context("no usable model, run `titanic train` first")
}

fn audit(cfg: &AppCfg, artifact: &ModelArtifact) -> Result<()> {
    let report = run_bias_audit(cfg, artifact).context("bias audit failed")?;
    print!("{report}");
    Ok(())
}

fn predict(cfg: &AppCfg, artifact: &ModelArtifact) -> Result<()> {
    generate_predictions(cfg, artifact).with_context(|| {
        format!("predicting {} failed", cfg.test_path().display())
    })?;
    println!("Success! '{}' has been created.", cfg.submission_path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_environment() {
        let cli = Cli::parse_from([
            "titanic",
            "--data-root",
            "/data",
            "--trees",
            "12",
            "train",
        ]);
        let mut cfg = AppCfg::default();
        cli.apply(&mut cfg);

        assert_eq!(cfg.train_path(), PathBuf::from("/data/train.csv"));
        assert_eq!(cfg.trees, 12);
        assert_eq!(cfg.max_depth, 5);
        assert!(matches!(cli.command, Some(Command::Train)));
    }

    #[test]
    fn no_subcommand_means_pipeline() {
        let cli = Cli::parse_from(["titanic"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn zero_trees_is_rejected() {
        assert!(Cli::try_parse_from(["titanic", "--trees", "0"]).is_err());
    }

    #[test]
    fn form_flags_are_range_checked() {
        assert!(Cli::try_parse_from(["titanic", "form", "--pclass", "4"]).is_err());
        let cli = Cli::try_parse_from(["titanic", "form", "--pclass", "2", "--age", "30"]).unwrap();
        match cli.command {
            Some(Command::Form(args)) => {
                assert_eq!(args.pclass, Some(2));
                assert_eq!(args.age, Some(30.0));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn pipeline_aborts_without_training_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppCfg {
            data_root: dir.path().to_path_buf(),
            model_dir: dir.path().to_path_buf(),
            ..AppCfg::default()
        };
        let err = run_pipeline(&cfg).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TitanicError>(),
            Some(TitanicError::MissingFile(_))
        ));
        assert!(!dir.path().join("titanic_model.json").exists());
    }
}
