//! Filesystem repository for trained model artefacts.
//!
//! A model is stored as two JSON files in the model directory: the forest
//! itself and the column manifest with the preprocessing statistics. Both
//! carry the same run id, derived from the save time and the saved content,
//! so halves written by different training runs are rejected on load.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::common::config::AppCfg;
use crate::common::error::{TitanicError, TitanicResult};
use crate::common::ids::{fingerprint_columns, fingerprint_parts};
use crate::common::time;
use crate::preprocess::domain::{ColumnManifest, PreprocessStats};

use super::domain::{ModelArtifact, ModelRepo};
use super::forest::RandomForest;

pub const MODEL_FILE: &str = "titanic_model.json";
pub const MANIFEST_FILE: &str = "model_columns.json";

#[derive(Serialize, Deserialize)]
struct ModelFile {
    run_id: String,
    fingerprint: String,
    created_ms: u64,
    forest: RandomForest,
}

#[derive(Serialize, Deserialize)]
struct ManifestFile {
    run_id: String,
    fingerprint: String,
    columns: ColumnManifest,
    stats: PreprocessStats,
}

/// Persist model artefacts on the local filesystem.
pub struct FsModelRepo {
    root: PathBuf,
}

impl FsModelRepo {
    pub fn new(cfg: &AppCfg) -> Self {
        Self::at(&cfg.model_dir)
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn model_path(&self) -> PathBuf {
        self.root.join(MODEL_FILE)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// Both artefact files are present.
    pub fn exists(&self) -> bool {
        self.model_path().is_file() && self.manifest_path().is_file()
    }
}

/// Identifier of one save: the timestamp plus a hash over everything the two
/// files hold.
fn derive_run_id(created_ms: u64, artifact: &ModelArtifact) -> TitanicResult<String> {
    let stamp = created_ms.to_le_bytes();
    let columns = artifact.manifest.fingerprint();
    let forest = serde_json::to_vec(&artifact.forest)?;
    let stats = serde_json::to_vec(&artifact.stats)?;
    let hash = fingerprint_parts(&[&stamp[..], columns.as_bytes(), &forest[..], &stats[..]]);
    Ok(format!("{created_ms:x}-{hash}"))
}

fn staging_path(path: &Path) -> PathBuf {
    path.with_extension("json.tmp")
}

/// Write `value` next to `path`; `commit` moves it into place.
fn stage_json<T: Serialize>(path: &Path, value: &T) -> TitanicResult<()> {
    let mut writer = BufWriter::new(File::create(staging_path(path))?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn commit(path: &Path) -> TitanicResult<()> {
    fs::rename(staging_path(path), path)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> TitanicResult<T> {
    if !path.is_file() {
        return Err(TitanicError::ModelMissing(path.to_path_buf()));
    }
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

impl ModelRepo for FsModelRepo {
    fn put_model(&self, artifact: &ModelArtifact) -> TitanicResult<()> {
        fs::create_dir_all(&self.root)?;
        let created_ms = time::now_ms() as u64;
        let run_id = derive_run_id(created_ms, artifact)?;
        let fingerprint = artifact.manifest.fingerprint();

        let (model_path, manifest_path) = (self.model_path(), self.manifest_path());
        stage_json(
            &model_path,
            &ModelFile {
                run_id: run_id.clone(),
                fingerprint: fingerprint.clone(),
                created_ms,
                forest: artifact.forest.clone(),
            },
        )?;
        stage_json(
            &manifest_path,
            &ManifestFile {
                run_id: run_id.clone(),
                fingerprint: fingerprint.clone(),
                columns: artifact.manifest.clone(),
                stats: artifact.stats.clone(),
            },
        )?;
        commit(&model_path)?;
        commit(&manifest_path)?;

        info!(
            dir = %self.root.display(),
            run_id = %run_id,
            fingerprint = %fingerprint,
            columns = artifact.manifest.len(),
            "saved model artefacts"
        );
        Ok(())
    }

    fn get_model(&self) -> TitanicResult<ModelArtifact> {
        let model: ModelFile = read_json(&self.model_path())?;
        let manifest: ManifestFile = read_json(&self.manifest_path())?;

        if model.run_id != manifest.run_id {
            return Err(TitanicError::ArtifactMismatch {
                model: model.run_id,
                manifest: manifest.run_id,
            });
        }
        if model.fingerprint != manifest.fingerprint
            || manifest.fingerprint != manifest.columns.fingerprint()
        {
            return Err(TitanicError::ArtifactMismatch {
                model: model.fingerprint,
                manifest: manifest.fingerprint,
            });
        }
        if model.forest.feature_names() != manifest.columns.columns() {
            return Err(TitanicError::ArtifactMismatch {
                model: fingerprint_columns(model.forest.feature_names()),
                manifest: manifest.fingerprint,
            });
        }

        info!(
            dir = %self.root.display(),
            run_id = %manifest.run_id,
            trees = model.forest.n_trees(),
            "loaded model artefacts"
        );
        Ok(ModelArtifact {
            forest: model.forest,
            manifest: manifest.columns,
            stats: manifest.stats,
        })
    }
}
