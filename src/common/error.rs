//! Error handling primitives shared across the pipeline.
//!
//! Every failure carries a stable numeric code so scripts driving the CLI can
//! branch on the exit status without parsing messages.

use std::path::PathBuf;

use thiserror::Error;

/// Stable error codes surfaced as process exit statuses.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TitanicCode {
    /// Success code used as a sentinel.
    Ok = 0,
    /// An input file was not present on disk.
    MissingFile = 1,
    /// A step needed a column the table does not carry.
    MissingColumn = 2,
    /// A statistic could not be fitted because every value was missing.
    DegenerateImputation = 3,
    /// Trained artefacts were not available.
    ModelMissing = 4,
    /// Input failed validation.
    InvalidInput = 5,
    /// IO, serialisation and other unexpected failures.
    Internal = 6,
}

/// Canonical error type for the crate.
#[derive(Debug, Error)]
pub enum TitanicError {
    #[error("file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("required column `{0}` is missing")]
    MissingColumn(String),

    #[error("cannot impute `{column}`: no known values in the fitting batch")]
    DegenerateImputation { column: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("model artefact missing: {}", .0.display())]
    ModelMissing(PathBuf),

    #[error("model and column manifest do not belong together ({model} != {manifest})")]
    ArtifactMismatch { model: String, manifest: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type TitanicResult<T> = Result<T, TitanicError>;

impl TitanicError {
    /// Validation helper.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Missing column helper.
    pub fn missing_column(name: impl Into<String>) -> Self {
        Self::MissingColumn(name.into())
    }

    /// Degenerate statistic helper.
    pub fn degenerate(column: impl Into<String>) -> Self {
        Self::DegenerateImputation {
            column: column.into(),
        }
    }

    /// Machine parsable code for this error.
    pub fn code(&self) -> TitanicCode {
        match self {
            Self::MissingFile(_) => TitanicCode::MissingFile,
            Self::MissingColumn(_) => TitanicCode::MissingColumn,
            Self::DegenerateImputation { .. } => TitanicCode::DegenerateImputation,
            Self::InvalidInput(_) => TitanicCode::InvalidInput,
            Self::ModelMissing(_) | Self::ArtifactMismatch { .. } => TitanicCode::ModelMissing,
            Self::Io(_) | Self::Csv(_) | Self::Json(_) => TitanicCode::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(TitanicCode::Ok as u32, 0);
        assert_eq!(TitanicCode::MissingFile as u32, 1);
        assert_eq!(TitanicCode::MissingColumn as u32, 2);
        assert_eq!(TitanicCode::DegenerateImputation as u32, 3);
        assert_eq!(TitanicCode::ModelMissing as u32, 4);
        assert_eq!(TitanicCode::InvalidInput as u32, 5);
        assert_eq!(TitanicCode::Internal as u32, 6);
    }

    #[test]
    fn artifact_mismatch_maps_to_model_missing() {
        let err = TitanicError::ArtifactMismatch {
            model: "a".into(),
            manifest: "b".into(),
        };
        assert_eq!(err.code(), TitanicCode::ModelMissing);
        assert!(err.to_string().contains("a != b"));
    }

    #[test]
    fn missing_column_message_names_the_column() {
        let err = TitanicError::missing_column("Fare");
        assert_eq!(err.code(), TitanicCode::MissingColumn);
        assert_eq!(err.to_string(), "required column `Fare` is missing");
    }
}
