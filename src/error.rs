use std::path::PathBuf;

/// Every failure the dashboard can report.
///
/// Each variant maps to a process exit code (see [`AppError::exit_code`]).
/// Artifact and prediction failures are recoverable: a serving session shows
/// the message and keeps running instead of exiting.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The source dataset does not exist. Fatal for training.
    #[error("Dataset '{}' not found. Provide one with `--dataset` or `demand sample`.", path.display())]
    MissingData { path: PathBuf },

    /// A persisted model or split file does not exist.
    #[error("Artifact '{}' not found. Run `demand train` first.", path.display())]
    MissingArtifact { path: PathBuf },

    /// A persisted artifact exists but cannot be decoded.
    #[error("Artifact '{}' is unreadable: {reason}", path.display())]
    CorruptArtifact { path: PathBuf, reason: String },

    #[error("{0}")]
    InvalidInput(String),

    /// The dataset is unusable for fitting (too few rows, degenerate classes).
    #[error("{0}")]
    Training(String),

    #[error("Prediction failed: {0}")]
    Prediction(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Terminal(String),
}

impl AppError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::CorruptArtifact {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::MissingData { .. } | AppError::InvalidInput(_) => 2,
            AppError::MissingArtifact { .. } | AppError::CorruptArtifact { .. } | AppError::Training(_) => 3,
            AppError::Prediction(_) | AppError::Io { .. } | AppError::Terminal(_) => 4,
        }
    }

    /// Whether a serving session can continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::MissingArtifact { .. }
                | AppError::CorruptArtifact { .. }
                | AppError::Prediction(_)
                | AppError::InvalidInput(_)
        )
    }
}
