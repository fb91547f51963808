// Error type shared by every analysis step

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("failed to read ping log {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No PING title found, probably corrupted log file")]
    MissingTitle,

    #[error("invalid threshold {0} ms: expected a finite, non-negative number")]
    InvalidThreshold(f64),

    #[error("failed to serialize JSON report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to render HTML report: {0}")]
    Render(#[from] askama::Error),
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;

impl AnalysisError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }
}
