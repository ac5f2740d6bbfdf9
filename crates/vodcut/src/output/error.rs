use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Failure to produce or store a segmentation report.
#[derive(Debug)]
pub enum OutputError {
    Encode(serde_json::Error),
    Write { path: PathBuf, source: io::Error },
}

impl OutputError {
    pub(crate) fn write(path: &Path, source: io::Error) -> Self {
        OutputError::Write {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Destination the report was going to, when the failure was on disk.
    pub fn path(&self) -> Option<&Path> {
        match self {
            OutputError::Encode(_) => None,
            OutputError::Write { path, .. } => Some(path),
        }
    }
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputError::Encode(err) => write!(f, "failed to encode report: {err}"),
            OutputError::Write { path, source } => {
                write!(f, "failed to write report to {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutputError::Encode(err) => Some(err),
            OutputError::Write { source, .. } => Some(source),
        }
    }
}

impl From<serde_json::Error> for OutputError {
    fn from(value: serde_json::Error) -> Self {
        OutputError::Encode(value)
    }
}
