use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Source provider failures
// ---------------------------------------------------------------------------

/// Failures raised by a [`crate::data::source::Session`] or while opening one.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot open {}: {reason}", .path.display())]
    Unavailable { path: PathBuf, reason: String },

    #[error("unknown region id `{0}`")]
    UnknownRegion(String),

    #[error("unknown feature id `{0}`")]
    UnknownFeature(String),

    #[error("unknown feature list id `{0}`")]
    UnknownFeatureList(String),

    /// Parallel arrays of unequal length or similar shape problems.
    #[error("inconsistent source data: {0}")]
    Inconsistent(String),

    #[error("session already closed")]
    Closed,
}

// ---------------------------------------------------------------------------
// Export failures
// ---------------------------------------------------------------------------

/// Fatal outcomes of an inspection or export call.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("source unavailable; close the file in any other application and try again")]
    SourceUnavailable {
        #[source]
        source: SourceError,
    },

    #[error("malformed region hierarchy: {0}")]
    MalformedHierarchy(String),

    #[error("failed to read {context} from source")]
    SourceReadFailure {
        context: String,
        #[source]
        source: SourceError,
    },

    #[error("failed to write {}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV encoding failed")]
    Csv(#[from] csv::Error),
}

impl ExportError {
    pub(crate) fn read(context: impl Into<String>, source: SourceError) -> Self {
        ExportError::SourceReadFailure {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ExportError::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            ExportError::MalformedHierarchy(_) => ErrorKind::MalformedHierarchy,
            ExportError::SourceReadFailure { .. } => ErrorKind::SourceReadFailure,
            ExportError::Output { .. } | ExportError::Csv(_) => ErrorKind::OutputFailure,
        }
    }
}

/// Coarse classification handed to the error sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SourceUnavailable,
    MalformedHierarchy,
    SourceReadFailure,
    OutputFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::SourceUnavailable => "source_unavailable",
            ErrorKind::MalformedHierarchy => "malformed_hierarchy",
            ErrorKind::SourceReadFailure => "source_read_failure",
            ErrorKind::OutputFailure => "output_failure",
        };
        f.write_str(s)
    }
}

pub type Result<T, E = ExportError> = std::result::Result<T, E>;
