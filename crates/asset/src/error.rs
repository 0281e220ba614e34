//! Load errors.

use std::path::PathBuf;

use thiserror::Error;

pub type LoadResult<T> = Result<T, LoadError>;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Path does not carry an `.obj` extension.
    #[error("unsupported file format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("OBJ contained no faces")]
    NoGeometry,
}

/// Coarse classification of a [`LoadError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum LoadErrorKind {
    NotFound,
    Io,
    UnsupportedFormat,
    Parse,
}

impl LoadError {
    pub(crate) fn parse(line_no: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line: line_no + 1,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> LoadErrorKind {
        match self {
            Self::NotFound { .. } => LoadErrorKind::NotFound,
            Self::Io { .. } => LoadErrorKind::Io,
            Self::UnsupportedFormat { .. } => LoadErrorKind::UnsupportedFormat,
            Self::Parse { .. } | Self::NoGeometry => LoadErrorKind::Parse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_reports_one_based_line() {
        let err = LoadError::parse(4, "bad index");
        assert_eq!(err.to_string(), "line 5: bad index");
        assert_eq!(err.kind(), LoadErrorKind::Parse);
    }

    #[test]
    fn empty_file_is_a_parse_failure() {
        assert_eq!(LoadError::NoGeometry.kind(), LoadErrorKind::Parse);
    }
}
