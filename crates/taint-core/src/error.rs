//! Error taxonomy for the taint analyzer.

use thiserror::Error;

/// Result type alias used across the taint-analysis crates.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// The analyzer's internal failure taxonomy. None of these propagate out of
/// the public entry points (`scan_parser`, `analyse_params`) — callers only
/// ever see a (possibly empty) list of findings or a fallback verdict; see
/// each variant's call site for how it is swallowed.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("parse error: {message}")]
    Parse { message: String },

    #[error("include path constant unresolved: {name}")]
    IncludeResolutionMiss { name: String },

    #[error("could not open include target {path}: {source}")]
    IncludeOpenFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("analysis depth exceeded {limit}")]
    DepthExceeded { limit: usize },

    #[error("expected structural field missing on node: {field}")]
    AttributeMismatch { field: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn include_resolution_miss(name: impl Into<String>) -> Self {
        Self::IncludeResolutionMiss { name: name.into() }
    }

    pub fn include_open_failure(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::IncludeOpenFailure {
            path: path.into(),
            source,
        }
    }

    pub fn attribute_mismatch(field: impl Into<String>) -> Self {
        Self::AttributeMismatch {
            field: field.into(),
        }
    }

    /// Whether the scan should keep going after logging this error, as
    /// opposed to aborting the current branch with an `UNCONTROLLED`
    /// verdict. Only depth exhaustion and include-open failures are
    /// recoverable within a trace; parse errors abort the whole scan.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Parse { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_is_not_recoverable() {
        let err = AnalysisError::parse("unexpected token");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn depth_exceeded_is_recoverable() {
        let err = AnalysisError::DepthExceeded { limit: 20 };
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "analysis depth exceeded 20");
    }

    #[test]
    fn include_open_failure_wraps_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = AnalysisError::include_open_failure("a.php", io);
        assert!(matches!(err, AnalysisError::IncludeOpenFailure { .. }));
    }
}
