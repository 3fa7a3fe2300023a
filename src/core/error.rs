//! SP-007: Build error kinds.
//!
//! Every variant aborts the single build attempt that raised it. The watch
//! loop logs the error and waits for the next change.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while assembling, writing or running an artifact.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("circular include detected: {}", path.display())]
    CircularInclude { path: PathBuf },

    #[error("unmatched #:else at {}:{line}", file.display())]
    UnmatchedElse { file: PathBuf, line: usize },

    #[error("unmatched #:endif at {}:{line}", file.display())]
    UnmatchedEndif { file: PathBuf, line: usize },

    #[error("{open} unterminated #:if block(s) at end of {}", file.display())]
    UnterminatedConditional { file: PathBuf, open: usize },

    #[error("{directive} requires an argument at {}:{line}", file.display())]
    MissingArgument {
        directive: &'static str,
        file: PathBuf,
        line: usize,
    },

    #[error("include depth limit {limit} exceeded at {}", path.display())]
    DepthExceeded { path: PathBuf, limit: usize },

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sp007_circular_names_path() {
        let err = BuildError::CircularInclude {
            path: PathBuf::from("/proj/a.py"),
        };
        assert_eq!(err.to_string(), "circular include detected: /proj/a.py");
    }

    #[test]
    fn test_sp007_unmatched_messages() {
        let e = BuildError::UnmatchedElse {
            file: PathBuf::from("main.py"),
            line: 3,
        };
        assert_eq!(e.to_string(), "unmatched #:else at main.py:3");
        let e = BuildError::UnmatchedEndif {
            file: PathBuf::from("main.py"),
            line: 7,
        };
        assert_eq!(e.to_string(), "unmatched #:endif at main.py:7");
    }

    #[test]
    fn test_sp007_read_error_has_source() {
        let err = BuildError::Read {
            path: PathBuf::from("missing.py"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("missing.py"));
    }
}
