//! Loader error type (§7 `PackageNotFound`/`PackageParseError`/`PackageValidationError`).

use std::fmt;
use std::path::PathBuf;

/// Errors raised while loading or validating a manifest package.
#[derive(Debug)]
pub enum LoaderError {
    /// The manifest path does not exist.
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },
    /// A file failed to parse as YAML/JSON.
    Parse {
        /// The file that failed to parse.
        path: PathBuf,
        /// Why parsing failed.
        detail: String,
    },
    /// One or more resources failed validation.
    Validation {
        /// Every validation failure found, so operators fix them in one pass.
        messages: Vec<String>,
    },
    /// An I/O error occurred while walking the manifest tree.
    Io(std::io::Error),
}

impl fmt::Display for LoaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { path } => {
                write!(f, "manifest path not found: {}", path.display())
            }
            Self::Parse { path, detail } => {
                write!(f, "failed to parse {}: {detail}", path.display())
            }
            Self::Validation { messages } => {
                write!(f, "manifest validation failed:\n  - {}", messages.join("\n  - "))
            }
            Self::Io(e) => write!(f, "I/O error while loading manifests: {e}"),
        }
    }
}

impl std::error::Error for LoaderError {}

impl From<std::io::Error> for LoaderError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
