use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Errors outside the language itself: files, configuration and targets.
/// Problems in Lamia source are [`crate::validate::Diagnostic`]s instead.
#[derive(Debug)]
pub enum LamiaError {
    Io { path: PathBuf, source: io::Error },
    Config { path: PathBuf, message: String },
    UnknownTarget(String),
    /// Parsing recovered nothing; no output was written.
    NoRoot { path: PathBuf },
}

impl LamiaError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        LamiaError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl fmt::Display for LamiaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LamiaError::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            LamiaError::Config { path, message } => {
                write!(f, "Invalid config {}: {}", path.display(), message)
            }
            LamiaError::UnknownTarget(name) => write!(
                f,
                "Unknown target '{}' (expected html5, es6, es5, typescript, css3, native or wasm)",
                name
            ),
            LamiaError::NoRoot { path } => {
                write!(f, "{}: compilation failed, no output written", path.display())
            }
        }
    }
}

impl std::error::Error for LamiaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LamiaError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
