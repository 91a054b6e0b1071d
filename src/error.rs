use std::path::PathBuf;

/// Malformed content where a typed value was expected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("expected {expected}, got '{value}'")]
    Parse {
        value: String,
        expected: &'static str,
    },

    #[error("unknown unit '{unit}' in '{value}'")]
    Unit { value: String, unit: char },

    #[error("invalid {what}: '{value}'")]
    Invalid { what: &'static str, value: String },

    #[error("missing {0}")]
    Missing(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {path}")]
    NotFound { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("sysfs read failed: {path}: {source}")]
    SysfsRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse error for {path}: {source}")]
    Parse {
        path: PathBuf,
        source: DecodeError,
    },

    #[error("rejected sysfs name '{name}': {reason}")]
    Validation { name: String, reason: &'static str },

    #[error("command `{program}` failed: {detail}")]
    Command { program: String, detail: String },

    #[error("hardware detection failed: {0}")]
    Detection(String),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Classify an I/O error from reading `path` into the taxonomy callers match on.
    pub fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Error::PermissionDenied { path },
            _ => Error::SysfsRead { path, source },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// The kernel answers EINVAL for some attributes of a link that is down
    /// (`carrier`, `speed`).
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Error::SysfsRead { source, .. } if source.kind() == std::io::ErrorKind::InvalidInput
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
