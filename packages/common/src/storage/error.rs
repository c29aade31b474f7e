use std::fmt;

/// Errors that can occur during blob storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// The requested blob was not found.
    NotFound(String),
    /// An I/O error occurred.
    Io(std::io::Error),
    /// The provided blob path is not acceptable.
    InvalidPath(String),
    /// The blob exceeds the configured size limit.
    SizeLimitExceeded { actual: u64, limit: u64 },
    /// The remote backend (S3, Supabase) rejected or failed the request.
    Backend { backend: &'static str, message: String },
    /// The backend is selected but its settings are missing or unusable.
    Misconfigured(String),
}

impl StorageError {
    pub fn backend(backend: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            backend,
            message: message.into(),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "blob not found: {path}"),
            Self::Io(err) => write!(f, "storage IO error: {err}"),
            Self::InvalidPath(msg) => write!(f, "invalid blob path: {msg}"),
            Self::SizeLimitExceeded { actual, limit } => {
                write!(f, "blob exceeds size limit ({actual} > {limit} bytes)")
            }
            Self::Backend { backend, message } => write!(f, "{backend} storage error: {message}"),
            Self::Misconfigured(msg) => write!(f, "storage misconfigured: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Reject blobs above `limit` before any backend work happens.
pub(crate) fn ensure_within_limit(len: usize, limit: u64) -> Result<(), StorageError> {
    let actual = len as u64;
    if actual > limit {
        return Err(StorageError::SizeLimitExceeded { actual, limit });
    }
    Ok(())
}
