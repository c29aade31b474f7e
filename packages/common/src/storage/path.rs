use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::StorageError;

/// Maximum accepted length of a blob path, in bytes.
const MAX_PATH_LEN: usize = 512;

/// A validated, relative blob path such as `productos/pan-dulce_imagen.jpg`.
///
/// Paths are `/`-separated, never absolute, never contain `..` or hidden
/// segments, and only use alphanumeric characters (accented letters included)
/// plus `-`, `_` and `.`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobPath(String);

impl BlobPath {
    /// Parse and validate a blob path.
    pub fn parse(path: &str) -> Result<Self, StorageError> {
        let trimmed = path.trim();

        if trimmed.is_empty() {
            return Err(StorageError::InvalidPath("path cannot be empty".into()));
        }
        if trimmed.len() > MAX_PATH_LEN {
            return Err(StorageError::InvalidPath(format!(
                "path exceeds maximum length of {MAX_PATH_LEN} bytes"
            )));
        }
        if trimmed.contains('\0') {
            return Err(StorageError::InvalidPath("path must not contain null bytes".into()));
        }
        if trimmed.contains('\\') {
            return Err(StorageError::InvalidPath("path must not contain backslashes".into()));
        }
        if trimmed.starts_with('/') || trimmed.ends_with('/') {
            return Err(StorageError::InvalidPath(
                "path must not start or end with '/'".into(),
            ));
        }

        for segment in trimmed.split('/') {
            if segment.is_empty() {
                return Err(StorageError::InvalidPath(
                    "path must not contain empty segments".into(),
                ));
            }
            // Also rejects "." and ".." traversal segments.
            if segment.starts_with('.') {
                return Err(StorageError::InvalidPath(
                    "path segments must not start with '.'".into(),
                ));
            }
        }

        if !trimmed
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '/' | '-' | '_' | '.'))
        {
            return Err(StorageError::InvalidPath(
                "path contains invalid characters (allowed: letters, digits, /, -, _, .)".into(),
            ));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final path segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// MIME type guessed from the extension.
    pub fn content_type(&self) -> String {
        mime_guess::from_path(&self.0)
            .first_or_octet_stream()
            .to_string()
    }
}

impl fmt::Debug for BlobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobPath({})", self.0)
    }
}

impl fmt::Display for BlobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BlobPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for BlobPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BlobPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
