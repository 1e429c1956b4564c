//! Asset error types
//!
//! Errors from texture loading and the asset cache.

use std::fmt;
use std::io;

/// Error type for asset operations
#[derive(Debug)]
pub enum AssetError {
    /// IO error (file not found, permission denied, etc.)
    Io(io::Error),
    /// File contents are not a usable asset
    Parse(String),
    /// Asset not found in the cache
    NotFound(String),
    /// The load was cancelled before it ran
    Cancelled(String),
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::Io(err) => write!(f, "Asset IO error: {}", err),
            AssetError::Parse(msg) => write!(f, "Asset parse error: {}", msg),
            AssetError::NotFound(path) => write!(f, "Asset not found: {}", path),
            AssetError::Cancelled(path) => write!(f, "Asset load cancelled: {}", path),
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for AssetError {
    fn from(err: io::Error) -> Self {
        AssetError::Io(err)
    }
}

impl From<String> for AssetError {
    fn from(msg: String) -> Self {
        AssetError::Parse(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_io_error_display_and_source() {
        let err = AssetError::from(io::Error::new(io::ErrorKind::NotFound, "earth.jpg missing"));
        assert!(err.to_string().contains("IO error"));
        assert!(err.to_string().contains("earth.jpg missing"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_other_variants() {
        assert_eq!(
            AssetError::Cancelled("a.png".into()).to_string(),
            "Asset load cancelled: a.png"
        );
        let err: AssetError = "bad header".to_string().into();
        assert!(matches!(err, AssetError::Parse(_)));
        assert!(err.source().is_none());
    }
}
