//! Render cache error types

use crate::storage::StorageError;

/// Cache error types
#[derive(Debug)]
pub enum CacheError {
    /// The backing cache namespace could not be read or written
    Storage(StorageError),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::Storage(err) => write!(f, "Cache storage error: {}", err),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Storage(err) => Some(err),
        }
    }
}

impl From<StorageError> for CacheError {
    fn from(err: StorageError) -> Self {
        CacheError::Storage(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::time::Duration;

    #[test]
    fn test_display_and_source() {
        let err = CacheError::from(StorageError::Timeout(Duration::from_secs(5)));
        assert_eq!(
            err.to_string(),
            "Cache storage error: storage call timed out after 5s"
        );
        assert!(err.source().is_some());
    }
}
