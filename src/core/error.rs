use thiserror::Error;

use crate::models::UnknownVariant;
use crate::services::StoreError;

/// Errors returned by the matching core
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A duplicate active match reached the store. Single-writer-per-pair
    /// should make this unreachable.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type MatchResult<T> = Result<T, MatchError>;

impl From<StoreError> for MatchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => MatchError::NotFound(msg),
            StoreError::Conflict(msg) => MatchError::Conflict(msg),
            StoreError::Unavailable(msg) => MatchError::Unavailable(msg),
            StoreError::Corrupt(msg) | StoreError::Backend(msg) => MatchError::Internal(msg),
        }
    }
}

impl From<UnknownVariant> for MatchError {
    fn from(err: UnknownVariant) -> Self {
        MatchError::InvalidArgument(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            MatchError::from(StoreError::Conflict("pair".into())),
            MatchError::Conflict(_)
        ));
        assert!(matches!(
            MatchError::from(StoreError::Corrupt("row".into())),
            MatchError::Internal(_)
        ));
        assert!(matches!(
            MatchError::from(StoreError::Unavailable("down".into())),
            MatchError::Unavailable(_)
        ));
    }
}
