use latch_storage::StoreError;
use thiserror::Error;

/// Error taxonomy for permission-gated console operations.
#[derive(Debug, Error)]
pub enum AccessError {
    /// No authenticated session.
    #[error("not authenticated")]
    Unauthenticated,

    /// Authenticated but lacking the required role or capability.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Sign-in is still resolving the identity; callers should wait and
    /// retry rather than treat this as a denial.
    #[error("session not ready")]
    NotReady,

    /// The underlying store failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for AccessError {
    fn from(error: StoreError) -> Self {
        Self::StoreUnavailable(error.to_string())
    }
}
