//! Service error taxonomy.
//!
//! Errors are classified where they occur and returned unmodified. The HTTP
//! layer maps each kind to a status code.

use std::sync::Arc;

use pusher_auth::AuthError;
use pusher_cache::CacheError;
use pusher_codec::CodecError;
use pusher_db::DbError;
use pusher_types::UnknownName;

/// Errors returned by service commands.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed payload, encoding or user id. Not retryable as-is.
    #[error("decode error: {0}")]
    Decode(String),

    /// Signature or identity mismatch. Carries no detail.
    #[error("invalid signature")]
    Auth,

    /// The snapshot is already stored; the upload was applied earlier.
    #[error("duplicate snapshot for {user_id} at playtime {playtime}")]
    Duplicate { user_id: String, playtime: i64 },

    #[error("not found: {0}")]
    NotFound(String),

    /// A request parameter names nothing the service knows.
    #[error("invalid parameter: {0}")]
    InvalidParams(String),

    /// The store failed; the transaction rolled back.
    #[error("store error: {0}")]
    Store(#[source] DbError),

    /// A cached query failed. Every caller waiting on it sees the same error.
    #[error("cached query failed: {0}")]
    Cache(Arc<DbError>),
}

impl ServiceError {
    /// The request was already applied and can be treated as success.
    pub fn is_already_applied(&self) -> bool {
        matches!(self, ServiceError::Duplicate { .. })
    }

    /// Resubmitting the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Store(_) | ServiceError::Cache(_))
    }
}

impl From<CodecError> for ServiceError {
    fn from(e: CodecError) -> Self {
        ServiceError::Decode(e.to_string())
    }
}

impl From<AuthError> for ServiceError {
    fn from(_: AuthError) -> Self {
        ServiceError::Auth
    }
}

impl From<DbError> for ServiceError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Duplicate { user_id, playtime } => ServiceError::Duplicate { user_id, playtime },
            DbError::NotFound(what) => ServiceError::NotFound(what),
            other => ServiceError::Store(other),
        }
    }
}

impl From<CacheError<DbError>> for ServiceError {
    fn from(e: CacheError<DbError>) -> Self {
        match e {
            CacheError::Load(inner) => ServiceError::Cache(inner),
        }
    }
}

impl From<UnknownName> for ServiceError {
    fn from(e: UnknownName) -> Self {
        ServiceError::InvalidParams(e.to_string())
    }
}

/// Convenience result type for service commands.
pub type Result<T> = std::result::Result<T, ServiceError>;
