//! # pusher-auth
//!
//! Request authentication for save uploads and user data reads.
//!
//! Clients hold a per-user key derived from a server-wide master secret and
//! sign a fixed canonical string built from the raw query parameters. No
//! per-user key is ever stored.
//!
//! ## Modules
//!
//! - [`mac`] - HMAC-SHA256 signing and constant-time hex comparison
//! - [`canonical`] - the signed canonical string
//! - [`authenticator`] - [`Authenticator`], holding the configured secrets

pub mod authenticator;
pub mod canonical;
pub mod mac;

pub use authenticator::{AuthSecrets, Authenticator, UserKey};
pub use canonical::canonicalize;

/// Error types for authentication.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The signature did not verify. Deliberately carries no detail.
    #[error("invalid signature")]
    InvalidSignature,

    /// The MAC could not be keyed.
    #[error("key error: {0}")]
    Key(String),
}

/// Convenience result type for authentication.
pub type Result<T> = std::result::Result<T, AuthError>;
