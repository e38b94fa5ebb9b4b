//! # pusher-codec
//!
//! Wire codec for client save uploads.
//!
//! - [`payload`] - multi-encoding payload decoding and tolerant JSON parsing
//! - [`loose`] - per-field loose number/string coercions
//! - [`user_id`] - decoding of the (possibly double-encoded) user id parameter
//! - [`escape`] - query escaping used by the signing protocol
//! - [`wire`] - encoding stored snapshots back into client JSON
//!
//! ## Decode flow
//!
//! 1. [`payload::decode_payload`] tries the Base64 alphabets in order and
//!    keeps the first result that looks like JSON, else query-unescapes.
//! 2. [`payload::parse_snapshot`] reads every known field with the loose
//!    rules in [`loose`]. Absent or mistyped fields become zero.

pub mod escape;
pub mod loose;
pub mod payload;
pub mod user_id;
pub mod wire;

pub use payload::{decode_payload, decode_snapshot, parse_snapshot};
pub use user_id::decode_user_id;
pub use wire::{encode_load_data, encode_snapshot};

/// Error types for codec operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The transport encoding (percent escapes) is malformed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The payload is not a JSON object.
    #[error("invalid JSON: {0}")]
    Json(String),
}

/// Convenience result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
