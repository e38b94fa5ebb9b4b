//! Command handlers consumed by the HTTP layer.
//!
//! Each submodule implements one endpoint group. Handlers take the already
//! bound request parameters and return typed results.

pub mod history;
pub mod ingest;
pub mod load;
pub mod statistics;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, ServiceError};
use crate::state::ServerState;

/// Parameters of a read request for one user's data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRequest {
    pub user_id: String,
    pub sig: String,
}

/// Identity established by a verify-only request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verified {
    pub user_id: String,
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// `value` or `default`, clamped to `1..=max`.
pub fn clamp_limit(value: Option<u32>, default: u32, max: u32) -> u32 {
    value.unwrap_or(default).clamp(1, max)
}

/// Decode the user id parameter, rejecting an empty one.
pub(crate) fn decode_user(raw_user_id: &str) -> Result<String> {
    let user_id = pusher_codec::decode_user_id(raw_user_id)?;
    if user_id.is_empty() {
        return Err(ServiceError::Decode("missing user id".to_string()));
    }
    Ok(user_id)
}

/// Authenticate a read request and return the decoded user id.
pub(crate) fn authenticate_user(state: &ServerState, request: &UserRequest) -> Result<String> {
    let user_id = decode_user(&request.user_id)?;
    state
        .auth
        .verify_user(&request.user_id, &user_id, &request.sig)
        .map_err(|e| {
            warn!(user = %user_id, "read signature rejected");
            ServiceError::from(e)
        })?;
    Ok(user_id)
}
