//! Save download commands.

use serde::Serialize;

use pusher_db::queries::snapshots;
use pusher_types::SaveSnapshot;

use super::{authenticate_user, UserRequest, Verified};
use crate::error::Result;
use crate::state::{run_blocking, ServerState};

/// A load response: the encoded save and the server's signature over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedSave {
    /// Base64 of the client wire JSON.
    pub data: String,
    /// Hex HMAC of `data` under the load secret.
    pub sig: String,
}

/// The user's latest snapshot with their full achievement ledger.
pub async fn latest_save(state: &ServerState, user_id: &str) -> Result<SaveSnapshot> {
    let user_id = user_id.to_string();
    Ok(run_blocking(&state.db, move |conn| snapshots::latest_snapshot(conn, &user_id)).await?)
}

/// Authenticate and return the user's latest save, signed for the client.
pub async fn load_latest(state: &ServerState, request: &UserRequest) -> Result<SignedSave> {
    let user_id = authenticate_user(state, request)?;
    let snapshot = latest_save(state, &user_id).await?;
    let data = pusher_codec::encode_load_data(&snapshot)?;
    let sig = state.auth.sign_load_payload(&data)?;
    tracing::debug!(user = %user_id, playtime = snapshot.playtime(), "save loaded");
    Ok(SignedSave { data, sig })
}

/// Check a read signature without loading anything.
pub fn verify_load(state: &ServerState, request: &UserRequest) -> Result<Verified> {
    let user_id = authenticate_user(state, request)?;
    Ok(Verified { user_id })
}
