//! Save upload commands.
//!
//! Upload flow:
//! 1. Decode the user id parameter
//! 2. Verify the signature over the raw parameters
//! 3. Decode the payload into a snapshot
//! 4. Reject a play time already stored for the user
//! 5. Insert snapshot, child rows, ledger entries and latest state in one
//!    transaction

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use pusher_db::queries::snapshots;
use pusher_db::DbError;

use super::{decode_user, unix_now, Verified};
use crate::error::{Result, ServiceError};
use crate::state::{run_blocking, ServerState};

/// Raw upload parameters as received.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveRequest {
    /// Encoded payload.
    pub data: String,
    pub user_id: String,
    pub sig: String,
}

/// Result of an accepted upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveReceipt {
    pub snapshot_id: i64,
    pub user_id: String,
    pub playtime: i64,
    /// Achievements first seen in this upload.
    pub new_achievements: Vec<String>,
    /// Size of the user's achievement ledger after this upload.
    pub achievements_count: i64,
}

/// Verify, decode and store one upload.
pub async fn submit_save(state: &ServerState, request: &SaveRequest) -> Result<SaveReceipt> {
    let user_id = authenticate_save(state, request)?;

    let snapshot = pusher_codec::decode_snapshot(&request.data, &user_id).map_err(|e| {
        warn!(user = %user_id, error = %e, "upload payload rejected");
        ServiceError::from(e)
    })?;
    let playtime = snapshot.playtime();

    let received_at = unix_now();
    let owner = user_id.clone();
    let outcome = run_blocking(&state.db, move |conn| {
        if snapshots::exists_duplicate(conn, &owner, playtime)? {
            return Err(DbError::Duplicate {
                user_id: owner,
                playtime,
            });
        }
        snapshots::insert(conn, &snapshot, received_at)
    })
    .await
    .map_err(|e| {
        match &e {
            DbError::Duplicate { .. } => warn!(user = %user_id, playtime, "duplicate upload rejected"),
            _ => warn!(user = %user_id, playtime, error = %e, "upload not stored"),
        }
        ServiceError::from(e)
    })?;

    info!(
        user = %user_id,
        playtime,
        snapshot_id = outcome.snapshot_id,
        new_achievements = outcome.new_achievements.len(),
        "upload stored"
    );

    Ok(SaveReceipt {
        snapshot_id: outcome.snapshot_id,
        user_id,
        playtime,
        new_achievements: outcome.new_achievements,
        achievements_count: outcome.achievements_count,
    })
}

/// Check an upload signature without storing anything.
pub fn verify_save(state: &ServerState, request: &SaveRequest) -> Result<Verified> {
    let user_id = authenticate_save(state, request)?;
    Ok(Verified { user_id })
}

fn authenticate_save(state: &ServerState, request: &SaveRequest) -> Result<String> {
    let user_id = decode_user(&request.user_id)?;
    state
        .auth
        .verify_save(&request.data, &request.user_id, &user_id, &request.sig)
        .map_err(|e| {
            warn!(user = %user_id, "upload signature rejected");
            ServiceError::from(e)
        })?;
    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;

    fn signed(state: &ServerState, data: &str, user_id: &str) -> SaveRequest {
        let sig = state.auth.sign_save(data, user_id, user_id).expect("sign");
        SaveRequest {
            data: data.to_string(),
            user_id: user_id.to_string(),
            sig,
        }
    }

    #[tokio::test]
    async fn test_submit_and_duplicate() {
        let state = fixtures::state();
        let request = signed(
            &state,
            r#"{"playtime": 10, "credit_all": 100, "l_achieve": ["a", 2]}"#,
            "user-1",
        );

        let receipt = submit_save(&state, &request).await.expect("submit");
        assert_eq!(receipt.user_id, "user-1");
        assert_eq!(receipt.playtime, 10);
        assert_eq!(receipt.new_achievements, vec!["2", "a"]);
        assert_eq!(receipt.achievements_count, 2);

        let err = submit_save(&state, &request).await.expect_err("duplicate");
        assert!(err.is_already_applied());
    }

    #[tokio::test]
    async fn test_bad_signature_stores_nothing() {
        let state = fixtures::state();
        let mut request = signed(&state, r#"{"playtime": 10}"#, "user-1");
        request.sig = "00".repeat(32);

        let err = submit_save(&state, &request).await.expect_err("auth");
        assert!(matches!(err, ServiceError::Auth));

        let conn = state.db.lock().await;
        assert!(!snapshots::exists_duplicate(&conn, "user-1", 10).expect("lookup"));
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let state = fixtures::state();
        let request = signed(&state, "[1, 2, 3]", "user-1");
        let err = submit_save(&state, &request).await.expect_err("decode");
        assert!(matches!(err, ServiceError::Decode(_)));
    }

    #[tokio::test]
    async fn test_missing_user_id() {
        let state = fixtures::state();
        let request = SaveRequest {
            data: "{}".to_string(),
            user_id: String::new(),
            sig: String::new(),
        };
        let err = submit_save(&state, &request).await.expect_err("missing");
        assert!(matches!(err, ServiceError::Decode(_)));
    }

    #[test]
    fn test_verify_save_only() {
        let state = fixtures::state();
        let request = signed(&state, "{}", "user 1");
        let verified = verify_save(&state, &request).expect("verify");
        assert_eq!(verified.user_id, "user 1");

        let mut tampered = request.clone();
        tampered.data.push(' ');
        assert!(verify_save(&state, &tampered).is_err());
    }
}
