//! Per-user history commands.

use serde::Deserialize;

use pusher_db::queries::{achievements, history};
use pusher_types::{AchievementUnlockPage, SaveHistoryPage};

use super::{authenticate_user, clamp_limit, UserRequest};
use crate::error::Result;
use crate::state::{run_blocking, ServerState};

pub const SAVE_HISTORY_DEFAULT: u32 = 20;
pub const SAVE_HISTORY_MAX: u32 = 100;
pub const ACHIEVEMENT_HISTORY_DEFAULT: u32 = 500;
pub const ACHIEVEMENT_HISTORY_MAX: u32 = 2000;

/// Parameters of a history request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryRequest {
    #[serde(flatten)]
    pub user: UserRequest,
    #[serde(default)]
    pub limit: Option<u32>,
    /// Only saves received strictly before this Unix time.
    #[serde(default)]
    pub before: Option<u64>,
}

/// Newest-first page of the user's saves.
pub async fn save_history(state: &ServerState, request: &HistoryRequest) -> Result<SaveHistoryPage> {
    let user_id = authenticate_user(state, &request.user)?;
    let limit = clamp_limit(request.limit, SAVE_HISTORY_DEFAULT, SAVE_HISTORY_MAX);
    let before = request.before;
    Ok(run_blocking(&state.db, move |conn| history::save_history(conn, &user_id, limit, before)).await?)
}

/// Oldest-first achievement unlocks with the total count. `before` is ignored.
pub async fn achievement_history(
    state: &ServerState,
    request: &HistoryRequest,
) -> Result<AchievementUnlockPage> {
    let user_id = authenticate_user(state, &request.user)?;
    let limit = clamp_limit(
        request.limit,
        ACHIEVEMENT_HISTORY_DEFAULT,
        ACHIEVEMENT_HISTORY_MAX,
    );
    Ok(run_blocking(&state.db, move |conn| achievements::unlock_history(conn, &user_id, limit)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;
    use crate::error::ServiceError;
    use pusher_db::queries::snapshots;
    use pusher_types::SaveSnapshot;

    async fn seeded() -> std::sync::Arc<ServerState> {
        let state = fixtures::state();
        {
            let mut conn = state.db.lock().await;
            for i in 1..=120_i64 {
                let mut snapshot = SaveSnapshot::new("user-1");
                snapshot.counters.playtime = i;
                snapshot.achievements.insert(format!("ach-{i:03}"));
                snapshots::insert(&mut conn, &snapshot, 1000 + i as u64).expect("insert");
            }
        }
        state
    }

    fn request(state: &ServerState, limit: Option<u32>, before: Option<u64>) -> HistoryRequest {
        HistoryRequest {
            user: UserRequest {
                user_id: "user-1".to_string(),
                sig: state.auth.sign_user("user-1").expect("sign"),
            },
            limit,
            before,
        }
    }

    #[tokio::test]
    async fn test_save_history_default_and_clamp() {
        let state = seeded().await;

        let page = save_history(&state, &request(&state, None, None)).await.expect("history");
        assert_eq!(page.items.len(), SAVE_HISTORY_DEFAULT as usize);
        assert_eq!(page.items[0].playtime, 120);
        assert!(page.has_more);

        let page = save_history(&state, &request(&state, Some(1000), None)).await.expect("history");
        assert_eq!(page.items.len(), SAVE_HISTORY_MAX as usize);

        let page = save_history(&state, &request(&state, Some(0), Some(1003))).await.expect("history");
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].playtime, 2);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn test_achievement_history() {
        let state = seeded().await;
        let page = achievement_history(&state, &request(&state, Some(5), None))
            .await
            .expect("history");
        assert_eq!(page.total, 120);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0].achievement_id, "ach-001");
    }

    #[tokio::test]
    async fn test_history_requires_signature() {
        let state = seeded().await;
        let mut bad = request(&state, None, None);
        bad.user.sig = "00".to_string();
        assert!(matches!(
            save_history(&state, &bad).await,
            Err(ServiceError::Auth)
        ));
        assert!(matches!(
            achievement_history(&state, &bad).await,
            Err(ServiceError::Auth)
        ));
    }

    #[test]
    fn test_request_binding() {
        let request: HistoryRequest = serde_json::from_value(serde_json::json!({
            "user_id": "user-1",
            "sig": "abc",
            "before": 1700000000_u64
        }))
        .expect("bind");
        assert_eq!(request.user.user_id, "user-1");
        assert_eq!(request.limit, None);
        assert_eq!(request.before, Some(1_700_000_000));
    }
}
