//! Leaderboard and aggregate commands, served through the query caches.

use pusher_db::queries::rankings::STATISTICS_LIMIT;
use pusher_types::{AchievementRates, RankingEntry, RankingMetric, Statistics, TimeseriesReport};

use super::clamp_limit;
use crate::error::Result;
use crate::state::ServerState;

pub const RANKING_DEFAULT: u32 = 50;
pub const MEDAL_TIMESERIES_DEFAULT_DAYS: u32 = 30;
pub const MEDAL_TIMESERIES_MAX_DAYS: u32 = 180;
pub const SAVE_ACTIVITY_DEFAULT_HOURS: u32 = 168;
pub const SAVE_ACTIVITY_MAX_HOURS: u32 = 720;

/// Top users by `metric`, e.g. `"credit_all"` or `"max_chain_orange"`.
pub async fn rankings(state: &ServerState, metric: &str, limit: Option<u32>) -> Result<Vec<RankingEntry>> {
    let metric: RankingMetric = metric.parse()?;
    let limit = clamp_limit(limit, RANKING_DEFAULT, STATISTICS_LIMIT);
    Ok(state.caches.rankings.get((metric, limit)).await?)
}

/// Sum of `credit_all` over every user's latest save.
pub async fn total_medals(state: &ServerState) -> Result<i64> {
    Ok(state.caches.total_medals.get(()).await?)
}

/// The nine statistics leaderboards and the medal total.
pub async fn statistics(state: &ServerState) -> Result<Statistics> {
    Ok(state.caches.statistics.get(()).await?)
}

pub async fn achievement_rates(state: &ServerState) -> Result<AchievementRates> {
    Ok(state.caches.achievement_rates.get(()).await?)
}

/// Daily medal totals over the last `days` days.
pub async fn medal_timeseries(state: &ServerState, days: Option<u32>) -> Result<TimeseriesReport> {
    let days = clamp_limit(days, MEDAL_TIMESERIES_DEFAULT_DAYS, MEDAL_TIMESERIES_MAX_DAYS);
    Ok(state.caches.medal_timeseries.get(days).await?)
}

/// Hourly save counts over the last `hours` hours.
pub async fn save_activity(state: &ServerState, hours: Option<u32>) -> Result<TimeseriesReport> {
    let hours = clamp_limit(hours, SAVE_ACTIVITY_DEFAULT_HOURS, SAVE_ACTIVITY_MAX_HOURS);
    Ok(state.caches.save_activity.get(hours).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{fixtures, unix_now};
    use crate::error::ServiceError;
    use pusher_db::queries::snapshots;
    use pusher_types::{BucketUnit, SaveSnapshot};

    async fn store(state: &ServerState, user: &str, playtime: i64, credit_all: i64) {
        let mut snapshot = SaveSnapshot::new(user);
        snapshot.counters.playtime = playtime;
        snapshot.counters.credit_all = credit_all;
        let mut conn = state.db.lock().await;
        snapshots::insert(&mut conn, &snapshot, unix_now()).expect("insert");
    }

    #[tokio::test]
    async fn test_rankings_by_name() {
        let state = fixtures::state();
        store(&state, "a", 1, 100).await;
        store(&state, "b", 1, 300).await;

        let top = rankings(&state, "credit_all", None).await.expect("rankings");
        let users: Vec<_> = top.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(users, vec!["b", "a"]);

        let top = rankings(&state, "credit_all", Some(0)).await.expect("rankings");
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_metric() {
        let state = fixtures::state();
        let err = rankings(&state, "favourite_colour", None)
            .await
            .expect_err("unknown");
        assert!(matches!(err, ServiceError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_total_medals_uses_latest_and_caches() {
        let state = fixtures::state();
        store(&state, "user-1", 10, 100).await;
        store(&state, "user-1", 20, 200).await;
        store(&state, "user-2", 5, 50).await;

        assert_eq!(total_medals(&state).await.expect("total"), 250);
        assert_eq!(statistics(&state).await.expect("stats").total_medals, 250);

        // Fresh value served from cache.
        store(&state, "user-3", 1, 1000).await;
        assert_eq!(total_medals(&state).await.expect("total"), 250);
        assert_eq!(state.caches.total_medals.loads(), 1);
    }

    #[tokio::test]
    async fn test_timeseries_clamps_window() {
        let state = fixtures::state();
        store(&state, "user-1", 10, 100).await;

        let report = medal_timeseries(&state, Some(10_000)).await.expect("series");
        assert_eq!(report.unit, BucketUnit::Day);
        assert_eq!(report.buckets.len(), 1);
        assert_eq!(report.buckets[0].total_medals, 100);

        let report = save_activity(&state, None).await.expect("activity");
        assert_eq!(report.unit, BucketUnit::Hour);
        assert_eq!(report.buckets[0].saves, 1);

        assert_eq!(state.caches.medal_timeseries.len(), 1);
        medal_timeseries(&state, Some(MEDAL_TIMESERIES_MAX_DAYS)).await.expect("series");
        assert_eq!(state.caches.medal_timeseries.loads(), 1);
    }

    #[tokio::test]
    async fn test_achievement_rates() {
        let state = fixtures::state();
        let mut snapshot = SaveSnapshot::new("user-1");
        snapshot.achievements.insert("first".to_string());
        {
            let mut conn = state.db.lock().await;
            snapshots::insert(&mut conn, &snapshot, unix_now()).expect("insert");
        }
        store(&state, "user-2", 1, 0).await;

        let rates = achievement_rates(&state).await.expect("rates");
        assert_eq!(rates.total_users, 1);
        assert_eq!(rates.rates["first"].rate, 1.0);
    }
}
