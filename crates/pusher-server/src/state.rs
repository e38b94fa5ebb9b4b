//! Shared service state.

use std::hash::Hash;
use std::sync::Arc;

use pusher_auth::Authenticator;
use pusher_cache::{CachePolicy, FreshCache};
use pusher_db::queries::{achievements, rankings, timeseries};
use pusher_db::DbError;
use pusher_types::{AchievementRates, BucketUnit, RankingEntry, RankingMetric, Statistics, TimeseriesReport};
use rusqlite::Connection;
use tracing::info;

use crate::commands::unix_now;
use crate::config::{CacheConfig, ServerConfig};

/// Database handle shared by commands and cache loaders.
///
/// A single connection, so store work is serialized: uploads from different
/// users queue on this lock instead of running side by side. SQLite admits
/// one writer at a time regardless.
pub type SharedDb = Arc<tokio::sync::Mutex<Connection>>;

/// Run store work on the blocking pool while holding the connection.
pub async fn run_blocking<T, F>(db: &SharedDb, work: F) -> pusher_db::Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut Connection) -> pusher_db::Result<T> + Send + 'static,
{
    let db = Arc::clone(db);
    tokio::task::spawn_blocking(move || {
        let mut conn = db.blocking_lock();
        work(&mut conn)
    })
    .await
    .map_err(|e| DbError::Interrupted(e.to_string()))?
}

/// Service-wide shared state.
pub struct ServerState {
    pub db: SharedDb,
    pub config: ServerConfig,
    pub auth: Authenticator,
    pub caches: QueryCaches,
}

impl ServerState {
    /// Open the configured database and build the state around it.
    pub fn open(config: ServerConfig) -> anyhow::Result<Arc<Self>> {
        let conn = match config.database_path() {
            Some(path) => {
                info!(path = %path.display(), "opening snapshot store");
                pusher_db::open(&path)?
            }
            None => {
                info!("opening in-memory snapshot store");
                pusher_db::open_memory()?
            }
        };
        Ok(Self::with_connection(config, conn))
    }

    /// Build the state around an already-open connection.
    pub fn with_connection(config: ServerConfig, conn: Connection) -> Arc<Self> {
        let db: SharedDb = Arc::new(tokio::sync::Mutex::new(conn));
        let caches = QueryCaches::new(&config.cache, &db);
        let auth = Authenticator::new(config.secrets());
        Arc::new(Self {
            db,
            config,
            auth,
            caches,
        })
    }
}

/// One cache per aggregate query.
pub struct QueryCaches {
    /// Keyed by metric and limit.
    pub rankings: FreshCache<(RankingMetric, u32), Vec<RankingEntry>, DbError>,
    pub total_medals: FreshCache<(), i64, DbError>,
    pub statistics: FreshCache<(), Statistics, DbError>,
    pub achievement_rates: FreshCache<(), AchievementRates, DbError>,
    /// Keyed by window in days.
    pub medal_timeseries: FreshCache<u32, TimeseriesReport, DbError>,
    /// Keyed by window in hours.
    pub save_activity: FreshCache<u32, TimeseriesReport, DbError>,
}

impl QueryCaches {
    pub fn new(config: &CacheConfig, db: &SharedDb) -> Self {
        Self {
            rankings: db_cache("rankings", config.rankings.policy(), db, |conn, (metric, limit)| {
                rankings::top_by_metric(conn, metric, limit)
            }),
            total_medals: db_cache("total_medals", config.total_medals.policy(), db, |conn, ()| {
                rankings::global_total(conn, RankingMetric::CreditAll, rankings::Visibility::All)
            }),
            statistics: db_cache("statistics", config.statistics.policy(), db, |conn, ()| {
                rankings::statistics(conn)
            }),
            achievement_rates: db_cache(
                "achievement_rates",
                config.achievement_rates.policy(),
                db,
                |conn, ()| achievements::rates(conn),
            ),
            medal_timeseries: db_cache(
                "medal_timeseries",
                config.medal_timeseries.policy(),
                db,
                |conn, days| timeseries::timeseries(conn, BucketUnit::Day, days, unix_now()),
            ),
            save_activity: db_cache(
                "save_activity",
                config.save_activity.policy(),
                db,
                |conn, hours| timeseries::timeseries(conn, BucketUnit::Hour, hours, unix_now()),
            ),
        }
    }
}

fn db_cache<K, V>(
    name: &'static str,
    policy: CachePolicy,
    db: &SharedDb,
    query: fn(&Connection, K) -> pusher_db::Result<V>,
) -> FreshCache<K, V, DbError>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let db = Arc::clone(db);
    FreshCache::new(name, policy, move |key: K| {
        let db = Arc::clone(&db);
        async move { run_blocking(&db, move |conn| query(conn, key)).await }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;
    use pusher_db::queries::snapshots;
    use pusher_types::SaveSnapshot;

    #[tokio::test]
    async fn test_run_blocking_commits_and_reads() {
        let state = fixtures::state();
        let mut snapshot = SaveSnapshot::new("user-1");
        snapshot.counters.playtime = 7;

        let outcome = run_blocking(&state.db, move |conn| snapshots::insert(conn, &snapshot, 1000))
            .await
            .expect("insert");
        assert_eq!(outcome.achievements_count, 0);

        let found = run_blocking(&state.db, |conn| snapshots::exists_duplicate(conn, "user-1", 7))
            .await
            .expect("lookup");
        assert!(found);
    }

    #[tokio::test]
    async fn test_run_blocking_returns_store_errors() {
        let state = fixtures::state();
        let err = run_blocking(&state.db, |conn| snapshots::latest_snapshot(conn, "ghost"))
            .await
            .expect_err("missing");
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_uploads_from_different_users() {
        let state = fixtures::state();
        let tasks = (0..8).map(|i| {
            let db = Arc::clone(&state.db);
            tokio::spawn(async move {
                let mut snapshot = SaveSnapshot::new(&format!("user-{i}"));
                snapshot.counters.playtime = 1;
                run_blocking(&db, move |conn| snapshots::insert(conn, &snapshot, 1000)).await
            })
        });
        for task in tasks.collect::<Vec<_>>() {
            task.await.expect("join").expect("insert");
        }

        let conn = state.db.lock().await;
        for i in 0..8 {
            assert!(snapshots::exists_duplicate(&conn, &format!("user-{i}"), 1).expect("lookup"));
        }
    }
}
