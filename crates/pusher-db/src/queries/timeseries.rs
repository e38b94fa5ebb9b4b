//! Time-bucketed rollups.
//!
//! Snapshots are grouped into hour or day buckets by receipt time. Within a
//! bucket each user contributes only their most recent snapshot to the medal
//! total, active user count and average play time; `saves` counts every
//! snapshot in the bucket.

use pusher_types::{BucketUnit, TimeseriesBucket, TimeseriesReport};
use rusqlite::Connection;

use crate::{from_timestamp, to_timestamp, Result};

/// Buckets for the `window` units up to and including the one holding `now`.
pub fn timeseries(conn: &Connection, unit: BucketUnit, window: u32, now: u64) -> Result<TimeseriesReport> {
    let start = unit.window_start(now, window);
    let mut stmt = conn.prepare_cached(
        "WITH bucketed AS (
           SELECT user_id, credit_all, playtime,
                  (received_at / ?1) * ?1 AS bucket_start,
                  ROW_NUMBER() OVER (
                    PARTITION BY user_id, received_at / ?1
                    ORDER BY received_at DESC, id DESC
                  ) AS rn
           FROM snapshots
           WHERE received_at >= ?2
         )
         SELECT bucket_start,
                COALESCE(SUM(CASE WHEN rn = 1 THEN credit_all END), 0),
                SUM(CASE WHEN rn = 1 THEN 1 ELSE 0 END),
                COALESCE(AVG(CASE WHEN rn = 1 THEN playtime END), 0.0),
                COUNT(*)
         FROM bucketed
         GROUP BY bucket_start
         ORDER BY bucket_start ASC",
    )?;

    let unit_secs = from_timestamp(unit.secs());
    let buckets = stmt
        .query_map(rusqlite::params![unit_secs, from_timestamp(start)], |row| {
            Ok(TimeseriesBucket {
                bucket_start: to_timestamp(row.get(0)?),
                total_medals: row.get(1)?,
                active_users: u64::try_from(row.get::<_, i64>(2)?).unwrap_or(0),
                avg_playtime: row.get::<_, f64>(3)?.round() as i64,
                saves: u64::try_from(row.get::<_, i64>(4)?).unwrap_or(0),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(TimeseriesReport { unit, buckets })
}
