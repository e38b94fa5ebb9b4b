//! Leaderboards and global totals.
//!
//! Summary metrics read `latest_user_state` directly. Chain metrics live only
//! in per-snapshot keyed counters, so each user's most recent snapshot is
//! picked with a window function first; a missing chain key ranks as 0.
//!
//! Ordering is metric descending, then the earliest `reference_at`, then user
//! id for a stable order. For summary metrics `reference_at` is when the user
//! first appeared, which later uploads never move. Leaderboards include every
//! user; only [`global_total`] can skip hidden ones.

use pusher_types::{KeyedCollection, RankingEntry, RankingMetric, Statistics};
use rusqlite::Connection;

use crate::{to_timestamp, DbError, Result};

/// Rows per leaderboard in the statistics bundle.
pub const STATISTICS_LIMIT: u32 = 1000;

/// Which users a global total covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    All,
    /// Skip users who opted out of public records.
    PublicOnly,
}

/// `latest_user_state` column backing a metric, if any.
fn summary_column(metric: RankingMetric) -> Option<&'static str> {
    match metric {
        RankingMetric::MaxChainItem | RankingMetric::MaxChainOrange => None,
        other => Some(other.as_str()),
    }
}

/// Top `limit` users by `metric`.
pub fn top_by_metric(conn: &Connection, metric: RankingMetric, limit: u32) -> Result<Vec<RankingEntry>> {
    if let Some(column) = summary_column(metric) {
        let sql = format!(
            "SELECT user_id, CAST({column} AS INTEGER) AS value, created_at
             FROM latest_user_state
             ORDER BY {column} DESC, created_at ASC, user_id ASC
             LIMIT ?1"
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map([limit], map_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        return Ok(rows);
    }

    let key = metric
        .chain_key()
        .ok_or_else(|| DbError::InvalidQuery(format!("no source for metric {metric}")))?;
    let mut stmt = conn.prepare_cached(
        "WITH latest AS (
           SELECT id, user_id, received_at,
                  ROW_NUMBER() OVER (
                    PARTITION BY user_id
                    ORDER BY received_at DESC, id DESC
                  ) AS rn
           FROM snapshots
         )
         SELECT l.user_id, COALESCE(c.count, 0) AS value, l.received_at
         FROM latest l
         LEFT JOIN snapshot_counters c
           ON c.snapshot_id = l.id AND c.collection = ?1 AND c.entry_key = ?2
         WHERE l.rn = 1
         ORDER BY value DESC, l.received_at ASC, l.user_id ASC
         LIMIT ?3",
    )?;
    let rows = stmt
        .query_map(
            rusqlite::params![KeyedCollection::BallChain.as_str(), key, limit],
            map_entry,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<RankingEntry> {
    Ok(RankingEntry {
        user_id: row.get(0)?,
        value: row.get(1)?,
        reference_at: to_timestamp(row.get(2)?),
    })
}

/// Sum of a summary field over all users' latest state.
pub fn global_total(conn: &Connection, metric: RankingMetric, visibility: Visibility) -> Result<i64> {
    let column = summary_column(metric)
        .ok_or_else(|| DbError::InvalidQuery(format!("{metric} is not a summary field")))?;
    let filter = match visibility {
        Visibility::All => "",
        Visibility::PublicOnly => "WHERE hide_record = 0",
    };
    let sql = format!(
        "SELECT CAST(COALESCE(SUM({column}), 0) AS INTEGER) FROM latest_user_state {filter}"
    );
    let total = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(total)
}

/// The nine bundled leaderboards plus the medal total over every user.
pub fn statistics(conn: &Connection) -> Result<Statistics> {
    let mut stats = Statistics::default();
    for metric in RankingMetric::STATISTICS {
        let entries = top_by_metric(conn, metric, STATISTICS_LIMIT)?;
        if let Some(slot) = stats.ranking_mut(metric) {
            *slot = entries;
        }
    }
    stats.total_medals = global_total(conn, RankingMetric::CreditAll, Visibility::All)?;
    Ok(stats)
}
