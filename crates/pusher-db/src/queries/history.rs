//! Per-user save history.

use pusher_types::{SaveHistoryEntry, SaveHistoryPage};
use rusqlite::Connection;

use crate::{from_timestamp, to_timestamp, Result};

/// Newest-first page of a user's snapshots.
///
/// With `before`, only snapshots received strictly earlier are returned.
/// One extra row is fetched to decide `has_more`.
pub fn save_history(
    conn: &Connection,
    user_id: &str,
    limit: u32,
    before: Option<u64>,
) -> Result<SaveHistoryPage> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, version, playtime, credit_all, medal_get, ball_get,
                jack_totalmax_v2, ult_totalmax_v2, cpm_max, blackbox_total, sp_use,
                received_at
         FROM snapshots
         WHERE user_id = ?1 AND (?2 IS NULL OR received_at < ?2)
         ORDER BY received_at DESC, id DESC
         LIMIT ?3",
    )?;

    let fetch = i64::from(limit) + 1;
    let mut items = stmt
        .query_map(
            rusqlite::params![user_id, before.map(from_timestamp), fetch],
            |row| {
                Ok(SaveHistoryEntry {
                    save_id: row.get(0)?,
                    version: row.get(1)?,
                    playtime: row.get(2)?,
                    credit_all: row.get(3)?,
                    medal_get: row.get(4)?,
                    ball_get: row.get(5)?,
                    jack_totalmax_v2: row.get(6)?,
                    ult_totalmax_v2: row.get(7)?,
                    cpm_max: row.get(8)?,
                    blackbox_total: row.get(9)?,
                    sp_use: row.get(10)?,
                    received_at: to_timestamp(row.get(11)?),
                })
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let has_more = items.len() > limit as usize;
    items.truncate(limit as usize);
    let next_before = if has_more {
        items.last().map(|e| e.received_at)
    } else {
        None
    };

    Ok(SaveHistoryPage {
        items,
        has_more,
        next_before,
    })
}
