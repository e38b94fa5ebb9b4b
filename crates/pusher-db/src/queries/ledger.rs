//! Achievement ledger.
//!
//! Clients resend their full achievement list on every upload. Only ids the
//! ledger has not seen for the user are written, so each `(user_id,
//! achievement_id)` pair appears once and the per-snapshot log only holds
//! the ids a snapshot actually unlocked.

use std::collections::BTreeSet;

use rusqlite::Connection;

use crate::{from_timestamp, Result};

/// All achievement ids in the user's ledger.
pub fn achievement_ids(conn: &Connection, user_id: &str) -> Result<BTreeSet<String>> {
    let mut stmt =
        conn.prepare_cached("SELECT achievement_id FROM achievement_ledger WHERE user_id = ?1")?;
    let ids = stmt
        .query_map([user_id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<BTreeSet<_>, _>>()?;
    Ok(ids)
}

/// Number of ledger entries for the user.
pub fn count(conn: &Connection, user_id: &str) -> Result<i64> {
    let n = conn.query_row(
        "SELECT COUNT(*) FROM achievement_ledger WHERE user_id = ?1",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(n)
}

/// Ids first unlocked by one snapshot.
pub fn snapshot_unlocks(conn: &Connection, snapshot_id: i64) -> Result<BTreeSet<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT achievement_id FROM snapshot_achievements WHERE snapshot_id = ?1",
    )?;
    let ids = stmt
        .query_map([snapshot_id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<BTreeSet<_>, _>>()?;
    Ok(ids)
}

/// Record the ids in `achievements` the user has not unlocked before.
///
/// Must run inside the snapshot insert transaction. Returns the new ids in
/// sorted order.
pub fn record_new(
    conn: &Connection,
    user_id: &str,
    snapshot_id: i64,
    achievements: &BTreeSet<String>,
    unlocked_at: u64,
) -> Result<Vec<String>> {
    if achievements.is_empty() {
        return Ok(Vec::new());
    }

    let known = achievement_ids(conn, user_id)?;
    let new: Vec<String> = achievements.difference(&known).cloned().collect();

    let mut log = conn.prepare_cached(
        "INSERT INTO snapshot_achievements (snapshot_id, achievement_id) VALUES (?1, ?2)",
    )?;
    let mut ledger = conn.prepare_cached(
        "INSERT INTO achievement_ledger (user_id, achievement_id, first_snapshot_id, unlocked_at)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for id in &new {
        log.execute(rusqlite::params![snapshot_id, id])?;
        ledger.execute(rusqlite::params![
            user_id,
            id,
            snapshot_id,
            from_timestamp(unlocked_at)
        ])?;
    }

    Ok(new)
}
