//! Latest user state.
//!
//! One row per user holding the summary fields leaderboards need. Every
//! accepted snapshot overwrites it; the last ingested snapshot wins even if
//! it carries a smaller play time.

use pusher_types::{KeyedCollection, SaveSnapshot, GOLDEN_PALBALL_KEY, RAINBOW_CHAIN_KEY};
use rusqlite::Connection;

use crate::{from_timestamp, to_timestamp, DbError, Result};

/// Overwrite the user's summary row from a freshly stored snapshot.
pub fn upsert(
    conn: &Connection,
    snapshot_id: i64,
    snapshot: &SaveSnapshot,
    achievements_count: i64,
    received_at: u64,
) -> Result<()> {
    let c = &snapshot.counters;
    let max_chain_rainbow = snapshot
        .keyed
        .get(KeyedCollection::BallChain, RAINBOW_CHAIN_KEY)
        .unwrap_or(0);
    let golden_palball_get = snapshot
        .keyed
        .get(KeyedCollection::PalballGet, GOLDEN_PALBALL_KEY)
        .unwrap_or(0);

    conn.prepare_cached(
        "INSERT INTO latest_user_state
         (user_id, save_id, version, credit_all, playtime, achievements_count,
          jacksp_startmax, golden_palball_get, cpm_max, max_chain_rainbow,
          jack_totalmax_v2, ult_combomax, ult_totalmax_v2, sp_use, hide_record,
          created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)
         ON CONFLICT(user_id) DO UPDATE SET
           save_id = excluded.save_id,
           version = excluded.version,
           credit_all = excluded.credit_all,
           playtime = excluded.playtime,
           achievements_count = excluded.achievements_count,
           jacksp_startmax = excluded.jacksp_startmax,
           golden_palball_get = excluded.golden_palball_get,
           cpm_max = excluded.cpm_max,
           max_chain_rainbow = excluded.max_chain_rainbow,
           jack_totalmax_v2 = excluded.jack_totalmax_v2,
           ult_combomax = excluded.ult_combomax,
           ult_totalmax_v2 = excluded.ult_totalmax_v2,
           sp_use = excluded.sp_use,
           hide_record = excluded.hide_record,
           updated_at = excluded.updated_at",
    )?
    .execute(rusqlite::params![
        snapshot.user_id,
        snapshot_id,
        c.version,
        c.credit_all,
        c.playtime,
        achievements_count,
        c.jacksp_startmax,
        golden_palball_get,
        c.cpm_max,
        max_chain_rainbow,
        c.jack_totalmax_v2,
        c.ult_combomax,
        c.ult_totalmax_v2,
        c.sp_use,
        c.hide_record,
        from_timestamp(received_at),
    ])?;
    Ok(())
}

/// Get the user's summary row.
pub fn get(conn: &Connection, user_id: &str) -> Result<LatestStateRow> {
    conn.query_row(
        "SELECT user_id, save_id, version, credit_all, playtime, achievements_count,
                jacksp_startmax, golden_palball_get, cpm_max, max_chain_rainbow,
                jack_totalmax_v2, ult_combomax, ult_totalmax_v2, sp_use, hide_record,
                created_at, updated_at
         FROM latest_user_state WHERE user_id = ?1",
        [user_id],
        |row| {
            Ok(LatestStateRow {
                user_id: row.get(0)?,
                save_id: row.get(1)?,
                version: row.get(2)?,
                credit_all: row.get(3)?,
                playtime: row.get(4)?,
                achievements_count: row.get(5)?,
                jacksp_startmax: row.get(6)?,
                golden_palball_get: row.get(7)?,
                cpm_max: row.get(8)?,
                max_chain_rainbow: row.get(9)?,
                jack_totalmax_v2: row.get(10)?,
                ult_combomax: row.get(11)?,
                ult_totalmax_v2: row.get(12)?,
                sp_use: row.get(13)?,
                hidden: row.get::<_, i64>(14)? != 0,
                created_at: to_timestamp(row.get(15)?),
                updated_at: to_timestamp(row.get(16)?),
            })
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("user '{user_id}'")),
        other => DbError::Sqlite(other),
    })
}

/// A raw latest-state row.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestStateRow {
    pub user_id: String,
    pub save_id: i64,
    pub version: i64,
    pub credit_all: i64,
    pub playtime: i64,
    pub achievements_count: i64,
    pub jacksp_startmax: i64,
    pub golden_palball_get: i64,
    pub cpm_max: f64,
    pub max_chain_rainbow: i64,
    pub jack_totalmax_v2: i64,
    pub ult_combomax: i64,
    pub ult_totalmax_v2: i64,
    pub sp_use: i64,
    pub hidden: bool,
    pub created_at: u64,
    pub updated_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures::{snapshot, store};

    #[test]
    fn test_latest_reflects_last_ingested() {
        let mut conn = crate::open_memory().expect("open");
        store(&mut conn, &snapshot("user-1", 10, 100), 1000);
        let second = store(&mut conn, &snapshot("user-1", 20, 200), 2000);

        let row = get(&conn, "user-1").expect("get");
        assert_eq!(row.credit_all, 200);
        assert_eq!(row.playtime, 20);
        assert_eq!(row.save_id, second);
        assert_eq!(row.created_at, 1000);
        assert_eq!(row.updated_at, 2000);
    }

    #[test]
    fn test_last_write_wins_out_of_order() {
        let mut conn = crate::open_memory().expect("open");
        store(&mut conn, &snapshot("user-1", 20, 200), 1000);
        store(&mut conn, &snapshot("user-1", 10, 100), 2000);

        let row = get(&conn, "user-1").expect("get");
        assert_eq!(row.playtime, 10);
        assert_eq!(row.credit_all, 100);
    }

    #[test]
    fn test_derived_fields() {
        let mut conn = crate::open_memory().expect("open");
        let mut s = snapshot("user-1", 10, 100);
        s.keyed.insert(KeyedCollection::BallChain, RAINBOW_CHAIN_KEY, 33);
        s.keyed.insert(KeyedCollection::BallChain, "1", 99);
        s.keyed.insert(KeyedCollection::PalballGet, GOLDEN_PALBALL_KEY, 4);
        s.counters.hide_record = 1;
        s.achievements = ["a", "b"].iter().map(|a| a.to_string()).collect();
        store(&mut conn, &s, 1000);

        let row = get(&conn, "user-1").expect("get");
        assert_eq!(row.max_chain_rainbow, 33);
        assert_eq!(row.golden_palball_get, 4);
        assert_eq!(row.achievements_count, 2);
        assert!(row.hidden);
    }

    #[test]
    fn test_achievement_count_is_ledger_size() {
        let mut conn = crate::open_memory().expect("open");
        let mut a = snapshot("user-1", 10, 0);
        a.achievements = ["x", "y"].iter().map(|s| s.to_string()).collect();
        store(&mut conn, &a, 1000);

        // A later upload that only lists one id keeps the ledger total.
        let mut b = snapshot("user-1", 20, 0);
        b.achievements = ["z"].iter().map(|s| s.to_string()).collect();
        store(&mut conn, &b, 2000);

        assert_eq!(get(&conn, "user-1").expect("get").achievements_count, 3);
    }

    #[test]
    fn test_get_missing_user() {
        let conn = crate::open_memory().expect("open");
        assert!(matches!(get(&conn, "ghost"), Err(DbError::NotFound(_))));
    }
}
