//! Achievement rates and unlock history.

use pusher_types::{AchievementRates, AchievementUnlockEntry, AchievementUnlockPage};
use rusqlite::Connection;

use crate::{to_timestamp, Result};

/// Share of ledger users holding each achievement.
pub fn rates(conn: &Connection) -> Result<AchievementRates> {
    let total_users: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT user_id) FROM achievement_ledger",
        [],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare_cached(
        "SELECT achievement_id, COUNT(*) FROM achievement_ledger GROUP BY achievement_id",
    )?;
    let counts = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .map(|r| r.map(|(id, n)| (id, n.max(0) as u64)))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(AchievementRates::from_counts(total_users.max(0) as u64, counts))
}

/// Oldest-first unlocks for a user, capped at `limit`, with the total count.
pub fn unlock_history(conn: &Connection, user_id: &str, limit: u32) -> Result<AchievementUnlockPage> {
    let total: i64 = conn.query_row(
        "SELECT COUNT(*)
         FROM snapshot_achievements a
         JOIN snapshots s ON a.snapshot_id = s.id
         WHERE s.user_id = ?1",
        [user_id],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare_cached(
        "SELECT a.achievement_id, s.received_at, s.playtime, a.snapshot_id
         FROM snapshot_achievements a
         JOIN snapshots s ON a.snapshot_id = s.id
         WHERE s.user_id = ?1
         ORDER BY s.received_at ASC, a.snapshot_id ASC, a.achievement_id ASC
         LIMIT ?2",
    )?;
    let items = stmt
        .query_map(rusqlite::params![user_id, limit], |row| {
            Ok(AchievementUnlockEntry {
                achievement_id: row.get(0)?,
                unlocked_at: to_timestamp(row.get(1)?),
                playtime: row.get(2)?,
                save_id: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(AchievementUnlockPage {
        items,
        total: total.max(0) as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures::{snapshot, store};

    fn with_achievements(user: &str, playtime: i64, ids: &[&str]) -> pusher_types::SaveSnapshot {
        let mut s = snapshot(user, playtime, 0);
        s.achievements = ids.iter().map(|a| a.to_string()).collect();
        s
    }

    #[test]
    fn test_rates() {
        let mut conn = crate::open_memory().expect("open");
        store(&mut conn, &with_achievements("a", 1, &["x", "y"]), 1000);
        store(&mut conn, &with_achievements("b", 1, &["x"]), 1000);
        store(&mut conn, &with_achievements("a", 2, &["x", "y"]), 2000);

        let rates = rates(&conn).expect("rates");
        assert_eq!(rates.total_users, 2);
        assert_eq!(rates.rates["x"].count, 2);
        assert_eq!(rates.rates["x"].rate, 1.0);
        assert_eq!(rates.rates["y"].rate, 0.5);
    }

    #[test]
    fn test_rates_empty() {
        let conn = crate::open_memory().expect("open");
        let rates = rates(&conn).expect("rates");
        assert_eq!(rates.total_users, 0);
        assert!(rates.rates.is_empty());
    }

    #[test]
    fn test_unlock_history_order_and_total() {
        let mut conn = crate::open_memory().expect("open");
        store(&mut conn, &with_achievements("a", 10, &["b", "a"]), 1000);
        store(&mut conn, &with_achievements("a", 20, &["a", "b", "c"]), 2000);
        store(&mut conn, &with_achievements("other", 5, &["z"]), 500);

        let page = unlock_history(&conn, "a", 2).expect("history");
        assert_eq!(page.total, 3);
        let ids: Vec<_> = page.items.iter().map(|e| e.achievement_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(page.items[0].unlocked_at, 1000);
        assert_eq!(page.items[0].playtime, 10);

        let page = unlock_history(&conn, "a", 10).expect("history");
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.items[2].achievement_id, "c");
        assert_eq!(page.items[2].unlocked_at, 2000);
    }
}
