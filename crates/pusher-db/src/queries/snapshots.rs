//! Snapshot persistence.
//!
//! [`insert`] writes one snapshot in a single transaction:
//!
//! 1. the parent row with every scalar counter
//! 2. keyed counter rows, skipping empty collections
//! 3. positional rows, one per list position
//! 4. newly unlocked achievements into the per-snapshot log and the ledger
//! 5. the user's latest-state summary row
//!
//! Any failure rolls the whole transaction back.

use pusher_types::{KeyedCollection, ListCollection, SaveSnapshot, Scalar, ScalarCounters};
use rusqlite::types::Value;
use rusqlite::{Connection, ErrorCode, OptionalExtension};

use crate::queries::{latest, ledger};
use crate::{from_timestamp, DbError, Result};

/// Result of a successful insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOutcome {
    pub snapshot_id: i64,
    /// Achievement ids first seen in this snapshot.
    pub new_achievements: Vec<String>,
    /// Size of the user's ledger after the insert.
    pub achievements_count: i64,
}

/// Whether a snapshot with this play time is already stored for the user.
pub fn exists_duplicate(conn: &Connection, user_id: &str, playtime: i64) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM snapshots WHERE user_id = ?1 AND playtime = ?2 LIMIT 1",
            rusqlite::params![user_id, playtime],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Insert a snapshot and everything derived from it atomically.
///
/// Returns [`DbError::Duplicate`] if the `(user_id, playtime)` pair already
/// exists, even when a concurrent writer got there after the caller's
/// [`exists_duplicate`] check.
pub fn insert(conn: &mut Connection, snapshot: &SaveSnapshot, received_at: u64) -> Result<InsertOutcome> {
    let tx = conn.transaction()?;

    let snapshot_id = insert_parent(&tx, snapshot, received_at).map_err(|e| match e {
        DbError::Sqlite(err) if is_unique_violation(&err) => DbError::Duplicate {
            user_id: snapshot.user_id.clone(),
            playtime: snapshot.playtime(),
        },
        other => other,
    })?;

    insert_counters(&tx, snapshot_id, snapshot)?;
    insert_positions(&tx, snapshot_id, snapshot)?;

    let new_achievements = ledger::record_new(
        &tx,
        &snapshot.user_id,
        snapshot_id,
        &snapshot.achievements,
        received_at,
    )?;
    let achievements_count = ledger::count(&tx, &snapshot.user_id)?;

    latest::upsert(&tx, snapshot_id, snapshot, achievements_count, received_at)?;

    tx.commit()?;

    tracing::debug!(
        snapshot_id,
        user_id = %snapshot.user_id,
        new_achievements = new_achievements.len(),
        "stored snapshot"
    );

    Ok(InsertOutcome {
        snapshot_id,
        new_achievements,
        achievements_count,
    })
}

fn insert_parent(conn: &Connection, snapshot: &SaveSnapshot, received_at: u64) -> Result<i64> {
    let columns = ScalarCounters::FIELDS.join(", ");
    let placeholders = (1..=ScalarCounters::FIELDS.len() + 2)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO snapshots (user_id, {columns}, received_at) VALUES ({placeholders})"
    );

    let mut values = Vec::with_capacity(ScalarCounters::FIELDS.len() + 2);
    values.push(Value::Text(snapshot.user_id.clone()));
    for name in ScalarCounters::FIELDS {
        values.push(match snapshot.counters.get(name) {
            Some(Scalar::Float(v)) => Value::Real(v),
            Some(Scalar::Int(v)) => Value::Integer(v),
            None => Value::Null,
        });
    }
    values.push(Value::Integer(from_timestamp(received_at)));

    conn.prepare_cached(&sql)?
        .execute(rusqlite::params_from_iter(values))?;
    Ok(conn.last_insert_rowid())
}

fn insert_counters(conn: &Connection, snapshot_id: i64, snapshot: &SaveSnapshot) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO snapshot_counters (snapshot_id, collection, entry_key, count)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (collection, entries) in snapshot.keyed.iter() {
        for (key, count) in entries {
            stmt.execute(rusqlite::params![snapshot_id, collection.as_str(), key, count])?;
        }
    }
    Ok(())
}

fn insert_positions(conn: &Connection, snapshot_id: i64, snapshot: &SaveSnapshot) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO snapshot_positions (snapshot_id, collection, position, value)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (collection, values) in snapshot.lists.iter() {
        for (position, value) in values.iter().enumerate() {
            stmt.execute(rusqlite::params![
                snapshot_id,
                collection.as_str(),
                position as i64,
                value
            ])?;
        }
    }
    Ok(())
}

/// Load a stored snapshot with its child collections.
///
/// The achievement set is this snapshot's slice of the unlock log, not the
/// user's full ledger; see [`latest_snapshot`] for that.
pub fn get(conn: &Connection, snapshot_id: i64) -> Result<SaveSnapshot> {
    let sql = format!(
        "SELECT user_id, {} FROM snapshots WHERE id = ?1",
        ScalarCounters::FIELDS.join(", ")
    );
    let mut snapshot = conn
        .query_row(&sql, [snapshot_id], |row| {
            let mut snapshot = SaveSnapshot::new(row.get::<_, String>(0)?);
            for (i, name) in ScalarCounters::FIELDS.iter().enumerate() {
                let scalar = if ScalarCounters::is_float(name) {
                    Scalar::Float(row.get(i + 1)?)
                } else {
                    Scalar::Int(row.get(i + 1)?)
                };
                snapshot.counters.set(name, scalar);
            }
            Ok(snapshot)
        })
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                DbError::NotFound(format!("snapshot {snapshot_id}"))
            }
            other => DbError::Sqlite(other),
        })?;

    let mut stmt = conn.prepare_cached(
        "SELECT collection, entry_key, count FROM snapshot_counters WHERE snapshot_id = ?1",
    )?;
    let counters = stmt
        .query_map([snapshot_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for (collection, key, count) in counters {
        let collection: KeyedCollection = collection
            .parse()
            .map_err(|e: pusher_types::UnknownName| DbError::Constraint(e.to_string()))?;
        snapshot.keyed.insert(collection, key, count);
    }

    let mut stmt = conn.prepare_cached(
        "SELECT collection, position, value FROM snapshot_positions
         WHERE snapshot_id = ?1
         ORDER BY collection, position",
    )?;
    let positions = stmt
        .query_map([snapshot_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for (collection, position, value) in positions {
        let collection: ListCollection = collection
            .parse()
            .map_err(|e: pusher_types::UnknownName| DbError::Constraint(e.to_string()))?;
        let position = usize::try_from(position)
            .map_err(|_| DbError::Constraint(format!("negative position {position}")))?;
        snapshot.lists.put(collection, position, value);
    }

    snapshot.achievements = ledger::snapshot_unlocks(conn, snapshot_id)?;

    Ok(snapshot)
}

/// Reassemble the user's latest snapshot with the full achievement ledger.
pub fn latest_snapshot(conn: &Connection, user_id: &str) -> Result<SaveSnapshot> {
    let state = latest::get(conn, user_id)?;
    let mut snapshot = get(conn, state.save_id)?;
    snapshot.achievements = ledger::achievement_ids(conn, user_id)?;
    Ok(snapshot)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures::{snapshot, store};

    fn full_snapshot() -> SaveSnapshot {
        let mut s = snapshot("user-1", 10, 100);
        s.counters.cpm_max = 12.75;
        s.counters.hide_record = 0;
        s.keyed.insert(KeyedCollection::BallChain, "3", 42);
        s.keyed.insert(KeyedCollection::PalballGet, "100", 7);
        s.keyed.insert(KeyedCollection::MedalGet, "gold", 5);
        s.lists.set(ListCollection::Perks, vec![1, 0, 3]);
        s.lists.set(ListCollection::TotemsPlacement, vec![2]);
        s.achievements = ["x", "y"].iter().map(|a| a.to_string()).collect();
        s
    }

    #[test]
    fn test_insert_and_get() {
        let mut conn = crate::open_memory().expect("open");
        let original = full_snapshot();
        let outcome = insert(&mut conn, &original, 1000).expect("insert");
        assert_eq!(outcome.new_achievements, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(outcome.achievements_count, 2);

        let loaded = get(&conn, outcome.snapshot_id).expect("get");
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_duplicate_detection() {
        let mut conn = crate::open_memory().expect("open");
        assert!(!exists_duplicate(&conn, "user-1", 10).expect("check"));
        store(&mut conn, &snapshot("user-1", 10, 100), 1000);
        assert!(exists_duplicate(&conn, "user-1", 10).expect("check"));
        assert!(!exists_duplicate(&conn, "user-1", 11).expect("check"));
        assert!(!exists_duplicate(&conn, "user-2", 10).expect("check"));
    }

    #[test]
    fn test_unique_constraint_maps_to_duplicate() {
        let mut conn = crate::open_memory().expect("open");
        store(&mut conn, &snapshot("user-1", 10, 100), 1000);
        let err = insert(&mut conn, &snapshot("user-1", 10, 999), 2000).expect_err("duplicate");
        assert!(matches!(err, DbError::Duplicate { playtime: 10, .. }));

        let credit: i64 = conn
            .query_row(
                "SELECT credit_all FROM latest_user_state WHERE user_id = 'user-1'",
                [],
                |row| row.get(0),
            )
            .expect("latest");
        assert_eq!(credit, 100);
    }

    #[test]
    fn test_failed_insert_rolls_back_children() {
        let mut conn = crate::open_memory().expect("open");
        // Make the latest-state upsert fail after the children were written.
        conn.execute_batch(
            "CREATE TRIGGER reject_latest BEFORE INSERT ON latest_user_state
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .expect("trigger");

        let result = insert(&mut conn, &full_snapshot(), 1000);
        assert!(result.is_err());

        for table in [
            "snapshots",
            "snapshot_counters",
            "snapshot_positions",
            "snapshot_achievements",
            "achievement_ledger",
        ] {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .expect("count");
            assert_eq!(count, 0, "{table} should be empty after rollback");
        }
    }

    #[test]
    fn test_empty_collections_write_no_rows() {
        let mut conn = crate::open_memory().expect("open");
        let id = store(&mut conn, &snapshot("user-1", 1, 0), 1000);
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM snapshot_counters WHERE snapshot_id = ?1",
                [id],
                |row| row.get(0),
            )
            .expect("count");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_latest_snapshot_uses_full_ledger() {
        let mut conn = crate::open_memory().expect("open");
        let mut first = snapshot("user-1", 10, 100);
        first.achievements.insert("x".to_string());
        store(&mut conn, &first, 1000);

        let mut second = snapshot("user-1", 20, 200);
        second.achievements.insert("z".to_string());
        store(&mut conn, &second, 2000);

        let latest = latest_snapshot(&conn, "user-1").expect("latest");
        assert_eq!(latest.counters.credit_all, 200);
        assert!(latest.achievements.contains("x"));
        assert!(latest.achievements.contains("z"));
    }

    #[test]
    fn test_latest_snapshot_not_found() {
        let conn = crate::open_memory().expect("open");
        assert!(matches!(
            latest_snapshot(&conn, "nobody"),
            Err(DbError::NotFound(_))
        ));
    }
}
