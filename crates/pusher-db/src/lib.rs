//! # pusher-db
//!
//! Snapshot store and aggregation queries over SQLite.
//!
//! ## Schema
//!
//! - `snapshots`: one immutable row per accepted upload, scalar counters as
//!   columns, unique on `(user_id, playtime)`
//! - `snapshot_counters` / `snapshot_positions`: sparse keyed and positional
//!   child collections
//! - `snapshot_achievements`: per-snapshot log of newly unlocked achievements
//! - `achievement_ledger`: first unlock per `(user_id, achievement_id)`
//! - `latest_user_state`: one summary row per user, rewritten on every upload
//!
//! All timestamps are Unix epoch seconds, passed in by the caller. Schema
//! version is stored in `PRAGMA user_version`.

pub mod migrations;
pub mod queries;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A snapshot with this play time is already stored for the user.
    #[error("duplicate snapshot for {user_id} at playtime {playtime}")]
    Duplicate { user_id: String, playtime: i64 },

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The task running the store work stopped before returning.
    #[error("store task interrupted: {0}")]
    Interrupted(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the database at the given path.
///
/// Configures WAL mode, foreign keys, and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

/// Convert a stored timestamp column back to epoch seconds.
pub(crate) fn to_timestamp(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Convert epoch seconds for storage.
pub(crate) fn from_timestamp(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
