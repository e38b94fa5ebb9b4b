//! Database query functions organized by concern.

pub mod achievements;
pub mod history;
pub mod latest;
pub mod ledger;
pub mod rankings;
pub mod snapshots;
pub mod timeseries;

#[cfg(test)]
pub(crate) mod fixtures {
    use pusher_types::SaveSnapshot;
    use rusqlite::Connection;

    /// A snapshot with the counters most tests care about.
    pub fn snapshot(user_id: &str, playtime: i64, credit_all: i64) -> SaveSnapshot {
        let mut snapshot = SaveSnapshot::new(user_id);
        snapshot.counters.playtime = playtime;
        snapshot.counters.credit_all = credit_all;
        snapshot
    }

    /// Insert and return the snapshot id.
    pub fn store(conn: &mut Connection, snapshot: &SaveSnapshot, received_at: u64) -> i64 {
        super::snapshots::insert(conn, snapshot, received_at)
            .expect("insert snapshot")
            .snapshot_id
    }
}
