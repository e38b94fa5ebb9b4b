//! SQL schema definitions.
//!
//! Scalar counter columns of `snapshots` mirror `ScalarCounters::FIELDS`
//! one to one; the insert and load statements are built from that list.

/// Complete schema for the v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Snapshots
-- ============================================================

CREATE TABLE IF NOT EXISTS snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    legacy INTEGER NOT NULL DEFAULT 0,
    version INTEGER NOT NULL DEFAULT 0,
    credit INTEGER NOT NULL DEFAULT 0,
    credit_all INTEGER NOT NULL DEFAULT 0,
    medal_in INTEGER NOT NULL DEFAULT 0,
    medal_get INTEGER NOT NULL DEFAULT 0,
    ball_get INTEGER NOT NULL DEFAULT 0,
    ball_chain INTEGER NOT NULL DEFAULT 0,
    slot_start INTEGER NOT NULL DEFAULT 0,
    slot_startfev INTEGER NOT NULL DEFAULT 0,
    slot_hit INTEGER NOT NULL DEFAULT 0,
    slot_getfev INTEGER NOT NULL DEFAULT 0,
    sqr_get INTEGER NOT NULL DEFAULT 0,
    sqr_step INTEGER NOT NULL DEFAULT 0,
    jack_get INTEGER NOT NULL DEFAULT 0,
    jack_startmax INTEGER NOT NULL DEFAULT 0,
    jack_totalmax INTEGER NOT NULL DEFAULT 0,
    ult_get INTEGER NOT NULL DEFAULT 0,
    ult_combomax INTEGER NOT NULL DEFAULT 0,
    ult_totalmax INTEGER NOT NULL DEFAULT 0,
    rmshbi_get INTEGER NOT NULL DEFAULT 0,
    buy_shbi INTEGER NOT NULL DEFAULT 0,
    bstp_step INTEGER NOT NULL DEFAULT 0,
    bstp_rwd INTEGER NOT NULL DEFAULT 0,
    buy_total INTEGER NOT NULL DEFAULT 0,
    sp_use INTEGER NOT NULL DEFAULT 0,
    skill_point INTEGER NOT NULL DEFAULT 0,
    blackbox INTEGER NOT NULL DEFAULT 0,
    blackbox_total INTEGER NOT NULL DEFAULT 0,
    hide_record INTEGER NOT NULL DEFAULT 0,
    cpm_max REAL NOT NULL DEFAULT 0,
    jack_totalmax_v2 INTEGER NOT NULL DEFAULT 0,
    ult_totalmax_v2 INTEGER NOT NULL DEFAULT 0,
    palball_get INTEGER NOT NULL DEFAULT 0,
    pallot_lot_t0 INTEGER NOT NULL DEFAULT 0,
    pallot_lot_t1 INTEGER NOT NULL DEFAULT 0,
    pallot_lot_t2 INTEGER NOT NULL DEFAULT 0,
    pallot_lot_t3 INTEGER NOT NULL DEFAULT 0,
    pallot_lot_t4 INTEGER NOT NULL DEFAULT 0,
    jacksp_get_all INTEGER NOT NULL DEFAULT 0,
    jacksp_get_t0 INTEGER NOT NULL DEFAULT 0,
    jacksp_get_t1 INTEGER NOT NULL DEFAULT 0,
    jacksp_get_t2 INTEGER NOT NULL DEFAULT 0,
    jacksp_get_t3 INTEGER NOT NULL DEFAULT 0,
    jacksp_get_t4 INTEGER NOT NULL DEFAULT 0,
    jacksp_startmax INTEGER NOT NULL DEFAULT 0,
    jacksp_totalmax INTEGER NOT NULL DEFAULT 0,
    task_cnt INTEGER NOT NULL DEFAULT 0,
    totem_altars INTEGER NOT NULL DEFAULT 0,
    totem_altars_credit INTEGER NOT NULL DEFAULT 0,
    firstboot INTEGER NOT NULL DEFAULT 0,
    lastsave INTEGER NOT NULL DEFAULT 0,
    playtime INTEGER NOT NULL DEFAULT 0,
    received_at INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_snapshots_user_playtime ON snapshots(user_id, playtime);
CREATE INDEX IF NOT EXISTS idx_snapshots_user_received ON snapshots(user_id, received_at);
CREATE INDEX IF NOT EXISTS idx_snapshots_received ON snapshots(received_at);

CREATE TABLE IF NOT EXISTS snapshot_counters (
    snapshot_id INTEGER NOT NULL REFERENCES snapshots(id) ON DELETE CASCADE,
    collection TEXT NOT NULL,
    entry_key TEXT NOT NULL,
    count INTEGER NOT NULL,
    PRIMARY KEY (snapshot_id, collection, entry_key)
);

CREATE INDEX IF NOT EXISTS idx_snapshot_counters_key ON snapshot_counters(collection, entry_key);

CREATE TABLE IF NOT EXISTS snapshot_positions (
    snapshot_id INTEGER NOT NULL REFERENCES snapshots(id) ON DELETE CASCADE,
    collection TEXT NOT NULL,
    position INTEGER NOT NULL,
    value INTEGER NOT NULL,
    PRIMARY KEY (snapshot_id, collection, position)
);

-- ============================================================
-- Achievements
-- ============================================================

CREATE TABLE IF NOT EXISTS snapshot_achievements (
    snapshot_id INTEGER NOT NULL REFERENCES snapshots(id) ON DELETE CASCADE,
    achievement_id TEXT NOT NULL,
    PRIMARY KEY (snapshot_id, achievement_id)
);

CREATE TABLE IF NOT EXISTS achievement_ledger (
    user_id TEXT NOT NULL,
    achievement_id TEXT NOT NULL,
    first_snapshot_id INTEGER NOT NULL REFERENCES snapshots(id),
    unlocked_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, achievement_id)
);

CREATE INDEX IF NOT EXISTS idx_achievement_ledger_id ON achievement_ledger(achievement_id);

-- ============================================================
-- Latest user state
-- ============================================================

CREATE TABLE IF NOT EXISTS latest_user_state (
    user_id TEXT PRIMARY KEY,
    save_id INTEGER NOT NULL REFERENCES snapshots(id),
    version INTEGER NOT NULL DEFAULT 0,
    credit_all INTEGER NOT NULL DEFAULT 0,
    playtime INTEGER NOT NULL DEFAULT 0,
    achievements_count INTEGER NOT NULL DEFAULT 0,
    jacksp_startmax INTEGER NOT NULL DEFAULT 0,
    golden_palball_get INTEGER NOT NULL DEFAULT 0,
    cpm_max REAL NOT NULL DEFAULT 0,
    max_chain_rainbow INTEGER NOT NULL DEFAULT 0,
    jack_totalmax_v2 INTEGER NOT NULL DEFAULT 0,
    ult_combomax INTEGER NOT NULL DEFAULT 0,
    ult_totalmax_v2 INTEGER NOT NULL DEFAULT 0,
    sp_use INTEGER NOT NULL DEFAULT 0,
    hide_record INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;
