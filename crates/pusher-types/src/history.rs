//! Per-user history pages.

use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Summary of one stored snapshot in a user's save history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct SaveHistoryEntry {
    pub save_id: i64,
    pub version: i64,
    pub playtime: i64,
    pub credit_all: i64,
    pub medal_get: i64,
    pub ball_get: i64,
    pub jack_totalmax_v2: i64,
    pub ult_totalmax_v2: i64,
    pub cpm_max: f64,
    pub blackbox_total: i64,
    pub sp_use: i64,
    pub received_at: Timestamp,
}

/// Newest-first page of save history.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct SaveHistoryPage {
    pub items: Vec<SaveHistoryEntry>,
    pub has_more: bool,
    /// Cursor for the next page: `received_at` of the last item.
    pub next_before: Option<Timestamp>,
}

/// First unlock of one achievement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct AchievementUnlockEntry {
    pub achievement_id: String,
    pub unlocked_at: Timestamp,
    /// Play time of the snapshot that first carried the achievement.
    pub playtime: i64,
    pub save_id: i64,
}

/// Oldest-first page of achievement unlocks with the user's total count.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct AchievementUnlockPage {
    pub items: Vec<AchievementUnlockEntry>,
    pub total: u64,
}
