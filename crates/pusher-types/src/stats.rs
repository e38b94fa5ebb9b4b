//! Aggregate statistics: achievement rates and time-bucketed rollups.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Timestamp, DAY_SECS, HOUR_SECS};

/// How many users unlocked one achievement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct AchievementRate {
    pub count: u64,
    /// `count / total_users`, or 0 when there are no users.
    pub rate: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct AchievementRates {
    /// Distinct users with at least one unlocked achievement.
    pub total_users: u64,
    pub rates: BTreeMap<String, AchievementRate>,
}

impl AchievementRates {
    /// Build rates from per-achievement counts.
    pub fn from_counts(total_users: u64, counts: impl IntoIterator<Item = (String, u64)>) -> Self {
        let rates = counts
            .into_iter()
            .map(|(id, count)| {
                let rate = if total_users == 0 {
                    0.0
                } else {
                    count as f64 / total_users as f64
                };
                (id, AchievementRate { count, rate })
            })
            .collect();
        Self { total_users, rates }
    }
}

/// Calendar bucket size for timeseries queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum BucketUnit {
    Hour,
    Day,
}

impl BucketUnit {
    pub fn secs(self) -> u64 {
        match self {
            BucketUnit::Hour => HOUR_SECS,
            BucketUnit::Day => DAY_SECS,
        }
    }

    /// Start of the bucket containing `ts`.
    pub fn floor(self, ts: Timestamp) -> Timestamp {
        ts - ts % self.secs()
    }

    /// First bucket start of a window of `size` buckets ending at `now`.
    pub fn window_start(self, now: Timestamp, size: u32) -> Timestamp {
        self.floor(now)
            .saturating_sub(u64::from(size).saturating_mul(self.secs()))
    }
}

/// One bucket of a timeseries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct TimeseriesBucket {
    pub bucket_start: Timestamp,
    /// Sum of `credit_all` over each user's latest snapshot in the bucket.
    pub total_medals: i64,
    pub active_users: u64,
    pub avg_playtime: i64,
    /// Every snapshot received in the bucket, not only the latest per user.
    pub saves: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct TimeseriesReport {
    pub unit: BucketUnit,
    pub buckets: Vec<TimeseriesBucket>,
}
