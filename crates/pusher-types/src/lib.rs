//! # pusher-types
//!
//! Shared domain types for the save-snapshot ingestion and leaderboard
//! services. Snapshots flow in through `pusher-codec`, are persisted by
//! `pusher-db`, and the ranking/statistics results defined here flow back
//! out through `pusher-server` to the HTTP handlers.

pub mod history;
pub mod ranking;
pub mod snapshot;
pub mod stats;

pub use history::{AchievementUnlockEntry, AchievementUnlockPage, SaveHistoryEntry, SaveHistoryPage};
pub use ranking::{RankingEntry, RankingMetric, Statistics};
pub use snapshot::{
    KeyedCollection, KeyedCounters, ListCollection, ListCounters, SaveSnapshot, Scalar,
    ScalarCounters,
};
pub use stats::{AchievementRate, AchievementRates, BucketUnit, TimeseriesBucket, TimeseriesReport};

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Seconds in one hour bucket.
pub const HOUR_SECS: u64 = 3600;

/// Seconds in one day bucket.
pub const DAY_SECS: u64 = 86_400;

/// Sparse counter key holding the rainbow chain length in `dc_ball_chain`.
pub const RAINBOW_CHAIN_KEY: &str = "3";

/// Sparse counter key holding golden palette balls in `dc_palball_get`.
pub const GOLDEN_PALBALL_KEY: &str = "100";

/// Error returned when a name does not match a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {name}")]
pub struct UnknownName {
    pub kind: &'static str,
    pub name: String,
}
