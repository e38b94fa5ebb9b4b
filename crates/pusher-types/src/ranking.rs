//! Leaderboard metrics and results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Timestamp, UnknownName};

/// A metric users can be ranked by.
///
/// Most metrics are columns of the latest-user-state table. The two chain
/// metrics at the end only exist in the per-snapshot keyed counters and are
/// resolved by taking each user's most recent snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMetric {
    AchievementsCount,
    JackspStartmax,
    GoldenPalballGet,
    CpmMax,
    MaxChainRainbow,
    JackTotalmaxV2,
    UltCombomax,
    UltTotalmaxV2,
    SpUse,
    CreditAll,
    MaxChainItem,
    MaxChainOrange,
}

impl RankingMetric {
    pub const ALL: [RankingMetric; 12] = [
        RankingMetric::AchievementsCount,
        RankingMetric::JackspStartmax,
        RankingMetric::GoldenPalballGet,
        RankingMetric::CpmMax,
        RankingMetric::MaxChainRainbow,
        RankingMetric::JackTotalmaxV2,
        RankingMetric::UltCombomax,
        RankingMetric::UltTotalmaxV2,
        RankingMetric::SpUse,
        RankingMetric::CreditAll,
        RankingMetric::MaxChainItem,
        RankingMetric::MaxChainOrange,
    ];

    /// The nine metrics reported in [`Statistics`].
    pub const STATISTICS: [RankingMetric; 9] = [
        RankingMetric::AchievementsCount,
        RankingMetric::JackspStartmax,
        RankingMetric::GoldenPalballGet,
        RankingMetric::CpmMax,
        RankingMetric::MaxChainRainbow,
        RankingMetric::JackTotalmaxV2,
        RankingMetric::UltCombomax,
        RankingMetric::UltTotalmaxV2,
        RankingMetric::SpUse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RankingMetric::AchievementsCount => "achievements_count",
            RankingMetric::JackspStartmax => "jacksp_startmax",
            RankingMetric::GoldenPalballGet => "golden_palball_get",
            RankingMetric::CpmMax => "cpm_max",
            RankingMetric::MaxChainRainbow => "max_chain_rainbow",
            RankingMetric::JackTotalmaxV2 => "jack_totalmax_v2",
            RankingMetric::UltCombomax => "ult_combomax",
            RankingMetric::UltTotalmaxV2 => "ult_totalmax_v2",
            RankingMetric::SpUse => "sp_use",
            RankingMetric::CreditAll => "credit_all",
            RankingMetric::MaxChainItem => "max_chain_item",
            RankingMetric::MaxChainOrange => "max_chain_orange",
        }
    }

    /// For child-table metrics, the `dc_ball_chain` key holding the value.
    pub fn chain_key(self) -> Option<&'static str> {
        match self {
            RankingMetric::MaxChainItem => Some("1"),
            RankingMetric::MaxChainOrange => Some("2"),
            _ => None,
        }
    }
}

impl fmt::Display for RankingMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingMetric {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownName {
                kind: "ranking metric",
                name: s.to_string(),
            })
    }
}

/// One row of a leaderboard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct RankingEntry {
    pub user_id: String,
    /// Metric value; `cpm_max` is truncated toward zero.
    pub value: i64,
    /// Earlier wins ties. For summary metrics, when the user first uploaded;
    /// for chain metrics, when their latest snapshot was received.
    pub reference_at: Timestamp,
}

/// The statistics bundle: nine leaderboards plus the global medal total.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct Statistics {
    pub achievements_count: Vec<RankingEntry>,
    pub jacksp_startmax: Vec<RankingEntry>,
    pub golden_palball_get: Vec<RankingEntry>,
    pub cpm_max: Vec<RankingEntry>,
    pub max_chain_rainbow: Vec<RankingEntry>,
    pub jack_totalmax_v2: Vec<RankingEntry>,
    pub ult_combomax: Vec<RankingEntry>,
    pub ult_totalmax_v2: Vec<RankingEntry>,
    pub sp_use: Vec<RankingEntry>,
    pub total_medals: i64,
}

impl Statistics {
    /// Mutable slot for one of the nine bundled rankings.
    pub fn ranking_mut(&mut self, metric: RankingMetric) -> Option<&mut Vec<RankingEntry>> {
        match metric {
            RankingMetric::AchievementsCount => Some(&mut self.achievements_count),
            RankingMetric::JackspStartmax => Some(&mut self.jacksp_startmax),
            RankingMetric::GoldenPalballGet => Some(&mut self.golden_palball_get),
            RankingMetric::CpmMax => Some(&mut self.cpm_max),
            RankingMetric::MaxChainRainbow => Some(&mut self.max_chain_rainbow),
            RankingMetric::JackTotalmaxV2 => Some(&mut self.jack_totalmax_v2),
            RankingMetric::UltCombomax => Some(&mut self.ult_combomax),
            RankingMetric::UltTotalmaxV2 => Some(&mut self.ult_totalmax_v2),
            RankingMetric::SpUse => Some(&mut self.sp_use),
            RankingMetric::CreditAll
            | RankingMetric::MaxChainItem
            | RankingMetric::MaxChainOrange => None,
        }
    }
}
