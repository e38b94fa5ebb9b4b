//! Save snapshot structures.
//!
//! A [`SaveSnapshot`] is one client upload. Scalar counters live in
//! [`ScalarCounters`], whose field list is declared once below and drives
//! the wire decoder, the wire encoder and the parent-table columns alike.
//! Field names double as wire keys and column names.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::UnknownName;

/// A loosely typed scalar value as read from the wire or the database.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
}

impl Scalar {
    /// Integer view, truncating floats toward zero.
    pub fn as_i64(self) -> i64 {
        match self {
            Scalar::Int(v) => v,
            Scalar::Float(v) => v.trunc() as i64,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Scalar::Int(v) => v as f64,
            Scalar::Float(v) => v,
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

/// Conversion from a [`Scalar`] into a concrete counter type.
pub trait FromScalar {
    fn from_scalar(value: Scalar) -> Self;
}

impl FromScalar for i64 {
    fn from_scalar(value: Scalar) -> Self {
        value.as_i64()
    }
}

impl FromScalar for f64 {
    fn from_scalar(value: Scalar) -> Self {
        value.as_f64()
    }
}

macro_rules! scalar_counters {
    ($( $(#[$meta:meta])* $field:ident : $ty:ident ),* $(,)?) => {
        /// Scalar counters carried by every snapshot.
        #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
        pub struct ScalarCounters {
            $( $(#[$meta])* pub $field: $ty, )*
        }

        impl ScalarCounters {
            /// Field names in declaration order.
            pub const FIELDS: &'static [&'static str] = &[$( stringify!($field) ),*];

            /// Read a counter by name.
            pub fn get(&self, name: &str) -> Option<Scalar> {
                match name {
                    $( stringify!($field) => Some(Scalar::from(self.$field)), )*
                    _ => None,
                }
            }

            /// Write a counter by name. Returns `false` for unknown names.
            pub fn set(&mut self, name: &str, value: Scalar) -> bool {
                match name {
                    $( stringify!($field) => {
                        self.$field = <$ty as FromScalar>::from_scalar(value);
                        true
                    } )*
                    _ => false,
                }
            }

            /// Whether the named counter is floating point.
            pub fn is_float(name: &str) -> bool {
                match name {
                    $( stringify!($field) => stringify!($ty) == "f64", )*
                    _ => false,
                }
            }
        }
    };
}

scalar_counters! {
    legacy: i64,
    /// Client save-format version tag.
    version: i64,
    /// Current medal balance.
    credit: i64,
    /// Lifetime medal total; the headline leaderboard value.
    credit_all: i64,
    medal_in: i64,
    medal_get: i64,
    ball_get: i64,
    ball_chain: i64,
    slot_start: i64,
    slot_startfev: i64,
    slot_hit: i64,
    slot_getfev: i64,
    sqr_get: i64,
    sqr_step: i64,
    jack_get: i64,
    jack_startmax: i64,
    jack_totalmax: i64,
    ult_get: i64,
    ult_combomax: i64,
    ult_totalmax: i64,
    rmshbi_get: i64,
    buy_shbi: i64,
    bstp_step: i64,
    bstp_rwd: i64,
    buy_total: i64,
    sp_use: i64,
    skill_point: i64,
    blackbox: i64,
    blackbox_total: i64,
    /// Non-zero when the player opted out of public leaderboards.
    hide_record: i64,
    /// Peak coins-per-minute; the only fractional counter.
    cpm_max: f64,
    jack_totalmax_v2: i64,
    ult_totalmax_v2: i64,
    palball_get: i64,
    pallot_lot_t0: i64,
    pallot_lot_t1: i64,
    pallot_lot_t2: i64,
    pallot_lot_t3: i64,
    pallot_lot_t4: i64,
    jacksp_get_all: i64,
    jacksp_get_t0: i64,
    jacksp_get_t1: i64,
    jacksp_get_t2: i64,
    jacksp_get_t3: i64,
    jacksp_get_t4: i64,
    jacksp_startmax: i64,
    jacksp_totalmax: i64,
    task_cnt: i64,
    totem_altars: i64,
    totem_altars_credit: i64,
    /// Unix seconds of the first client boot.
    firstboot: i64,
    /// Unix seconds of the client-side save.
    lastsave: i64,
    /// Cumulative play time; unique per user across uploads.
    playtime: i64,
}

/// Sparse keyed counter collections (`key -> count`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyedCollection {
    MedalGet,
    BallGet,
    BallChain,
    PalballGet,
    PalballJp,
}

impl KeyedCollection {
    pub const ALL: [KeyedCollection; 5] = [
        KeyedCollection::MedalGet,
        KeyedCollection::BallGet,
        KeyedCollection::BallChain,
        KeyedCollection::PalballGet,
        KeyedCollection::PalballJp,
    ];

    /// Name stored in the child table.
    pub fn as_str(self) -> &'static str {
        match self {
            KeyedCollection::MedalGet => "medal_get",
            KeyedCollection::BallGet => "ball_get",
            KeyedCollection::BallChain => "ball_chain",
            KeyedCollection::PalballGet => "palball_get",
            KeyedCollection::PalballJp => "palball_jp",
        }
    }

    /// Key used in the client JSON payload.
    pub fn wire_key(self) -> &'static str {
        match self {
            KeyedCollection::MedalGet => "dc_medal_get",
            KeyedCollection::BallGet => "dc_ball_get",
            KeyedCollection::BallChain => "dc_ball_chain",
            KeyedCollection::PalballGet => "dc_palball_get",
            KeyedCollection::PalballJp => "dc_palball_jp",
        }
    }
}

impl fmt::Display for KeyedCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyedCollection {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownName {
                kind: "keyed collection",
                name: s.to_string(),
            })
    }
}

/// Positional list collections (`position -> value`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListCollection {
    Perks,
    PerksCredit,
    Totems,
    TotemsCredit,
    TotemsPlacement,
}

impl ListCollection {
    pub const ALL: [ListCollection; 5] = [
        ListCollection::Perks,
        ListCollection::PerksCredit,
        ListCollection::Totems,
        ListCollection::TotemsCredit,
        ListCollection::TotemsPlacement,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ListCollection::Perks => "perks",
            ListCollection::PerksCredit => "perks_credit",
            ListCollection::Totems => "totems",
            ListCollection::TotemsCredit => "totems_credit",
            ListCollection::TotemsPlacement => "totems_placement",
        }
    }

    pub fn wire_key(self) -> &'static str {
        match self {
            ListCollection::Perks => "l_perks",
            ListCollection::PerksCredit => "l_perks_credit",
            ListCollection::Totems => "l_totems",
            ListCollection::TotemsCredit => "l_totems_credit",
            ListCollection::TotemsPlacement => "l_totems_set",
        }
    }
}

impl fmt::Display for ListCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListCollection {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownName {
                kind: "list collection",
                name: s.to_string(),
            })
    }
}

/// All sparse keyed collections of one snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedCounters(BTreeMap<KeyedCollection, BTreeMap<String, i64>>);

impl KeyedCounters {
    /// Set one counter, creating the collection on first use.
    pub fn insert(&mut self, collection: KeyedCollection, key: impl Into<String>, count: i64) {
        self.0.entry(collection).or_default().insert(key.into(), count);
    }

    /// Look up one counter.
    pub fn get(&self, collection: KeyedCollection, key: &str) -> Option<i64> {
        self.0.get(&collection).and_then(|m| m.get(key)).copied()
    }

    /// All entries of a collection; empty when the collection is absent.
    pub fn collection(&self, collection: KeyedCollection) -> impl Iterator<Item = (&str, i64)> {
        self.0
            .get(&collection)
            .into_iter()
            .flat_map(|m| m.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    /// Non-empty collections only.
    pub fn iter(&self) -> impl Iterator<Item = (KeyedCollection, &BTreeMap<String, i64>)> {
        self.0.iter().filter(|(_, m)| !m.is_empty()).map(|(c, m)| (*c, m))
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeMap::is_empty)
    }
}

/// All positional list collections of one snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCounters(BTreeMap<ListCollection, Vec<i64>>);

impl ListCounters {
    pub fn set(&mut self, collection: ListCollection, values: Vec<i64>) {
        if values.is_empty() {
            self.0.remove(&collection);
        } else {
            self.0.insert(collection, values);
        }
    }

    /// Write one position, padding earlier positions with zero.
    pub fn put(&mut self, collection: ListCollection, position: usize, value: i64) {
        let list = self.0.entry(collection).or_default();
        if list.len() <= position {
            list.resize(position + 1, 0);
        }
        list[position] = value;
    }

    pub fn get(&self, collection: ListCollection) -> &[i64] {
        self.0.get(&collection).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (ListCollection, &[i64])> {
        self.0.iter().map(|(c, v)| (*c, v.as_slice()))
    }
}

/// One decoded client upload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveSnapshot {
    /// Owning user; filled in from the request, not the payload.
    pub user_id: String,
    #[serde(flatten)]
    pub counters: ScalarCounters,
    pub keyed: KeyedCounters,
    pub lists: ListCounters,
    /// Unlocked achievement ids as of this upload.
    pub achievements: BTreeSet<String>,
}

impl SaveSnapshot {
    /// Snapshot for `user_id` with every counter at zero.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Play-time counter used for duplicate detection.
    pub fn playtime(&self) -> i64 {
        self.counters.playtime
    }
}
