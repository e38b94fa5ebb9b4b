//! Encoding stored snapshots back into client JSON.
//!
//! The output is what the load endpoint hands back to the game. Large
//! counters that older clients keep as strings are written as strings.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pusher_types::{KeyedCollection, ListCollection, SaveSnapshot, Scalar, ScalarCounters};
use serde_json::{json, Map, Number, Value};

use crate::payload::ACHIEVEMENTS_KEY;
use crate::{CodecError, Result};

/// Counters written as decimal strings.
const STRING_FIELDS: &[&str] = &["credit", "credit_all", "firstboot", "lastsave"];

/// Encode a snapshot as client wire JSON.
pub fn encode_snapshot(snapshot: &SaveSnapshot) -> Value {
    let mut out = Map::new();

    for name in ScalarCounters::FIELDS {
        let Some(scalar) = snapshot.counters.get(name) else {
            continue;
        };
        let value = match scalar {
            Scalar::Int(v) if STRING_FIELDS.contains(name) => Value::String(v.to_string()),
            Scalar::Int(v) => Value::from(v),
            Scalar::Float(v) => Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null),
        };
        out.insert(name.to_string(), value);
    }

    for collection in KeyedCollection::ALL {
        let entries: Map<String, Value> = snapshot
            .keyed
            .collection(collection)
            .map(|(k, v)| (k.to_string(), Value::from(v)))
            .collect();
        out.insert(collection.wire_key().to_string(), Value::Object(entries));
    }

    for collection in ListCollection::ALL {
        out.insert(
            collection.wire_key().to_string(),
            json!(snapshot.lists.get(collection)),
        );
    }

    out.insert(ACHIEVEMENTS_KEY.to_string(), json!(snapshot.achievements));

    Value::Object(out)
}

/// Encode a snapshot for the load response: standard Base64 of its JSON.
pub fn encode_load_data(snapshot: &SaveSnapshot) -> Result<String> {
    let json = serde_json::to_vec(&encode_snapshot(snapshot))
        .map_err(|e| CodecError::Json(e.to_string()))?;
    Ok(STANDARD.encode(json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{decode_snapshot, parse_snapshot};

    fn sample() -> SaveSnapshot {
        let mut snapshot = SaveSnapshot::new("user-1");
        snapshot.counters.legacy = 1;
        snapshot.counters.version = 4;
        snapshot.counters.credit = 10;
        snapshot.counters.credit_all = 20;
        snapshot.counters.playtime = 30;
        snapshot.counters.cpm_max = 4.5;
        snapshot.keyed.insert(KeyedCollection::MedalGet, "1", 2);
        snapshot.lists.set(ListCollection::Totems, vec![3, 4]);
        snapshot.achievements.insert("a".to_string());
        snapshot
    }

    #[test]
    fn test_legacy_string_fields() {
        let value = encode_snapshot(&sample());
        assert_eq!(value["credit"], json!("10"));
        assert_eq!(value["credit_all"], json!("20"));
        assert_eq!(value["firstboot"], json!("0"));
        assert_eq!(value["playtime"], json!(30));
        assert_eq!(value["cpm_max"], json!(4.5));
        assert_eq!(value["l_achieve"], json!(["a"]));
        assert_eq!(value["dc_medal_get"], json!({"1": 2}));
        assert_eq!(value["dc_ball_get"], json!({}));
        assert_eq!(value["l_totems"], json!([3, 4]));
    }

    #[test]
    fn test_encoded_snapshot_parses_back() {
        let snapshot = sample();
        let bytes = serde_json::to_vec(&encode_snapshot(&snapshot)).expect("serialize");
        assert_eq!(parse_snapshot(&bytes, "user-1").expect("parse"), snapshot);
    }

    #[test]
    fn test_load_data_is_standard_base64() {
        let snapshot = sample();
        let data = encode_load_data(&snapshot).expect("encode");
        assert_eq!(decode_snapshot(&data, "user-1").expect("decode"), snapshot);
    }
}
