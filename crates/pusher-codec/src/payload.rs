//! Save payload decoding.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::engine::GeneralPurpose;
use base64::Engine;
use pusher_types::{KeyedCollection, ListCollection, SaveSnapshot, Scalar, ScalarCounters};
use serde_json::Value;

use crate::escape::query_unescape;
use crate::{loose, CodecError, Result};

/// Base64 alphabets tried in order.
pub(crate) const BASE64_ENGINES: [&GeneralPurpose; 4] =
    [&URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD_NO_PAD, &STANDARD];

/// Wire key of the achievement list.
pub const ACHIEVEMENTS_KEY: &str = "l_achieve";

/// Whether the first non-whitespace byte opens a JSON object or array.
pub fn looks_like_json(bytes: &[u8]) -> bool {
    matches!(
        bytes.iter().find(|b| !b.is_ascii_whitespace()),
        Some(b'{') | Some(b'[')
    )
}

/// Decode a raw upload blob into JSON bytes.
///
/// The first Base64 alphabet whose output looks like JSON wins. Otherwise
/// the blob is query-unescaped as-is, which only fails on malformed escapes.
pub fn decode_payload(raw: &str) -> Result<Vec<u8>> {
    let trimmed = raw.trim();
    for engine in BASE64_ENGINES {
        if let Ok(bytes) = engine.decode(trimmed) {
            if looks_like_json(&bytes) {
                return Ok(bytes);
            }
        }
    }
    query_unescape(raw)
}

/// Parse decoded JSON bytes into a snapshot owned by `user_id`.
pub fn parse_snapshot(bytes: &[u8], user_id: &str) -> Result<SaveSnapshot> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| CodecError::Json(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(CodecError::Json("expected a JSON object".to_string()));
    };

    let mut snapshot = SaveSnapshot::new(user_id);

    for name in ScalarCounters::FIELDS {
        if let Some(v) = fields.get(*name) {
            let scalar = if ScalarCounters::is_float(name) {
                Scalar::Float(loose::float(v))
            } else {
                Scalar::Int(loose::int(v))
            };
            snapshot.counters.set(name, scalar);
        }
    }

    for collection in KeyedCollection::ALL {
        if let Some(v) = fields.get(collection.wire_key()) {
            for (key, count) in loose::int_map(v) {
                snapshot.keyed.insert(collection, key, count);
            }
        }
    }

    for collection in ListCollection::ALL {
        if let Some(v) = fields.get(collection.wire_key()) {
            snapshot.lists.set(collection, loose::int_list(v));
        }
    }

    if let Some(v) = fields.get(ACHIEVEMENTS_KEY) {
        snapshot.achievements = loose::id_set(v);
    }

    Ok(snapshot)
}

/// Decode and parse a raw upload blob in one step.
pub fn decode_snapshot(raw: &str, user_id: &str) -> Result<SaveSnapshot> {
    let bytes = decode_payload(raw)?;
    parse_snapshot(&bytes, user_id)
}
