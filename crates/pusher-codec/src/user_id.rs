//! User id parameter decoding.
//!
//! Some clients Base64-encode the user id before putting it in the query
//! string, others send it plain. A Base64 reading is only accepted when the
//! input is the canonical encoding of its own output and that output is
//! printable UTF-8, so plain ids that happen to be valid Base64 survive.

use base64::Engine;

use crate::escape::query_unescape;
use crate::payload::BASE64_ENGINES;
use crate::Result;

/// Decode a raw user id parameter.
///
/// Surrounding whitespace is trimmed and an empty id stays empty. Fails only
/// when the plain reading has a malformed percent escape.
pub fn decode_user_id(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    if let Some(decoded) = decode_base64_id(trimmed) {
        return Ok(decoded);
    }
    let bytes = query_unescape(trimmed)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn decode_base64_id(value: &str) -> Option<String> {
    let normalized = normalize_base64(value);
    BASE64_ENGINES.into_iter().find_map(|engine| {
        let decoded = engine.decode(value).ok()?;
        if normalize_base64(&engine.encode(&decoded)) != normalized {
            return None;
        }
        let text = String::from_utf8(decoded).ok()?;
        if text.is_empty() || text.chars().any(char::is_control) {
            return None;
        }
        Some(text)
    })
}

/// Map both alphabets onto the standard one and drop padding.
fn normalize_base64(value: &str) -> String {
    value
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect()
}
