//! Query escaping.
//!
//! [`query_escape`] is the escaping clients apply when they build the signed
//! string: everything except `A-Z a-z 0-9 - _ . ~` is percent-encoded and a
//! space becomes `%20`, never `+`. [`query_unescape`] is the lenient reverse
//! used by the decoders, where `+` still means a space.

use percent_encoding::{percent_decode, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::{CodecError, Result};

/// Bytes left as-is by [`query_escape`].
const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode `input` for the signed canonical string.
pub fn query_escape(input: &str) -> String {
    utf8_percent_encode(input, QUERY).to_string()
}

/// Reverse query escaping, treating `+` as a space.
///
/// Fails on a `%` that is not followed by two hex digits.
pub fn query_unescape(input: &str) -> Result<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                let end = (i + 3).min(bytes.len());
                return Err(CodecError::Encoding(format!(
                    "invalid escape {:?}",
                    String::from_utf8_lossy(&bytes[i..end])
                )));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = input.replace('+', " ");
    Ok(percent_decode(spaced.as_bytes()).collect())
}
