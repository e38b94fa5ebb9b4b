//! HMAC-SHA256 primitives.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::{AuthError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Raw HMAC-SHA256 tag of `message` under `key`.
pub fn tag(key: &[u8], message: &[u8]) -> Result<[u8; 32]> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| AuthError::Key(e.to_string()))?;
    mac.update(message);
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Lowercase hex HMAC-SHA256 of `message` under `key`.
pub fn sign(key: &[u8], message: &str) -> Result<String> {
    Ok(hex::encode(tag(key, message.as_bytes())?))
}

/// Check a hex signature in constant time.
///
/// Returns [`AuthError::InvalidSignature`] on any mismatch, including a
/// signature of the wrong length.
pub fn verify(message: &str, signature_hex: &str, key: &[u8]) -> Result<()> {
    let expected = sign(key, message)?;
    if constant_time_eq(expected.as_bytes(), signature_hex.as_bytes()) {
        Ok(())
    } else {
        Err(AuthError::InvalidSignature)
    }
}

pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    bool::from(a.ct_eq(b))
}
