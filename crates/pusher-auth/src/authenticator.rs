//! Signature verification with configured secrets.
//!
//! ## Save uploads
//!
//! 1. The per-user key is `HMAC-SHA256(save_secret, user_id)`.
//! 2. The client signs [`canonicalize`]`(data, user_id)` with that key.
//! 3. The server tries the key of the decoded user id first and, when the
//!    raw parameter differs, the key of the raw one.
//!
//! ## Reads
//!
//! Load and history requests carry `hex(HMAC-SHA256(load_secret, user_id))`,
//! compared case-insensitively, with the same decoded-then-raw fallback.
//!
//! A non-empty bypass token authenticates any request whose signature is
//! exactly that token.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::canonical::canonicalize;
use crate::mac::{self, constant_time_eq};
use crate::{AuthError, Result};

/// Secrets the authenticator is constructed with.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct AuthSecrets {
    /// Master secret for per-user upload keys.
    pub save_secret: Vec<u8>,
    /// Secret for read signatures and load responses.
    pub load_secret: Vec<u8>,
    /// Operator bypass token; empty disables the bypass.
    pub bypass_token: String,
}

impl std::fmt::Debug for AuthSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSecrets")
            .field("save_secret", &"<redacted>")
            .field("load_secret", &"<redacted>")
            .field("bypass_enabled", &!self.bypass_token.is_empty())
            .finish()
    }
}

/// A derived per-user signing key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct UserKey([u8; 32]);

impl UserKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Verifies request signatures against one set of secrets.
#[derive(Clone, Debug)]
pub struct Authenticator {
    secrets: AuthSecrets,
}

impl Authenticator {
    pub fn new(secrets: AuthSecrets) -> Self {
        Self { secrets }
    }

    /// Derive the upload key for `user_id`.
    pub fn derive_key(&self, user_id: &str) -> Result<UserKey> {
        mac::tag(&self.secrets.save_secret, user_id.as_bytes()).map(UserKey)
    }

    /// Sign an upload the way a client does. Used by tests and tooling.
    pub fn sign_save(&self, raw_data: &str, raw_user_id: &str, signing_user_id: &str) -> Result<String> {
        let key = self.derive_key(signing_user_id)?;
        mac::sign(key.as_bytes(), &canonicalize(raw_data, raw_user_id))
    }

    /// Verify an upload signature.
    ///
    /// The canonical string always uses the raw parameters; only the key
    /// derivation falls back from the decoded to the raw user id.
    pub fn verify_save(
        &self,
        raw_data: &str,
        raw_user_id: &str,
        decoded_user_id: &str,
        signature: &str,
    ) -> Result<()> {
        if self.bypass(signature) {
            tracing::debug!("upload authenticated by bypass token");
            return Ok(());
        }
        let canonical = canonicalize(raw_data, raw_user_id);
        with_fallback(raw_user_id, decoded_user_id, |user_id| {
            let key = self.derive_key(user_id)?;
            mac::verify(&canonical, signature, key.as_bytes())
        })
    }

    /// Signature a client sends to read `user_id`'s data.
    pub fn sign_user(&self, user_id: &str) -> Result<String> {
        mac::sign(&self.secrets.load_secret, user_id)
    }

    /// Verify a read signature for the user id.
    pub fn verify_user(&self, raw_user_id: &str, decoded_user_id: &str, signature: &str) -> Result<()> {
        if self.bypass(signature) {
            return Ok(());
        }
        let signature = signature.to_ascii_lowercase();
        with_fallback(raw_user_id, decoded_user_id, |user_id| {
            mac::verify(user_id, &signature, &self.secrets.load_secret)
        })
    }

    /// Signature over an encoded load response body.
    pub fn sign_load_payload(&self, encoded: &str) -> Result<String> {
        mac::sign(&self.secrets.load_secret, encoded)
    }

    fn bypass(&self, signature: &str) -> bool {
        let token = &self.secrets.bypass_token;
        if token.is_empty() || signature.is_empty() {
            return false;
        }
        constant_time_eq(token.as_bytes(), signature.as_bytes())
    }
}

/// Try the decoded id, then the raw id when it differs. Errors other than
/// a signature mismatch are returned immediately.
fn with_fallback(
    raw_user_id: &str,
    decoded_user_id: &str,
    check: impl Fn(&str) -> Result<()>,
) -> Result<()> {
    if !decoded_user_id.is_empty() {
        match check(decoded_user_id) {
            Ok(()) => return Ok(()),
            Err(AuthError::InvalidSignature) => {}
            Err(e) => return Err(e),
        }
    }
    if !raw_user_id.is_empty() && raw_user_id != decoded_user_id {
        return check(raw_user_id);
    }
    Err(AuthError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets(bypass: &str) -> AuthSecrets {
        AuthSecrets {
            save_secret: b"save-secret".to_vec(),
            load_secret: b"load-secret".to_vec(),
            bypass_token: bypass.to_string(),
        }
    }

    fn auth() -> Authenticator {
        Authenticator::new(secrets(""))
    }

    #[test]
    fn test_derive_key_is_per_user() {
        let auth = auth();
        let a = auth.derive_key("alice").expect("derive");
        let b = auth.derive_key("bob").expect("derive");
        assert_ne!(a.as_bytes(), b.as_bytes());
        assert_eq!(
            a.as_bytes(),
            &mac::tag(b"save-secret", b"alice").expect("tag")
        );
    }

    #[test]
    fn test_verify_save_decoded_id() {
        let auth = auth();
        let sig = auth.sign_save("payload", "user-1", "user-1").expect("sign");
        assert!(auth.verify_save("payload", "user-1", "user-1", &sig).is_ok());
        assert!(auth.verify_save("payload2", "user-1", "user-1", &sig).is_err());
    }

    #[test]
    fn test_verify_save_raw_id_fallback() {
        let auth = auth();
        // Client derived its key from the encoded id it sent.
        let raw = "dXNlci0x";
        let sig = auth.sign_save("payload", raw, raw).expect("sign");
        assert!(auth.verify_save("payload", raw, "user-1", &sig).is_ok());

        // Client derived its key from the plain id.
        let sig = auth.sign_save("payload", raw, "user-1").expect("sign");
        assert!(auth.verify_save("payload", raw, "user-1", &sig).is_ok());
    }

    #[test]
    fn test_verify_save_spaces() {
        let auth = auth();
        let data = "{\"a\": 1}";
        let expected = mac::sign(
            auth.derive_key("user 1").expect("derive").as_bytes(),
            "data=%7B%22a%22%3A%201%7D&user_id=user%201",
        )
        .expect("sign");
        assert!(auth.verify_save(data, "user 1", "user 1", &expected).is_ok());
    }

    #[test]
    fn test_verify_user_case_insensitive() {
        let auth = auth();
        let sig = auth.sign_user("user-1").expect("sign");
        assert!(auth.verify_user("user-1", "user-1", &sig).is_ok());
        assert!(auth
            .verify_user("user-1", "user-1", &sig.to_ascii_uppercase())
            .is_ok());
        assert!(auth.verify_user("user-2", "user-2", &sig).is_err());
    }

    #[test]
    fn test_verify_user_raw_fallback() {
        let auth = auth();
        let sig = auth.sign_user("dXNlci0x").expect("sign");
        assert!(auth.verify_user("dXNlci0x", "user-1", &sig).is_ok());
    }

    #[test]
    fn test_bypass_token() {
        let auth = Authenticator::new(secrets("operator-token"));
        assert!(auth
            .verify_save("anything", "u", "u", "operator-token")
            .is_ok());
        assert!(auth.verify_user("u", "u", "operator-token").is_ok());
        assert!(auth.verify_user("u", "u", "operator-tokeN").is_err());
    }

    #[test]
    fn test_empty_bypass_never_activates() {
        let auth = auth();
        assert!(matches!(
            auth.verify_save("anything", "u", "u", ""),
            Err(AuthError::InvalidSignature)
        ));
        assert!(auth.verify_user("u", "u", "").is_err());
    }

    #[test]
    fn test_empty_ids_fail() {
        let auth = auth();
        assert!(auth.verify_user("", "", "deadbeef").is_err());
    }

    #[test]
    fn test_load_payload_signature() {
        let auth = auth();
        let sig = auth.sign_load_payload("eyJhIjoxfQ==").expect("sign");
        assert_eq!(sig, mac::sign(b"load-secret", "eyJhIjoxfQ==").expect("sign"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", secrets("tok"));
        assert!(!rendered.contains("save-secret"));
        assert!(!rendered.contains("tok\""));
    }
}
