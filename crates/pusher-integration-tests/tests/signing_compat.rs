//! Integration test: signature compatibility across client generations.
//!
//! 1. The canonical string escapes spaces as %20
//! 2. Keys derived from the decoded or the raw (encoded) user id both verify
//! 3. A single flipped signature character is rejected
//! 4. The operator bypass token works only when configured

use std::sync::Arc;

use base64::Engine;
use pusher_auth::mac;
use pusher_server::commands::ingest::{self, SaveRequest};
use pusher_server::commands::{load, UserRequest};
use pusher_server::{ServerConfig, ServerState, ServiceError};

const SAVE_SECRET: &str = "compat-save";
const LOAD_SECRET: &str = "compat-load";

fn state_with_bypass(bypass: &str) -> Arc<ServerState> {
    let mut config = ServerConfig::default();
    config.auth.save_secret = SAVE_SECRET.to_string();
    config.auth.load_secret = LOAD_SECRET.to_string();
    config.auth.bypass_token = bypass.to_string();
    ServerState::open(config).expect("open state")
}

/// Sign the way a client does, from first principles.
fn client_signature(data: &str, user_id: &str, key_user_id: &str) -> String {
    let key = mac::tag(SAVE_SECRET.as_bytes(), key_user_id.as_bytes()).expect("derive");
    let canonical = format!(
        "data={}&user_id={}",
        pusher_codec::escape::query_escape(data),
        pusher_codec::escape::query_escape(user_id)
    );
    mac::sign(&key, &canonical).expect("sign")
}

#[test]
fn spaces_are_signed_as_percent_twenty() {
    let state = state_with_bypass("");
    let data = r#"{"playtime": 1}"#;
    let key = mac::tag(SAVE_SECRET.as_bytes(), b"player one").expect("derive");
    let sig = mac::sign(
        &key,
        "data=%7B%22playtime%22%3A%201%7D&user_id=player%20one",
    )
    .expect("sign");

    let request = SaveRequest {
        data: data.to_string(),
        user_id: "player one".to_string(),
        sig,
    };
    let verified = ingest::verify_save(&state, &request).expect("verify");
    assert_eq!(verified.user_id, "player one");
}

#[tokio::test]
async fn encoded_user_id_verifies_with_either_key() {
    let state = state_with_bypass("");
    let raw_id = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("user-1");
    let data = r#"{"playtime": 1}"#;

    for key_user in [raw_id.as_str(), "user-1"] {
        let request = SaveRequest {
            data: data.to_string(),
            user_id: raw_id.clone(),
            sig: client_signature(data, &raw_id, key_user),
        };
        let verified = ingest::verify_save(&state, &request).expect("verify");
        assert_eq!(verified.user_id, "user-1");
    }

    let request = SaveRequest {
        data: data.to_string(),
        user_id: raw_id.clone(),
        sig: client_signature(data, &raw_id, "user-1"),
    };
    let receipt = ingest::submit_save(&state, &request).await.expect("upload");
    assert_eq!(receipt.user_id, "user-1");

    // Reads accept the read signature of either form too.
    for signer in [raw_id.as_str(), "user-1"] {
        let read = UserRequest {
            user_id: raw_id.clone(),
            sig: mac::sign(LOAD_SECRET.as_bytes(), signer)
                .expect("sign")
                .to_uppercase(),
        };
        load::load_latest(&state, &read).await.expect("load");
    }
}

#[test]
fn flipped_signature_character_fails() {
    let state = state_with_bypass("");
    let data = r#"{"playtime": 1}"#;
    let sig = client_signature(data, "user-1", "user-1");

    for i in 0..sig.len() {
        let mut chars: Vec<char> = sig.chars().collect();
        chars[i] = if chars[i] == '0' { '1' } else { '0' };
        let request = SaveRequest {
            data: data.to_string(),
            user_id: "user-1".to_string(),
            sig: chars.into_iter().collect(),
        };
        assert!(
            matches!(ingest::verify_save(&state, &request), Err(ServiceError::Auth)),
            "position {i} accepted"
        );
    }
}

#[test]
fn bypass_token_only_when_configured() {
    let data = r#"{"playtime": 1}"#;
    let request = |sig: &str| SaveRequest {
        data: data.to_string(),
        user_id: "user-1".to_string(),
        sig: sig.to_string(),
    };

    let open = state_with_bypass("operator-token");
    assert!(ingest::verify_save(&open, &request("operator-token")).is_ok());
    assert!(ingest::verify_save(&open, &request("operator-token-x")).is_err());

    let closed = state_with_bypass("");
    assert!(ingest::verify_save(&closed, &request("")).is_err());
    assert!(ingest::verify_save(&closed, &request("operator-token")).is_err());
}
