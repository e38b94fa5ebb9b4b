//! Signing test vectors for save-upload clients.
//!
//! Writes `tests/fixtures/test_vectors.json` covering key derivation, the
//! canonical signed string, upload and read signatures, and user id and
//! payload decoding. Client implementations check themselves against it.
//!
//! Usage:
//!   pusher-testvec              # Generate test_vectors.json
//!   pusher-testvec --verify     # Verify test vectors match expected values

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use base64::Engine;
use pusher_auth::{canonicalize, AuthSecrets, Authenticator};
use pusher_types::SaveSnapshot;
use serde::{Deserialize, Serialize};

const VECTORS_PATH: &str = "tests/fixtures/test_vectors.json";
const SAVE_SECRET: &str = "pusher test vector save secret";
const LOAD_SECRET: &str = "pusher test vector load secret";

#[derive(Serialize, Deserialize)]
struct TestVectors {
    version: String,
    generated_by: String,
    secrets: BTreeMap<String, String>,
    vectors: BTreeMap<String, TestVector>,
}

#[derive(Serialize, Deserialize)]
struct TestVector {
    description: String,
    inputs: BTreeMap<String, String>,
    outputs: BTreeMap<String, String>,
}

fn vector(description: &str, inputs: &[(&str, &str)], outputs: &[(&str, String)]) -> TestVector {
    TestVector {
        description: description.to_string(),
        inputs: inputs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        outputs: outputs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    }
}

fn authenticator() -> Authenticator {
    Authenticator::new(AuthSecrets {
        save_secret: SAVE_SECRET.as_bytes().to_vec(),
        load_secret: LOAD_SECRET.as_bytes().to_vec(),
        bypass_token: String::new(),
    })
}

fn upload_vectors(auth: &Authenticator) -> anyhow::Result<BTreeMap<String, TestVector>> {
    let mut vectors = BTreeMap::new();

    let key = auth.derive_key("user-1")?;
    vectors.insert(
        "derive_user_key".to_string(),
        vector(
            "HMAC-SHA256(save_secret, user_id)",
            &[("user_id", "user-1")],
            &[("key", hex::encode(key.as_bytes()))],
        ),
    );

    // Spaces must be escaped as %20, never '+'.
    let data = r#"{"playtime": 10, "credit_all": 100}"#;
    vectors.insert(
        "canonical_string_spaces".to_string(),
        vector(
            "data=<escaped data>&user_id=<escaped user id>",
            &[("data", data), ("user_id", "user 1")],
            &[("canonical", canonicalize(data, "user 1"))],
        ),
    );

    let sig = auth.sign_save(data, "user-1", "user-1")?;
    vectors.insert(
        "upload_signature".to_string(),
        vector(
            "hex(HMAC-SHA256(derive(user_id), canonical))",
            &[("data", data), ("user_id", "user-1")],
            &[("sig", sig)],
        ),
    );

    // Older clients send the id base64-encoded and derive the key from the
    // encoded form.
    let raw_id = base64::engine::general_purpose::STANDARD.encode("user-1");
    let sig = auth.sign_save(data, &raw_id, &raw_id)?;
    vectors.insert(
        "upload_signature_encoded_user_id".to_string(),
        vector(
            "signature keyed by the raw (encoded) user id",
            &[("data", data), ("user_id", raw_id.as_str())],
            &[("sig", sig)],
        ),
    );

    Ok(vectors)
}

fn read_vectors(auth: &Authenticator) -> anyhow::Result<BTreeMap<String, TestVector>> {
    let mut vectors = BTreeMap::new();

    vectors.insert(
        "read_signature".to_string(),
        vector(
            "hex(HMAC-SHA256(load_secret, user_id))",
            &[("user_id", "user-1")],
            &[("sig", auth.sign_user("user-1")?)],
        ),
    );

    let mut snapshot = SaveSnapshot::new("user-1");
    snapshot.counters.playtime = 20;
    snapshot.counters.credit_all = 200;
    snapshot.achievements.insert("first_jackpot".to_string());
    let data = pusher_codec::encode_load_data(&snapshot)?;
    let sig = auth.sign_load_payload(&data)?;
    vectors.insert(
        "load_response".to_string(),
        vector(
            "base64std(wire JSON) and hex(HMAC-SHA256(load_secret, data))",
            &[("user_id", "user-1"), ("playtime", "20"), ("credit_all", "200")],
            &[("data", data), ("sig", sig)],
        ),
    );

    Ok(vectors)
}

fn decode_vectors() -> anyhow::Result<BTreeMap<String, TestVector>> {
    let mut vectors = BTreeMap::new();

    for (name, raw) in [
        ("user_id_base64", "dXNlci0x"),
        ("user_id_percent", "user%201"),
        ("user_id_plus", "user+1"),
        ("user_id_plain", "user-1"),
    ] {
        vectors.insert(
            name.to_string(),
            vector(
                "decoded user id",
                &[("user_id", raw)],
                &[("decoded", pusher_codec::decode_user_id(raw)?)],
            ),
        );
    }

    let json = r#"{"playtime":"30","credit_all":123.9,"l_achieve":[1,"2",null]}"#;
    let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    for (name, raw) in [
        ("payload_base64url", engine.encode(json)),
        ("payload_percent", pusher_codec::escape::query_escape(json)),
    ] {
        let snapshot = pusher_codec::decode_snapshot(&raw, "user-1")?;
        let achievements: Vec<_> = snapshot.achievements.iter().cloned().collect();
        vectors.insert(
            name.to_string(),
            vector(
                "payload decoded with loose field rules",
                &[("data", raw.as_str())],
                &[
                    ("playtime", snapshot.counters.playtime.to_string()),
                    ("credit_all", snapshot.counters.credit_all.to_string()),
                    ("achievements", achievements.join(",")),
                ],
            ),
        );
    }

    Ok(vectors)
}

fn generate_all_vectors() -> anyhow::Result<TestVectors> {
    let auth = authenticator();
    let mut all_vectors = BTreeMap::new();
    all_vectors.extend(upload_vectors(&auth)?);
    all_vectors.extend(read_vectors(&auth)?);
    all_vectors.extend(decode_vectors()?);

    Ok(TestVectors {
        version: "1".to_string(),
        generated_by: format!("pusher-testvec {}", env!("CARGO_PKG_VERSION")),
        secrets: BTreeMap::from([
            ("save_secret".to_string(), SAVE_SECRET.to_string()),
            ("load_secret".to_string(), LOAD_SECRET.to_string()),
        ]),
        vectors: all_vectors,
    })
}

fn verify_vectors(vectors: &TestVectors) -> anyhow::Result<bool> {
    let regenerated = generate_all_vectors()?;
    let mut all_pass = true;

    for (name, expected) in &vectors.vectors {
        match regenerated.vectors.get(name) {
            Some(actual) if actual.outputs == expected.outputs => eprintln!("PASS: {name}"),
            Some(actual) => {
                eprintln!("FAIL: {name}");
                eprintln!("  expected: {:?}", expected.outputs);
                eprintln!("  actual:   {:?}", actual.outputs);
                all_pass = false;
            }
            None => {
                eprintln!("MISSING: {name}");
                all_pass = false;
            }
        }
    }

    Ok(all_pass)
}

fn write_vectors(path: &Path, vectors: &TestVectors) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(vectors)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    eprintln!("Generated {} test vectors to {}", vectors.vectors.len(), path.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let verify = std::env::args().any(|a| a == "--verify");
    let path = Path::new(VECTORS_PATH);

    let vectors = if verify && path.exists() {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).context("parsing test vectors")?
    } else {
        let vectors = generate_all_vectors()?;
        write_vectors(path, &vectors)?;
        vectors
    };

    if verify_vectors(&vectors)? {
        eprintln!("All test vectors verified successfully.");
        Ok(())
    } else {
        anyhow::bail!("test vector verification failed")
    }
}
