//! Signature properties checked through the public API against an
//! independent HMAC-SHA256 verifier.

use base64::Engine;
use hmac::{Hmac, Mac};
use rapyd::signer::{canonical_string, sign, FixedClock, FixedRandom, Method};
use rapyd::Credentials;
use serde_json::json;
use sha2::Sha256;

fn independent_digest(secret: &str, message: &str) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(message.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

#[test]
fn signature_decodes_to_independent_digest() {
    let creds = Credentials::new("rak_roundtrip", "rsk_roundtrip");
    let body = json!({
        "amount": "25.50",
        "currency": "EUR",
        "country": "DE",
        "metadata": {"description": "order 12345"}
    });
    let signed = sign(
        Method::Post,
        "/v1/checkout",
        Some(&body),
        &creds,
        &FixedClock(1_712_345_678),
        &FixedRandom(vec![1, 2, 3, 4, 5, 6, 7, 8]),
    )
    .unwrap();

    assert_eq!(signed.salt, "0102030405060708");

    let canonical = format!(
        "post/v1/checkout{}{}{}{}{}",
        signed.salt,
        signed.timestamp,
        "rak_roundtrip",
        "rsk_roundtrip",
        serde_json::to_string(&body).unwrap()
    );
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(&signed.signature)
        .unwrap();
    assert_eq!(decoded, independent_digest("rsk_roundtrip", &canonical));
}

#[test]
fn hex_text_encoding_is_not_what_we_emit() {
    let creds = Credentials::new("ak", "sk");
    let signed = sign(
        Method::Get,
        "/v1/data/countries",
        None,
        &creds,
        &FixedClock(1),
        &FixedRandom(vec![9]),
    )
    .unwrap();

    let canonical = canonical_string(
        Method::Get,
        "/v1/data/countries",
        &signed.salt,
        &signed.timestamp,
        "ak",
        "sk",
        "",
    );
    let digest = independent_digest("sk", &canonical);
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    let base64_of_hex_text = base64::engine::general_purpose::STANDARD.encode(hex.as_bytes());
    let url_safe = base64::engine::general_purpose::URL_SAFE.encode(&digest);

    assert_ne!(signed.signature, base64_of_hex_text);
    assert_ne!(signed.signature, hex);
    assert_eq!(
        signed.signature,
        base64::engine::general_purpose::STANDARD.encode(&digest)
    );
    if url_safe.contains('-') || url_safe.contains('_') {
        assert_ne!(signed.signature, url_safe);
    }
}

#[test]
fn same_inputs_same_signature_different_salt_different_signature() {
    let creds = Credentials::new("ak", "sk");
    let body = json!({"amount": "1.00"});
    let sign_with = |salt: u8| {
        sign(
            Method::Post,
            "/v1/payments",
            Some(&body),
            &creds,
            &FixedClock(1_700_000_000),
            &FixedRandom(vec![salt]),
        )
        .unwrap()
    };
    assert_eq!(sign_with(7).signature, sign_with(7).signature);
    assert_ne!(sign_with(7).signature, sign_with(8).signature);
}
