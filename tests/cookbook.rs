//! End-to-end signing and encryption scenarios built on published RFC
//! examples (RFC 7515, RFC 7516, RFC 7520).

use rand_core::OsRng;
use serde_json::json;

use joze::jwa::AlgorithmConstraints;
use joze::jwk::{Jwk, Key, OutputLevel};
use joze::{ContentEncryptionAlgorithm, JsonWebEncryption, JsonWebSignature, KeyManagementAlgorithm, SignatureAlgorithm};

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

// The shared payload of the RFC 7520 section 4 signature examples,
// base64url as transmitted ("It’s a dangerous business, Frodo, ...").
const RFC7520_PAYLOAD_B64: &str = "SXTigJlzIGEgZGFuZ2Vyb3VzIGJ1c2luZXNzLCBGcm9kbywgZ29pbmcgb3V0IHlvdXIgZG9vci4gWW91IHN0ZXAgb250byB0aGUgcm9hZCwgYW5kIGlmIHlvdSBkb24ndCBrZWVwIHlvdXIgZmVldCwgdGhlcmXigJlzIG5vIGtub3dpbmcgd2hlcmUgeW91IG1pZ2h0IGJlIHN3ZXB0IG9mZiB0by4";

#[test]
fn rfc7520_section_4_4_hs256_round_trip() {
    // HMAC key from RFC 7520 section 3.5.
    let key = Jwk::from_value(&json!({
        "kty": "oct",
        "kid": "018c0ae5-4d9b-471b-bfd6-eef314bc7037",
        "use": "sig",
        "alg": "HS256",
        "k": "hJtXIZ2uSN5kbQfbtTNWbpdmhkV8FJG-Onbc6mxCcYg"
    }))
    .unwrap();

    let payload = joze::base64::decode(RFC7520_PAYLOAD_B64).unwrap();

    let mut jws = JsonWebSignature::new();
    jws.set_algorithm(SignatureAlgorithm::Hs256);
    jws.set_key_id(key.key_id().unwrap());
    jws.set_payload_bytes(&payload);

    let compact = jws.sign(key.key(), &mut OsRng).unwrap();
    assert!(
        compact.ends_with(".s0h6KThzkfBBBkLspW1h84VsJZFTsPPqMDA7g1Md7p0"),
        "unexpected signature in {compact}"
    );
    assert!(compact.starts_with(
        "eyJhbGciOiJIUzI1NiIsImtpZCI6IjAxOGMwYWU1LTRkOWItNDcxYi1iZmQ2LWVlZjMxNGJjNzAzNyJ9."
    ));

    let parsed = JsonWebSignature::from_compact_serialization(&compact).unwrap();
    assert!(parsed.verify_signature(key.key()).unwrap());
    assert_eq!(parsed.payload_bytes(), payload);
}

// The RSA key pair from RFC 7515 Appendix A.2.
fn rfc7515_a2_key() -> Key {
    Jwk::from_value(&json!( {"kty":"RSA",
          "n": strip_whitespace("ofgWCuLjybRlzo0tZWJjNiuSfb4p4fAkd_wWJcyQoTbji9k0l8W26mPddx
   HmfHQp-Vaw-4qPCJrcS2mJPMEzP1Pt0Bm4d4QlL-yRT-SFd2lZS-pCgNMs
   D1W_YpRPEwOWvG6b32690r2jZ47soMZo9wGzjb_7OMg0LOL-bSf63kpaSH
   SXndS5z5rexMdbBYUsLA9e-KXBdQOS-UTo7WTBEMa2R2CapHg665xsmtdV
   MTBQY4uDZlxvb3qCo5ZwKh9kG4LT6_I5IhlJH7aGhyxXFvUK-DWNmoudF8
   NAco9_h9iaGNj8q2ethFkMLs91kzk2PAcDTW9gb54h4FRWyuXpoQ"),
          "e":"AQAB",
          "d": strip_whitespace("Eq5xpGnNCivDflJsRQBXHx1hdR1k6Ulwe2JZD50LpXyWPEAeP88vLNO97I
   jlA7_GQ5sLKMgvfTeXZx9SE-7YwVol2NXOoAJe46sui395IW_GO-pWJ1O0
   BkTGoVEn2bKVRUCgu-GjBVaYLU6f3l9kJfFNS3E0QbVdxzubSu3Mkqzjkn
   439X0M_V51gfpRLI9JYanrC4D4qAdGcopV_0ZHHzQlBjudU2QvXt4ehNYT
   CBr6XCLQUShb1juUO1ZdiYoFaFQT5Tw8bGUl_x_jTj3ccPDVZFD9pIuhLh
   BOneufuBiB4cS98l2SR_RQyGWSeWjnczT0QU91p1DhOVRuOopznQ"),
          "p": strip_whitespace("4BzEEOtIpmVdVEZNCqS7baC4crd0pqnRH_5IB3jw3bcxGn6QLvnEtfdUdi
   YrqBdss1l58BQ3KhooKeQTa9AB0Hw_Py5PJdTJNPY8cQn7ouZ2KKDcmnPG
   BY5t7yLc1QlQ5xHdwW1VhvKn-nXqhJTBgIPgtldC-KDV5z-y2XDwGUc"),
          "q": strip_whitespace("uQPEfgmVtjL0Uyyx88GZFF1fOunH3-7cepKmtH4pxhtCoHqpWmT8YAmZxa
   ewHgHAjLYsp1ZSe7zFYHj7C6ul7TjeLQeZD_YwD66t62wDmpe_HlB-TnBA
   -njbglfIsRLtXlnDzQkv5dTltRJ11BKBBypeeF6689rjcJIDEz9RWdc")
         }
    ))
    .unwrap()
    .into_key()
}

#[test]
fn rfc7515_a2_rs256_deterministic_signature() {
    // PKCS#1 v1.5 signing is deterministic, so the compact form is fully
    // specified: header {"alg":"RS256"}, the A.2 claims, the A.2 signature.
    let mut jws = JsonWebSignature::new();
    jws.set_algorithm(SignatureAlgorithm::Rs256);
    jws.set_payload(
        "{\"iss\":\"joe\",\"iat\":1300819380,\"http://example.com/is_root\":true}",
    );

    let key = rfc7515_a2_key();
    let compact = jws.sign(&key, &mut OsRng).unwrap();
    assert_eq!(
        compact,
        strip_whitespace(
            "
    eyJhbGciOiJSUzI1NiJ9
    .
    eyJpc3MiOiJqb2UiLCJpYXQiOjEzMDA4MTkzODAsImh0dHA6Ly9leGFtc
    GxlLmNvbS9pc19yb290Ijp0cnVlfQ
    .
    OqzEd_gl5CDmUo9jVwC7yrlKSWUaAQoa2_4JSVzSem5nBjv5mx2PbkEZw
    0qP6karpsUfa0qkNlvtIrdYCWS3GnHff7LBkJkN8tvJgI1zCY2QqIOD0e
    E1yK3AGgxR0yMDHgY9SIFoXi5cK1UHPeiGkU7GlMmZf2zH-YFOQMK7__7
    VdH1y7cap6j3xW4LczctcBjJRFRku7i_gAy9JiR34WsqolbxKOQPIGK8w
    TE3Qo5BhB70IRMJL6O-jqgYVDAl0BrakNKqZtVTLss41ErM5Twyvin740
    UPIE2oHq3cLzCzXcEPEIPqr4_jerU9Wc8vevZ3-wE5czssL6RgtzJjuyw"
        )
    );

    let parsed = JsonWebSignature::from_compact_serialization(&compact).unwrap();
    assert!(parsed.verify_signature(&key).unwrap());
    assert_eq!(
        parsed.headers().string_value("alg"),
        Some("RS256"),
    );
}

#[test]
fn rsa1_5_jwe_requires_explicit_permission() {
    let key = rfc7515_a2_key();

    let mut jwe = JsonWebEncryption::new();
    jwe.set_algorithm(KeyManagementAlgorithm::Rsa1_5);
    jwe.set_content_encryption_algorithm(ContentEncryptionAlgorithm::A128CbcHs256);
    jwe.set_plaintext_string("You can trust us to stick with you through thick and thin.");

    // Blocked by the default constraints.
    assert!(matches!(
        jwe.encrypt(&key, &mut OsRng),
        Err(joze::Error::AlgorithmConstraintViolated(_))
    ));

    // Explicitly permitted, the round trip works.
    jwe.set_algorithm_constraints(AlgorithmConstraints::permit(["RSA1_5"]));
    let compact = jwe.encrypt(&key, &mut OsRng).unwrap();

    let mut parsed = JsonWebEncryption::from_compact_serialization(&compact).unwrap();
    parsed.set_algorithm_constraints(AlgorithmConstraints::permit(["RSA1_5"]));
    assert_eq!(
        parsed.decrypt(&key, &mut OsRng).unwrap(),
        b"You can trust us to stick with you through thick and thin."
    );
}

#[test]
fn rfc7520_section_5_3_pbes2_round_trip() {
    // Password, salt and count from RFC 7520 section 5.3 (the dashes in
    // the password are en dashes).
    let password = Key::from_password("entrap_o\u{2013}peter_long\u{2013}credit_tun");
    let plaintext = r#"{"keys":[{"kty":"oct","kid":"77c7e2b8-6e13-45cf-8672-617b5b45243a","use":"enc","alg":"A128GCM","k":"XctOhJAkA-pD9Lh7ZgW_2A"}]}"#;

    let mut jwe = JsonWebEncryption::new();
    jwe.set_algorithm(KeyManagementAlgorithm::Pbes2Hs512A256Kw);
    jwe.set_content_encryption_algorithm(ContentEncryptionAlgorithm::A128CbcHs256);
    jwe.set_algorithm_constraints(AlgorithmConstraints::permit(["PBES2-HS512+A256KW"]));
    jwe.headers_mut().set_string_value("p2s", "8Q1SzinasR3xchYz6ZZcHA");
    jwe.headers_mut().set_long_value("p2c", 8192);
    jwe.set_plaintext_string(plaintext);

    let compact = jwe.encrypt(&password, &mut OsRng).unwrap();

    let mut parsed = JsonWebEncryption::from_compact_serialization(&compact).unwrap();
    parsed.set_algorithm_constraints(AlgorithmConstraints::permit(["PBES2-HS512+A256KW"]));
    assert_eq!(parsed.decrypt(&password, &mut OsRng).unwrap(), plaintext.as_bytes());
    assert_eq!(parsed.headers().long_value("p2c").unwrap(), Some(8192));

    // The wrong password dies on the content tag, nothing earlier.
    let mut wrong = JsonWebEncryption::from_compact_serialization(&compact).unwrap();
    wrong.set_algorithm_constraints(AlgorithmConstraints::permit(["PBES2-HS512+A256KW"]));
    assert!(matches!(
        wrong.decrypt(&Key::from_password("guess"), &mut OsRng),
        Err(joze::Error::IntegrityFailure)
    ));
}

#[test]
fn rfc7520_section_5_5_ecdh_es_round_trip() {
    // Meriadoc's P-256 key from RFC 7520 section 5.5.1.
    let jwk = Jwk::from_value(&json!({
        "kty": "EC",
        "kid": "meriadoc.brandybuck@buckland.example",
        "use": "enc",
        "crv": "P-256",
        "x": "Ze2loSV3wrroKUN_4zhwGhCqo3Xhu1td4QjeQ5wIVR0",
        "y": "HlLtdXARY_f55A3fnzQbPcm6hgr34Mp8p-nuzQCE0Zw",
        "d": "r_kHyZ-a06rmxM3yESK84r1otSg-aQcVStkRhA-iCM8"
    }))
    .unwrap();
    let plaintext = "You can trust us to stick with you through thick and thin\u{2013}to the bitter end.";

    // Encrypt to the public half only.
    let public = Jwk::from_json(&jwk.to_json(OutputLevel::PublicOnly).unwrap()).unwrap();

    let mut jwe = JsonWebEncryption::new();
    jwe.set_algorithm(KeyManagementAlgorithm::EcdhEs);
    jwe.set_content_encryption_algorithm(ContentEncryptionAlgorithm::A128CbcHs256);
    jwe.set_plaintext_string(plaintext);
    let compact = jwe.encrypt(public.key(), &mut OsRng).unwrap();

    // Direct agreement leaves the encrypted-key segment empty, and the
    // ephemeral key travels in the header.
    assert!(compact.split('.').nth(1).unwrap().is_empty());

    let mut parsed = JsonWebEncryption::from_compact_serialization(&compact).unwrap();
    assert!(parsed.headers().object_value("epk").is_some());
    assert_eq!(
        parsed.decrypt(jwk.key(), &mut OsRng).unwrap(),
        plaintext.as_bytes()
    );
}

#[test]
fn ecdh_es_a128kw_round_trip() {
    let jwk = Jwk::from_value(&json!({
        "kty": "EC",
        "crv": "P-256",
        "x": "Ze2loSV3wrroKUN_4zhwGhCqo3Xhu1td4QjeQ5wIVR0",
        "y": "HlLtdXARY_f55A3fnzQbPcm6hgr34Mp8p-nuzQCE0Zw",
        "d": "r_kHyZ-a06rmxM3yESK84r1otSg-aQcVStkRhA-iCM8"
    }))
    .unwrap();

    let mut jwe = JsonWebEncryption::new();
    jwe.set_algorithm(KeyManagementAlgorithm::EcdhEsA128Kw);
    jwe.set_content_encryption_algorithm(ContentEncryptionAlgorithm::A128Gcm);
    jwe.set_plaintext_string("wrapped after agreement");
    let compact = jwe.encrypt(jwk.key(), &mut OsRng).unwrap();

    assert!(!compact.split('.').nth(1).unwrap().is_empty());

    let mut parsed = JsonWebEncryption::from_compact_serialization(&compact).unwrap();
    assert_eq!(
        parsed.decrypt(jwk.key(), &mut OsRng).unwrap(),
        b"wrapped after agreement"
    );
}

#[test]
fn gcm_kw_and_oaep_round_trips() {
    // A256GCMKW with a symmetric key.
    let kek = Key::from_oct(&[0xa5u8; 32]);
    let mut jwe = JsonWebEncryption::new();
    jwe.set_algorithm(KeyManagementAlgorithm::A256GcmKw);
    jwe.set_content_encryption_algorithm(ContentEncryptionAlgorithm::A256Gcm);
    jwe.set_plaintext_string("gcm wrapped");
    let compact = jwe.encrypt(&kek, &mut OsRng).unwrap();
    let mut parsed = JsonWebEncryption::from_compact_serialization(&compact).unwrap();
    assert_eq!(parsed.decrypt(&kek, &mut OsRng).unwrap(), b"gcm wrapped");

    // RSA-OAEP-256 with the RFC 7515 A.2 key pair.
    let rsa = rfc7515_a2_key();
    let mut jwe = JsonWebEncryption::new();
    jwe.set_algorithm(KeyManagementAlgorithm::RsaOaep256);
    jwe.set_content_encryption_algorithm(ContentEncryptionAlgorithm::A192CbcHs384);
    jwe.set_plaintext_string("oaep wrapped");
    let compact = jwe.encrypt(&rsa, &mut OsRng).unwrap();
    let mut parsed = JsonWebEncryption::from_compact_serialization(&compact).unwrap();
    assert_eq!(parsed.decrypt(&rsa, &mut OsRng).unwrap(), b"oaep wrapped");
}
