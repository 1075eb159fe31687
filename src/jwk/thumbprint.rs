//! JWK thumbprints ([RFC 7638][RFC7638]).
//!
//! The thumbprint is a digest over a canonical JSON form of the key: only
//! the required members for the key type, in lexicographic order, with no
//! whitespace. Metadata members never participate, so the thumbprint is
//! stable under any reordering or decoration of the input JWK.
//!
//! [RFC7638]: https://tools.ietf.org/html/rfc7638

use digest::Digest;
use serde_json::{Map, Value};

use super::{Jwk, Key};
use crate::base64;
use crate::error::Error;

/// Prefix of the JWK thumbprint URI form (RFC 9278).
pub const THUMBPRINT_URI_PREFIX: &str = "urn:ietf:params:oauth:jwk-thumbprint:";

impl Jwk {
    /// The raw thumbprint digest.
    pub fn thumbprint<D: Digest>(&self) -> Result<Vec<u8>, Error> {
        let canonical = self.canonical_json()?;
        let mut hasher = D::new();
        hasher.update(canonical.as_bytes());
        Ok(hasher.finalize().to_vec())
    }

    /// The base64url-encoded thumbprint.
    pub fn thumbprint_base64<D: Digest>(&self) -> Result<String, Error> {
        Ok(base64::encode(&self.thumbprint::<D>()?))
    }

    /// The SHA-256 thumbprint URI,
    /// `urn:ietf:params:oauth:jwk-thumbprint:sha-256:<base64url>`.
    pub fn thumbprint_uri(&self) -> Result<String, Error> {
        let thumb = self.thumbprint_base64::<sha2::Sha256>()?;
        Ok(format!("{THUMBPRINT_URI_PREFIX}sha-256:{thumb}"))
    }

    // Required members only, inserted in lexicographic order. The ordered
    // map serializes exactly as inserted.
    fn canonical_json(&self) -> Result<String, Error> {
        let mut members = Map::new();
        match &self.key {
            Key::Rsa(rsa) => {
                members.insert("e".into(), Value::from(base64::encode(&rsa.e_bytes())));
                members.insert("kty".into(), Value::from("RSA"));
                members.insert("n".into(), Value::from(base64::encode(&rsa.n_bytes())));
            }
            Key::Ec(ec) => {
                members.insert("crv".into(), Value::from(ec.curve().name()));
                members.insert("kty".into(), Value::from("EC"));
                members.insert("x".into(), Value::from(base64::encode(ec.x())));
                members.insert("y".into(), Value::from(base64::encode(ec.y())));
            }
            Key::Okp(okp) => {
                members.insert("crv".into(), Value::from(okp.curve().name()));
                members.insert("kty".into(), Value::from("OKP"));
                members.insert("x".into(), Value::from(base64::encode(okp.x())));
            }
            Key::Oct(oct) => {
                members.insert("k".into(), Value::from(base64::encode(oct.value())));
                members.insert("kty".into(), Value::from("oct"));
            }
            Key::Password(_) => {
                return Err(Error::InvalidKey(
                    "a password has no JWK thumbprint".into(),
                ))
            }
        }
        Ok(Value::Object(members).to_string())
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use sha2::Sha256;

    use crate::jwk::Jwk;

    fn strip_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn rfc7638_example() {
        // The RSA key and expected thumbprint from RFC 7638 section 3.1.
        let jwk = Jwk::from_value(&json!({
            "kty": "RSA",
            "n": strip_whitespace(
                "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAt
                 VT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn6
                 4tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FD
                 W2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n9
                 1CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINH
                 aQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw"),
            "e": "AQAB",
            "alg": "RS256",
            "kid": "2011-04-29"
        }))
        .unwrap();

        assert_eq!(
            jwk.thumbprint_base64::<Sha256>().unwrap(),
            "NzbLsXh8uDCcd-6MNwXF4W_7noWXFZAfHkxZsRGC9Xs"
        );
        assert_eq!(
            jwk.thumbprint_uri().unwrap(),
            "urn:ietf:params:oauth:jwk-thumbprint:sha-256:NzbLsXh8uDCcd-6MNwXF4W_7noWXFZAfHkxZsRGC9Xs"
        );
    }

    #[test]
    fn stable_under_member_reordering() {
        let forward = Jwk::from_value(&json!({
            "kty": "oct",
            "k": "GawgguFyGrWKav7AX4VKUg"
        }))
        .unwrap();
        let reordered = Jwk::from_value(&json!({
            "k": "GawgguFyGrWKav7AX4VKUg",
            "use": "sig",
            "kid": "anything",
            "kty": "oct"
        }))
        .unwrap();

        assert_eq!(
            forward.thumbprint::<Sha256>().unwrap(),
            reordered.thumbprint::<Sha256>().unwrap()
        );
    }
}
