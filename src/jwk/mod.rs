//! JSON Web Keys ([RFC 7517][RFC7517])
//!
//! A [`Jwk`] pairs a [`Key`] with the optional JWK metadata members (`kid`,
//! `use`, `key_ops`, `alg`, and the X.509 thumbprint/chain fields), plus an
//! ordered map of any other members so that unknown parameters survive a
//! parse/emit round trip.
//!
//! Construction dispatches on `kty`; an unrecognized key type fails with
//! [`Error::UnknownKeyType`]. Emission has three levels of disclosure, from
//! public-only through symmetric to full private parameters.
//!
//! [RFC7517]: https://tools.ietf.org/html/rfc7517

use rsa::traits::PrivateKeyParts;
use serde_json::{Map, Value};

use crate::base64;
use crate::error::Error;

pub mod key;
mod thumbprint;

pub use self::key::{EcCurve, EcKey, Key, OctKey, OkpCurve, OkpKey, PasswordKey, RsaKey};
pub use self::thumbprint::THUMBPRINT_URI_PREFIX;

/// The `use` member: what the key is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUse {
    /// `sig`
    Signature,
    /// `enc`
    Encryption,
}

impl KeyUse {
    /// The JWK string form.
    pub fn name(&self) -> &'static str {
        match self {
            KeyUse::Signature => "sig",
            KeyUse::Encryption => "enc",
        }
    }

    fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            "sig" => Ok(KeyUse::Signature),
            "enc" => Ok(KeyUse::Encryption),
            other => Err(Error::Jose(format!("unknown key use {other:?}"))),
        }
    }
}

/// The `key_ops` member values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum KeyOperation {
    Sign,
    Verify,
    Encrypt,
    Decrypt,
    WrapKey,
    UnwrapKey,
    DeriveKey,
    DeriveBits,
}

impl KeyOperation {
    /// The JWK string form.
    pub fn name(&self) -> &'static str {
        match self {
            KeyOperation::Sign => "sign",
            KeyOperation::Verify => "verify",
            KeyOperation::Encrypt => "encrypt",
            KeyOperation::Decrypt => "decrypt",
            KeyOperation::WrapKey => "wrapKey",
            KeyOperation::UnwrapKey => "unwrapKey",
            KeyOperation::DeriveKey => "deriveKey",
            KeyOperation::DeriveBits => "deriveBits",
        }
    }

    fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            "sign" => Ok(KeyOperation::Sign),
            "verify" => Ok(KeyOperation::Verify),
            "encrypt" => Ok(KeyOperation::Encrypt),
            "decrypt" => Ok(KeyOperation::Decrypt),
            "wrapKey" => Ok(KeyOperation::WrapKey),
            "unwrapKey" => Ok(KeyOperation::UnwrapKey),
            "deriveKey" => Ok(KeyOperation::DeriveKey),
            "deriveBits" => Ok(KeyOperation::DeriveBits),
            other => Err(Error::Jose(format!("unknown key operation {other:?}"))),
        }
    }
}

/// How much of the key to disclose when emitting a JWK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLevel {
    /// Public parameters only. Symmetric keys emit no key material at all.
    PublicOnly,
    /// Public parameters plus symmetric key material.
    IncludeSymmetric,
    /// Everything, including private asymmetric parameters.
    IncludePrivate,
}

/// A key with its JWK metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Jwk {
    key: Key,
    key_id: Option<String>,
    key_use: Option<KeyUse>,
    key_ops: Option<Vec<KeyOperation>>,
    algorithm: Option<String>,
    x5c: Option<Vec<String>>,
    x5t: Option<String>,
    x5t_s256: Option<String>,
    other: Map<String, Value>,
}

impl Jwk {
    /// Wrap a bare key with no metadata.
    pub fn from_key(key: Key) -> Self {
        Self {
            key,
            key_id: None,
            key_use: None,
            key_ops: None,
            algorithm: None,
            x5c: None,
            x5t: None,
            x5t_s256: None,
            other: Map::new(),
        }
    }

    /// Parse a JWK from JSON text.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Parse a JWK from an already-parsed JSON value.
    pub fn from_value(value: &Value) -> Result<Self, Error> {
        let map = value
            .as_object()
            .ok_or_else(|| Error::Jose("JWK must be a JSON object".into()))?;

        let kty = map
            .get("kty")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Jose("JWK is missing the kty member".into()))?;

        let (key, consumed): (Key, &[&str]) = match kty {
            "RSA" => (parse_rsa(map)?, RSA_MEMBERS),
            "EC" => (parse_ec(map)?, EC_MEMBERS),
            "OKP" => (parse_okp(map)?, OKP_MEMBERS),
            "oct" => (parse_oct(map)?, OCT_MEMBERS),
            other => return Err(Error::UnknownKeyType(other.to_owned())),
        };

        let mut jwk = Jwk::from_key(key);
        jwk.key_id = member_str(map, "kid")?.map(str::to_owned);
        jwk.key_use = member_str(map, "use")?.map(KeyUse::from_name).transpose()?;
        jwk.key_ops = match map.get("key_ops") {
            None => None,
            Some(Value::Array(ops)) => Some(
                ops.iter()
                    .map(|op| {
                        op.as_str()
                            .ok_or_else(|| Error::Jose("key_ops contains a non-string".into()))
                            .and_then(KeyOperation::from_name)
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(_) => return Err(Error::Jose("key_ops is not an array".into())),
        };
        jwk.algorithm = member_str(map, "alg")?.map(str::to_owned);
        jwk.x5c = match map.get("x5c") {
            None => None,
            Some(Value::Array(certs)) => Some(
                certs
                    .iter()
                    .map(|cert| {
                        cert.as_str()
                            .map(str::to_owned)
                            .ok_or_else(|| Error::Jose("x5c contains a non-string".into()))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(_) => return Err(Error::Jose("x5c is not an array".into())),
        };
        jwk.x5t = member_str(map, "x5t")?.map(str::to_owned);
        jwk.x5t_s256 = member_str(map, "x5t#S256")?.map(str::to_owned);

        for (name, value) in map {
            if name == "kty"
                || consumed.contains(&name.as_str())
                || METADATA_MEMBERS.contains(&name.as_str())
            {
                continue;
            }
            jwk.other.insert(name.clone(), value.clone());
        }

        Ok(jwk)
    }

    /// The key itself.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Take the key, discarding metadata.
    pub fn into_key(self) -> Key {
        self.key
    }

    /// The `kid` member.
    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    /// Set the `kid` member.
    pub fn set_key_id(&mut self, kid: &str) {
        self.key_id = Some(kid.to_owned());
    }

    /// The `use` member.
    pub fn key_use(&self) -> Option<KeyUse> {
        self.key_use
    }

    /// Set the `use` member.
    pub fn set_key_use(&mut self, key_use: KeyUse) {
        self.key_use = Some(key_use);
    }

    /// The `key_ops` member.
    pub fn key_operations(&self) -> Option<&[KeyOperation]> {
        self.key_ops.as_deref()
    }

    /// Set the `key_ops` member.
    pub fn set_key_operations(&mut self, ops: Vec<KeyOperation>) {
        self.key_ops = Some(ops);
    }

    /// The `alg` hint.
    pub fn algorithm(&self) -> Option<&str> {
        self.algorithm.as_deref()
    }

    /// Set the `alg` hint.
    pub fn set_algorithm(&mut self, alg: &str) {
        self.algorithm = Some(alg.to_owned());
    }

    /// The `x5c` certificate chain, base64 DER strings carried opaquely.
    pub fn certificate_chain(&self) -> Option<&[String]> {
        self.x5c.as_deref()
    }

    /// Any non-registered members, in their original order.
    pub fn other_parameters(&self) -> &Map<String, Value> {
        &self.other
    }

    /// Emit the JWK as an ordered parameter map at the given disclosure
    /// level.
    pub fn to_params(&self, level: OutputLevel) -> Result<Map<String, Value>, Error> {
        let kty = self
            .key
            .key_type()
            .ok_or_else(|| Error::InvalidKey("a password cannot be expressed as a JWK".into()))?;

        let mut params = Map::new();
        params.insert("kty".into(), Value::from(kty));
        if let Some(kid) = &self.key_id {
            params.insert("kid".into(), Value::from(kid.clone()));
        }
        if let Some(key_use) = self.key_use {
            params.insert("use".into(), Value::from(key_use.name()));
        }
        if let Some(ops) = &self.key_ops {
            let ops: Vec<Value> = ops.iter().map(|op| Value::from(op.name())).collect();
            params.insert("key_ops".into(), Value::Array(ops));
        }
        if let Some(alg) = &self.algorithm {
            params.insert("alg".into(), Value::from(alg.clone()));
        }
        if let Some(x5c) = &self.x5c {
            let certs: Vec<Value> = x5c.iter().map(|cert| Value::from(cert.clone())).collect();
            params.insert("x5c".into(), Value::Array(certs));
        }
        if let Some(x5t) = &self.x5t {
            params.insert("x5t".into(), Value::from(x5t.clone()));
        }
        if let Some(x5t_s256) = &self.x5t_s256 {
            params.insert("x5t#S256".into(), Value::from(x5t_s256.clone()));
        }

        match &self.key {
            Key::Rsa(rsa) => emit_rsa(rsa, level, &mut params),
            Key::Ec(ec) => emit_ec(ec, level, &mut params),
            Key::Okp(okp) => emit_okp(okp, level, &mut params),
            Key::Oct(oct) => emit_oct(oct, level, &mut params),
            Key::Password(_) => unreachable!("rejected above"),
        }

        for (name, value) in &self.other {
            params.insert(name.clone(), value.clone());
        }

        Ok(params)
    }

    /// Emit the JWK as JSON text.
    pub fn to_json(&self, level: OutputLevel) -> Result<String, Error> {
        Ok(Value::Object(self.to_params(level)?).to_string())
    }
}

const RSA_MEMBERS: &[&str] = &["n", "e", "d", "p", "q", "dp", "dq", "qi", "oth"];
const EC_MEMBERS: &[&str] = &["crv", "x", "y", "d"];
const OKP_MEMBERS: &[&str] = &["crv", "x", "d"];
const OCT_MEMBERS: &[&str] = &["k"];
const METADATA_MEMBERS: &[&str] = &["kid", "use", "key_ops", "alg", "x5c", "x5t", "x5t#S256"];

fn member_str<'a>(map: &'a Map<String, Value>, name: &str) -> Result<Option<&'a str>, Error> {
    match map.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(Some)
            .ok_or_else(|| Error::Jose(format!("JWK member {name} is not a string"))),
    }
}

fn required_b64(map: &Map<String, Value>, name: &str) -> Result<Vec<u8>, Error> {
    let value = member_str(map, name)?
        .ok_or_else(|| Error::Jose(format!("JWK is missing the {name} member")))?;
    base64::decode(value)
}

fn optional_b64(map: &Map<String, Value>, name: &str) -> Result<Option<Vec<u8>>, Error> {
    member_str(map, name)?.map(base64::decode).transpose()
}

fn parse_rsa(map: &Map<String, Value>) -> Result<Key, Error> {
    if map.contains_key("oth") {
        return Err(Error::InvalidKey(
            "multi-prime RSA keys (oth) are not supported".into(),
        ));
    }
    let n = required_b64(map, "n")?;
    let e = required_b64(map, "e")?;
    let key = match optional_b64(map, "d")? {
        None => RsaKey::new_public(&n, &e)?,
        Some(d) => {
            let p = optional_b64(map, "p")?;
            let q = optional_b64(map, "q")?;
            match (p, q) {
                (Some(p), Some(q)) => RsaKey::new_private(&n, &e, &d, &[&p, &q])?,
                (None, None) => RsaKey::new_private(&n, &e, &d, &[])?,
                _ => {
                    return Err(Error::InvalidKey(
                        "RSA key has only one of the p and q members".into(),
                    ))
                }
            }
        }
    };
    Ok(Key::Rsa(key))
}

fn parse_ec(map: &Map<String, Value>) -> Result<Key, Error> {
    let crv = member_str(map, "crv")?
        .ok_or_else(|| Error::Jose("EC JWK is missing the crv member".into()))?;
    let curve = EcCurve::from_name(crv)?;
    let x = required_b64(map, "x")?;
    let y = required_b64(map, "y")?;
    let d = optional_b64(map, "d")?;
    Ok(Key::Ec(EcKey::new(curve, &x, &y, d.as_deref())?))
}

fn parse_okp(map: &Map<String, Value>) -> Result<Key, Error> {
    let crv = member_str(map, "crv")?
        .ok_or_else(|| Error::Jose("OKP JWK is missing the crv member".into()))?;
    let curve = OkpCurve::from_name(crv)?;
    let x = required_b64(map, "x")?;
    let d = optional_b64(map, "d")?;
    Ok(Key::Okp(OkpKey::new(curve, &x, d.as_deref())?))
}

fn parse_oct(map: &Map<String, Value>) -> Result<Key, Error> {
    let k = required_b64(map, "k")?;
    Ok(Key::from_oct(&k))
}

fn emit_rsa(rsa: &RsaKey, level: OutputLevel, params: &mut Map<String, Value>) {
    params.insert("n".into(), Value::from(base64::encode(&rsa.n_bytes())));
    params.insert("e".into(), Value::from(base64::encode(&rsa.e_bytes())));

    if level != OutputLevel::IncludePrivate {
        return;
    }
    let Some(private) = rsa.private_key() else {
        return;
    };

    let emit = |value: &rsa::BigUint| Value::from(base64::encode(&value.to_bytes_be()));
    params.insert("d".into(), emit(private.d()));
    let primes = private.primes();
    if primes.len() == 2 {
        let p = &primes[0];
        let q = &primes[1];
        params.insert("p".into(), emit(p));
        params.insert("q".into(), emit(q));
        params.insert("dp".into(), emit(&(private.d() % (p - 1u32))));
        params.insert("dq".into(), emit(&(private.d() % (q - 1u32))));
        // p is prime, so the CRT coefficient q^-1 mod p is q^(p-2) mod p.
        params.insert("qi".into(), emit(&q.modpow(&(p - 2u32), p)));
    }
}

fn emit_ec(ec: &EcKey, level: OutputLevel, params: &mut Map<String, Value>) {
    params.insert("crv".into(), Value::from(ec.curve().name()));
    params.insert("x".into(), Value::from(base64::encode(ec.x())));
    params.insert("y".into(), Value::from(base64::encode(ec.y())));
    if level == OutputLevel::IncludePrivate {
        if let Some(d) = ec.d() {
            params.insert("d".into(), Value::from(base64::encode(d)));
        }
    }
}

fn emit_okp(okp: &OkpKey, level: OutputLevel, params: &mut Map<String, Value>) {
    params.insert("crv".into(), Value::from(okp.curve().name()));
    params.insert("x".into(), Value::from(base64::encode(okp.x())));
    if level == OutputLevel::IncludePrivate {
        if let Some(d) = okp.d() {
            params.insert("d".into(), Value::from(base64::encode(d)));
        }
    }
}

fn emit_oct(oct: &OctKey, level: OutputLevel, params: &mut Map<String, Value>) {
    if level != OutputLevel::PublicOnly {
        params.insert("k".into(), Value::from(base64::encode(oct.value())));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn strip_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn ec_jwk_from_rfc7515_a3() {
        let jwk = Jwk::from_value(&json!({
            "kty":"EC",
            "crv":"P-256",
            "x":"f83OJ3D2xF1Bg8vub9tLe1gHMzV76e8Tus9uPHvRVEU",
            "y":"x_FEzRu9m36HLN_tue659LNpXW6pCyStikYjKIWI5a0",
            "d":"jpsQnnGQmL-YBIffH1136cspYG6-0iY7X1fCE9-E9LI"
        }))
        .unwrap();

        let Key::Ec(ec) = jwk.key() else {
            panic!("expected an EC key")
        };
        assert_eq!(ec.curve(), EcCurve::P256);
        assert!(ec.is_private());

        let public = jwk.to_params(OutputLevel::PublicOnly).unwrap();
        assert!(!public.contains_key("d"));
        let private = jwk.to_params(OutputLevel::IncludePrivate).unwrap();
        assert_eq!(
            private.get("d").unwrap().as_str().unwrap(),
            "jpsQnnGQmL-YBIffH1136cspYG6-0iY7X1fCE9-E9LI"
        );
    }

    #[test]
    fn oct_jwk_symmetric_disclosure() {
        let jwk = Jwk::from_value(&json!({
            "kty":"oct",
            "kid":"018c0ae5-4d9b-471b-bfd6-eef314bc7037",
            "use":"sig",
            "k":"hJtXIZ2uSN5kbQfbtTNWbpdmhkV8FJG-Onbc6mxCcYg"
        }))
        .unwrap();

        assert_eq!(jwk.key_id(), Some("018c0ae5-4d9b-471b-bfd6-eef314bc7037"));
        assert_eq!(jwk.key_use(), Some(KeyUse::Signature));

        let public = jwk.to_params(OutputLevel::PublicOnly).unwrap();
        assert!(!public.contains_key("k"));
        let symmetric = jwk.to_params(OutputLevel::IncludeSymmetric).unwrap();
        assert_eq!(
            symmetric.get("k").unwrap().as_str().unwrap(),
            "hJtXIZ2uSN5kbQfbtTNWbpdmhkV8FJG-Onbc6mxCcYg"
        );
    }

    #[test]
    fn unknown_kty_is_rejected() {
        let err = Jwk::from_value(&json!({"kty":"LWE","k":"AQAB"})).unwrap_err();
        assert!(matches!(err, Error::UnknownKeyType(kty) if kty == "LWE"));
    }

    #[test]
    fn unknown_members_round_trip() {
        let jwk = Jwk::from_value(&json!({
            "kty":"oct",
            "k":"GawgguFyGrWKav7AX4VKUg",
            "ext":true,
            "x-vendor":"zig"
        }))
        .unwrap();

        assert_eq!(jwk.other_parameters().len(), 2);
        let emitted = jwk.to_json(OutputLevel::IncludeSymmetric).unwrap();
        assert_eq!(
            emitted,
            strip_whitespace(
                r#"{"kty":"oct","k":"GawgguFyGrWKav7AX4VKUg","ext":true,"x-vendor":"zig"}"#
            )
        );
    }

    #[test]
    fn rsa_private_jwk_rederives_crt_params() {
        // RFC 7517 Appendix A.2's RSA key, truncated members removed: use a
        // freshly parsed cookbook-style key instead.
        let jwk = Jwk::from_value(&json!({
            "kty": "RSA",
            "n": "sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1Wl\
                  UzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDpre\
                  cbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_\
                  7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBI\
                  Y2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU\
                  7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw",
            "e": "AQAB",
            "d": "VFCWOqXr8nvZNyaaJLXdnNPXZKRaWCjkU5Q2egQQpTBMwhprMzWzpR8Sxq\
                  1OPThh_J6MUD8Z35wky9b8eEO0pwNS8xlh1lOFRRBoNqDIKVOku0aZb-ry\
                  nq8cxjDTLZQ6Fz7jSjR1Klop-YKaUHc9GsEofQqYruPhzSA-QgajZGPbE_\
                  0ZaVDJHfyd7UUBUKunFMScbflYAAOYJqVIVwaYR5zWEEceUjNnTNo_CVSj\
                  -VvXLO5VZfCUAVLgW4dpf1SrtZjSt34YLsRarSb127reG_DUwg9Ch-Kyvj\
                  T1SkHgUWRVGcyly7uvVGRSDwsXypdrNinPA4jlhoNdizK2zF2CWQ",
            "p": "9gY2w6I6S6L0juEKsbeDAwpd9WMfgqFoeA9vEyEUuk4kLwBKcoe1x4HG68\
                  ik918hdDSE9vDQSccA3xXHOAFOPJ8R9EeIAbTi1VwBYnbTp87X-xcPWlEP\
                  krdoUKW60tgs1aNd_Nnc9LEVVPMS390zbFxt8TN_biaBgelNgbC95sM",
            "q": "uKlCKvKv_ZJMVcdIs5vVSU_6cPtYI1ljWytExV_skstvRSNi9r66jdd9-y\
                  BhVfuG4shsp2j7rGnIio901RBeHo6TPKWVVykPu1iYhQXw1jIABfw-MVsN\
                  -3bQ76WLdt2SDxsHs7q7zPyUyHXmps7ycZ5c72wGkUwNOjYelmkiNS0",
            "dp": "w0kZbV63cVRvVX6yk3C8cMxo2qCM4Y8nsq1lmMSYhG4EcL6FWbX5h9yuv\
                   ngs4iLEFk6eALoUS4vIWEwcL4txw9LsWH_zKI-hwoReoP77cOdSL4AVcra\
                   Hawlkpyd2TWjE5evgbhWtOxnZee3cXJBkAi64Ik6jZxbvk-RR3pEhnCs",
            "dq": "o_8V14SezckO6CNLKs_btPdFiO9_kC1DsuUTd2LAfIIVeMZ7jn1Gus_Ff\
                   7B7IVx3p5KuBGOVF8L-qifLb6nQnLysgHDh132NDioZkhH7mI7hPG-PYE_\
                   odApKdnqECHWw0J-F0JWnUd6D2B_1TvF9mXA2Qx-iGYn8OVV1Bsmp6qU",
            "qi": "eNho5yRBEBxhGBtQRww9QirZsB66TrfFReG_CcteI1aCneT0ELGhYlRlC\
                   tUkTRclIfuEPmNsNDPbLoLqqCVznFbvdB7x-Tl-m0l_eFTj2KiqwGqE9PZ\
                   B9nNTwMVvH3VRRSLWACvPnSiwP8N5Usy-WRXS-V7TbpxIhvepTfE0NNo"
        }))
        .unwrap();

        let params = jwk.to_params(OutputLevel::IncludePrivate).unwrap();
        for member in ["n", "e", "d", "p", "q", "dp", "dq", "qi"] {
            assert!(params.contains_key(member), "missing {member}");
        }

        // The emitted private JWK parses back into an equivalent key.
        let reparsed = Jwk::from_value(&Value::Object(params)).unwrap();
        assert_eq!(reparsed.key(), jwk.key());
        assert_eq!(
            reparsed.to_params(OutputLevel::PublicOnly).unwrap(),
            jwk.to_params(OutputLevel::PublicOnly).unwrap()
        );
    }

    #[test]
    fn rsa_with_single_prime_member_is_rejected() {
        let err = Jwk::from_value(&json!({
            "kty": "RSA", "n": "AQAB", "e": "AQAB", "d": "AQAB", "p": "AQAB"
        }))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidKey(_)));
    }
}
