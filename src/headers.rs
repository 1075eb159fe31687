//! The JOSE header: an ordered map of parameters with typed accessors.
//!
//! Two forms of a header exist and must not be conflated. The *parsed map*
//! is what producers edit and consumers query. The *encoded form* is the
//! base64url string that actually travels on the wire, and it is the exact
//! bytes that a JWS signs over and a JWE authenticates as AAD. When a header
//! arrives from the network the original encoded string is retained next to
//! the parsed map, so verification never depends on re-serialization
//! producing the same bytes. Mutating any parameter drops the retained form.

use serde_json::{Map, Value};
use url::Url;

use crate::base64;
use crate::error::Error;
use crate::jwk::Jwk;

/// Registered JOSE header parameter names from RFCs 7515, 7516 and 7518.
#[allow(missing_docs)]
pub mod names {
    pub const ALGORITHM: &str = "alg";
    pub const ENCRYPTION_METHOD: &str = "enc";
    pub const ZIP: &str = "zip";
    pub const JWK_SET_URL: &str = "jku";
    pub const JWK: &str = "jwk";
    pub const KEY_ID: &str = "kid";
    pub const X509_URL: &str = "x5u";
    pub const X509_CERTIFICATE_CHAIN: &str = "x5c";
    pub const X509_CERTIFICATE_THUMBPRINT: &str = "x5t";
    pub const X509_CERTIFICATE_SHA256_THUMBPRINT: &str = "x5t#S256";
    pub const TYPE: &str = "typ";
    pub const CONTENT_TYPE: &str = "cty";
    pub const CRITICAL: &str = "crit";
    pub const EPHEMERAL_PUBLIC_KEY: &str = "epk";
    pub const AGREEMENT_PARTY_U_INFO: &str = "apu";
    pub const AGREEMENT_PARTY_V_INFO: &str = "apv";
    pub const INITIALIZATION_VECTOR: &str = "iv";
    pub const AUTHENTICATION_TAG: &str = "tag";
    pub const PBES2_SALT_INPUT: &str = "p2s";
    pub const PBES2_ITERATION_COUNT: &str = "p2c";
}

/// Ordered JOSE header parameters plus the retained wire form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    map: Map<String, Value>,
    /// The original base64url header when this was parsed from input.
    encoded: Option<String>,
}

impl Headers {
    /// An empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a parameter is present.
    pub fn has(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Set a string-valued parameter.
    pub fn set_string_value(&mut self, name: &str, value: &str) {
        self.encoded = None;
        self.map
            .insert(name.to_owned(), Value::String(value.to_owned()));
    }

    /// Set an integer-valued parameter, e.g. `p2c`.
    pub fn set_long_value(&mut self, name: &str, value: i64) {
        self.encoded = None;
        self.map.insert(name.to_owned(), Value::from(value));
    }

    /// Set a parameter to an arbitrary JSON value.
    pub fn set_object_value(&mut self, name: &str, value: Value) {
        self.encoded = None;
        self.map.insert(name.to_owned(), value);
    }

    /// Set a parameter to a JWK, emitted with public members only.
    pub fn set_jwk_value(&mut self, name: &str, jwk: &Jwk) -> Result<(), Error> {
        let params = jwk.to_params(crate::jwk::OutputLevel::PublicOnly)?;
        self.set_object_value(name, Value::Object(params));
        Ok(())
    }

    /// Remove a parameter.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.encoded = None;
        self.map.remove(name)
    }

    /// A string-valued parameter, or `None` if absent or not a string.
    pub fn string_value(&self, name: &str) -> Option<&str> {
        self.map.get(name).and_then(Value::as_str)
    }

    /// An integer-valued parameter. Present-but-wrong-shape is an error, so
    /// that e.g. `"p2c": "lots"` cannot slip past the PBES2 bounds checks.
    pub fn long_value(&self, name: &str) -> Result<Option<i64>, Error> {
        match self.map.get(name) {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| Error::Jose(format!("{name} header is not an integer"))),
        }
    }

    /// The raw JSON value of a parameter.
    pub fn object_value(&self, name: &str) -> Option<&Value> {
        self.map.get(name)
    }

    /// A string-array parameter such as `crit`.
    pub fn string_array_value(&self, name: &str) -> Result<Option<Vec<String>>, Error> {
        match self.map.get(name) {
            None => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_owned)
                        .ok_or_else(|| Error::Jose(format!("{name} header contains a non-string")))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(_) => Err(Error::Jose(format!("{name} header is not an array"))),
        }
    }

    /// A URL-valued parameter such as `jku` or `x5u`.
    pub fn url_value(&self, name: &str) -> Result<Option<Url>, Error> {
        match self.string_value(name) {
            None => Ok(None),
            Some(value) => Url::parse(value)
                .map(Some)
                .map_err(|err| Error::Jose(format!("{name} header is not a valid URL: {err}"))),
        }
    }

    /// A JWK-valued parameter such as `epk`.
    pub fn jwk_value(&self, name: &str) -> Result<Option<Jwk>, Error> {
        match self.map.get(name) {
            None => Ok(None),
            Some(value) => Jwk::from_value(value).map(Some),
        }
    }

    /// The full header as a JSON object string, parameters in insertion
    /// order.
    pub fn full_header_as_json(&self) -> String {
        Value::Object(self.map.clone()).to_string()
    }

    /// The base64url form of this header.
    ///
    /// For a header parsed from input this is the retained original string;
    /// otherwise the map is serialized in insertion order. Callers on the
    /// producing side compute this once, at serialization time, and use the
    /// same string for both the wire form and the AAD.
    pub fn encoded_header(&self) -> Result<String, Error> {
        if let Some(encoded) = &self.encoded {
            return Ok(encoded.clone());
        }
        let json = serde_json::to_vec(&self.map)?;
        Ok(base64::encode(&json))
    }

    /// Ingest the encoded header of a parsed JOSE object, retaining the
    /// original string for use as signing input and AAD.
    pub fn set_encoded_header(&mut self, encoded: &str) -> Result<(), Error> {
        let json = base64::decode(encoded)?;
        let parsed: Value = serde_json::from_slice(&json)
            .map_err(|err| Error::MalformedEncoding(format!("header is not valid JSON: {err}")))?;
        match parsed {
            Value::Object(map) => {
                self.map = map;
                self.encoded = Some(encoded.to_owned());
                Ok(())
            }
            _ => Err(Error::MalformedEncoding(
                "header is not a JSON object".into(),
            )),
        }
    }
}

/// Enforce the `crit` header: every listed name must be one the caller has
/// declared it understands. There are no critical headers this library
/// handles on the caller's behalf.
pub(crate) fn check_critical_headers(headers: &Headers, known: &[String]) -> Result<(), Error> {
    let Some(critical) = headers.string_array_value(names::CRITICAL)? else {
        return Ok(());
    };
    for name in critical {
        if !known.iter().any(|k| *k == name) {
            return Err(Error::UnrecognizedCritical(name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn critical_headers_must_be_known() {
        let mut headers = Headers::new();
        headers.set_object_value("crit", json!(["exp"]));

        assert!(matches!(
            check_critical_headers(&headers, &[]),
            Err(Error::UnrecognizedCritical(name)) if name == "exp"
        ));
        assert!(check_critical_headers(&headers, &["exp".to_owned()]).is_ok());
        assert!(check_critical_headers(&Headers::new(), &[]).is_ok());
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut headers = Headers::new();
        headers.set_string_value(names::ALGORITHM, "HS256");
        headers.set_string_value(names::TYPE, "JWT");
        headers.set_string_value(names::KEY_ID, "a1");

        assert_eq!(
            headers.full_header_as_json(),
            r#"{"alg":"HS256","typ":"JWT","kid":"a1"}"#
        );
    }

    #[test]
    fn parsed_header_keeps_original_encoding() {
        // Header bytes with CRLF whitespace, from RFC 7515 A.1. Any
        // re-serialization would normalize the whitespace away; the retained
        // form must not.
        let encoded = "eyJ0eXAiOiJKV1QiLA0KICJhbGciOiJIUzI1NiJ9";
        let mut headers = Headers::new();
        headers.set_encoded_header(encoded).unwrap();

        assert_eq!(headers.string_value("alg"), Some("HS256"));
        assert_eq!(headers.string_value("typ"), Some("JWT"));
        assert_eq!(headers.encoded_header().unwrap(), encoded);
    }

    #[test]
    fn mutation_invalidates_retained_encoding() {
        let encoded = "eyJ0eXAiOiJKV1QiLA0KICJhbGciOiJIUzI1NiJ9";
        let mut headers = Headers::new();
        headers.set_encoded_header(encoded).unwrap();
        headers.set_string_value("kid", "new");

        assert_ne!(headers.encoded_header().unwrap(), encoded);
        assert_eq!(headers.string_value("kid"), Some("new"));
    }

    #[test]
    fn long_value_rejects_wrong_shape() {
        let mut headers = Headers::new();
        headers.set_string_value("p2c", "4096");
        assert!(headers.long_value("p2c").is_err());

        headers.set_long_value("p2c", 4096);
        assert_eq!(headers.long_value("p2c").unwrap(), Some(4096));
    }

    #[test]
    fn crit_array_accessor() {
        let mut headers = Headers::new();
        headers.set_object_value("crit", json!(["exp", "b64"]));
        assert_eq!(
            headers.string_array_value("crit").unwrap().unwrap(),
            vec!["exp".to_owned(), "b64".to_owned()]
        );

        headers.set_object_value("crit", json!("exp"));
        assert!(headers.string_array_value("crit").is_err());
    }

    #[test]
    fn non_object_header_is_rejected() {
        let encoded = crate::base64::encode(b"[1,2,3]");
        let mut headers = Headers::new();
        assert!(matches!(
            headers.set_encoded_header(&encoded),
            Err(Error::MalformedEncoding(_))
        ));
    }
}
