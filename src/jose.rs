//! Classification of compact-form JOSE objects.
//!
//! The segment count tells JWS (3) and JWE (5) apart; nothing else in the
//! compact form does. [`JoseObject`] is the common handle the JWT consumer
//! works with while unwrapping possibly-nested tokens.

use url::Url;

use crate::compact;
use crate::error::Error;
use crate::headers::{names, Headers};
use crate::jwe::JsonWebEncryption;
use crate::jws::JsonWebSignature;

/// A parsed compact-form JOSE object: signed or encrypted.
#[derive(Debug)]
pub enum JoseObject {
    /// A three-part JWS.
    Signature(JsonWebSignature),
    /// A five-part JWE.
    Encryption(JsonWebEncryption),
}

impl JoseObject {
    /// Parse a compact serialization, classifying by segment count.
    pub fn from_compact_serialization(compact_serialization: &str) -> Result<Self, Error> {
        if compact_serialization.starts_with('{') {
            return Err(Error::MalformedEncoding(
                "the JOSE compact serialization is a period-delimited series of base64url \
                 values, which cannot start with \"{\""
                    .into(),
            ));
        }
        match compact::deserialize(compact_serialization).len() {
            3 => Ok(JoseObject::Signature(
                JsonWebSignature::from_compact_serialization(compact_serialization)?,
            )),
            5 => Ok(JoseObject::Encryption(
                JsonWebEncryption::from_compact_serialization(compact_serialization)?,
            )),
            n => Err(Error::MalformedEncoding(format!(
                "expected 3 (JWS) or 5 (JWE) compact parts, got {n}"
            ))),
        }
    }

    /// The header parameters of this layer.
    pub fn headers(&self) -> &Headers {
        match self {
            JoseObject::Signature(jws) => jws.headers(),
            JoseObject::Encryption(jwe) => jwe.headers(),
        }
    }

    /// The raw `alg` header value.
    pub fn algorithm_header(&self) -> Option<&str> {
        self.headers().string_value(names::ALGORITHM)
    }

    /// The `kid` header value.
    pub fn key_id(&self) -> Option<&str> {
        self.headers().string_value(names::KEY_ID)
    }

    /// The `cty` header value.
    pub fn content_type(&self) -> Option<&str> {
        self.headers().string_value(names::CONTENT_TYPE)
    }

    /// The `jku` header as a parsed URL, the input to JWK-set key
    /// resolution.
    pub fn jwk_set_url(&self) -> Result<Option<Url>, Error> {
        self.headers().url_value(names::JWK_SET_URL)
    }

    /// The `x5u` header as a parsed URL.
    pub fn x509_url(&self) -> Result<Option<Url>, Error> {
        self.headers().url_value(names::X509_URL)
    }

    /// The compact string this layer was parsed from, if any.
    pub fn raw_compact_serialization(&self) -> Option<&str> {
        match self {
            JoseObject::Signature(jws) => jws.raw_compact_serialization(),
            JoseObject::Encryption(jwe) => jwe.raw_compact_serialization(),
        }
    }

    /// The recovered inner content: the payload of a verified JWS or the
    /// plaintext of a decrypted JWE.
    pub fn inner_content(&self) -> Result<&[u8], Error> {
        match self {
            JoseObject::Signature(jws) => Ok(jws.payload_bytes()),
            JoseObject::Encryption(jwe) => jwe.plaintext_bytes(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classification_by_part_count() {
        let jws = "eyJhbGciOiJub25lIn0.eyJpc3MiOiJqb2UifQ.";
        assert!(matches!(
            JoseObject::from_compact_serialization(jws),
            Ok(JoseObject::Signature(_))
        ));

        let header = crate::base64::encode(br#"{"alg":"dir","enc":"A128GCM"}"#);
        let jwe = format!("{header}..AQAB.AQAB.AQAB");
        assert!(matches!(
            JoseObject::from_compact_serialization(&jwe),
            Ok(JoseObject::Encryption(_))
        ));
    }

    #[test]
    fn url_headers_are_parsed_and_checked() {
        let header = crate::base64::encode(
            br#"{"alg":"none","jku":"https://example.com/keys.jwks","x5u":"not a url"}"#,
        );
        let jose = JoseObject::from_compact_serialization(&format!("{header}..")).unwrap();

        let jku = jose.jwk_set_url().unwrap().unwrap();
        assert_eq!(jku.host_str(), Some("example.com"));
        assert_eq!(jku.path(), "/keys.jwks");
        assert!(jose.x509_url().is_err());
    }

    #[test]
    fn json_serialization_is_pointed_out() {
        let err = JoseObject::from_compact_serialization(r#"{"payload":"...","signature":"..."}"#)
            .unwrap_err();
        assert!(err.to_string().contains("cannot start with"));
    }

    #[test]
    fn wrong_part_counts_are_malformed() {
        for bad in ["", "a.b", "a.b.c.d", "a.b.c.d.e.f"] {
            assert!(matches!(
                JoseObject::from_compact_serialization(bad),
                Err(Error::MalformedEncoding(_))
            ));
        }
    }
}
