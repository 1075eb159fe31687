//! Base64url without padding, the encoding used throughout JOSE.
//!
//! Encoding always produces the unpadded URL-safe form. Decoding is lenient
//! about trailing `=` padding, since tokens in the wild carry both forms, but
//! rejects any character outside the URL-safe alphabet.

use base64ct::{Base64UrlUnpadded, Encoding};

use crate::error::Error;

/// Encode bytes as unpadded base64url.
pub fn encode(data: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(data)
}

/// Decode base64url input, with or without trailing padding.
pub fn decode(input: &str) -> Result<Vec<u8>, Error> {
    let unpadded = input.trim_end_matches('=');
    Base64UrlUnpadded::decode_vec(unpadded)
        .map_err(|_| Error::MalformedEncoding(format!("invalid base64url: {input:?}")))
}

/// Decode base64url input that must be valid UTF-8, e.g. an encoded header.
pub fn decode_string(input: &str) -> Result<String, Error> {
    let bytes = decode(input)?;
    String::from_utf8(bytes)
        .map_err(|_| Error::MalformedEncoding("base64url content is not UTF-8".into()))
}
