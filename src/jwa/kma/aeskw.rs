//! AES key wrapping: RFC 3394 AES-KW and the AES-GCM-KW variant that
//! carries its IV and tag in the `iv` and `tag` header parameters.

use aes_kw::Kek;
use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use crate::base64;
use crate::error::Error;
use crate::headers::{names, Headers};
use crate::jwa::enc::{gcm_decrypt_raw, gcm_encrypt_raw};

pub(super) fn check_kek_len(kek: &[u8], expected: usize, alg: &str) -> Result<(), Error> {
    if kek.len() != expected {
        return Err(Error::InvalidKey(format!(
            "{alg} requires a {expected} octet key, got {}",
            kek.len()
        )));
    }
    Ok(())
}

/// RFC 3394 wrap. The KEK length selects the AES variant.
pub(super) fn wrap(kek: &[u8], cek: &[u8]) -> Result<Vec<u8>, Error> {
    let wrapped = match kek.len() {
        16 => Kek::<aes::Aes128>::try_from(kek).and_then(|kek| kek.wrap_vec(cek)),
        24 => Kek::<aes::Aes192>::try_from(kek).and_then(|kek| kek.wrap_vec(cek)),
        32 => Kek::<aes::Aes256>::try_from(kek).and_then(|kek| kek.wrap_vec(cek)),
        other => {
            return Err(Error::InvalidKey(format!(
                "{other} octets is not an AES key wrap key size"
            )))
        }
    };
    wrapped.map_err(|_| Error::Jose("AES key wrap failed".into()))
}

/// RFC 3394 unwrap. Integrity-check failure inside the unwrap is reported
/// the same way as any other decryption failure.
pub(super) fn unwrap(kek: &[u8], wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
    let cek = match kek.len() {
        16 => Kek::<aes::Aes128>::try_from(kek).and_then(|kek| kek.unwrap_vec(wrapped)),
        24 => Kek::<aes::Aes192>::try_from(kek).and_then(|kek| kek.unwrap_vec(wrapped)),
        32 => Kek::<aes::Aes256>::try_from(kek).and_then(|kek| kek.unwrap_vec(wrapped)),
        other => {
            return Err(Error::InvalidKey(format!(
                "{other} octets is not an AES key wrap key size"
            )))
        }
    };
    cek.map(Zeroizing::new).map_err(|_| Error::IntegrityFailure)
}

const GCM_KW_IV_LEN: usize = 12;
const GCM_KW_TAG_LEN: usize = 16;

/// Encrypt the CEK under AES-GCM with a fresh 96-bit IV, publishing the IV
/// and tag as header parameters.
pub(super) fn gcm_wrap(
    kek: &[u8],
    cek: &[u8],
    headers: &mut Headers,
    rng: &mut dyn CryptoRngCore,
) -> Result<Vec<u8>, Error> {
    let mut iv = [0u8; GCM_KW_IV_LEN];
    rng.fill_bytes(&mut iv);

    let (ciphertext, tag) = gcm_encrypt_raw(kek, &iv, b"", cek)?;

    headers.set_string_value(names::INITIALIZATION_VECTOR, &base64::encode(&iv));
    headers.set_string_value(names::AUTHENTICATION_TAG, &base64::encode(&tag));
    Ok(ciphertext)
}

/// Decrypt the CEK using the IV and tag read back from the headers.
pub(super) fn gcm_unwrap(
    kek: &[u8],
    wrapped: &[u8],
    headers: &Headers,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let iv = required_b64_header(headers, names::INITIALIZATION_VECTOR)?;
    let tag = required_b64_header(headers, names::AUTHENTICATION_TAG)?;
    if iv.len() != GCM_KW_IV_LEN || tag.len() != GCM_KW_TAG_LEN {
        return Err(Error::IntegrityFailure);
    }
    gcm_decrypt_raw(kek, &iv, b"", wrapped, &tag).map(Zeroizing::new)
}

fn required_b64_header(headers: &Headers, name: &str) -> Result<Vec<u8>, Error> {
    let value = headers
        .string_value(name)
        .ok_or_else(|| Error::Jose(format!("{name} header is required here")))?;
    base64::decode(value)
}
