//! JWE key management: establishing the content encryption key.
//!
//! Every mode reduces to the same two-sided contract. On the producing side
//! [`KeyManagementAlgorithm::manage_for_encrypt`] yields the CEK that will
//! feed the content encryption step together with the encrypted-key octets
//! for the second compact segment (empty for the direct modes). On the
//! consuming side the work is split in two: `prepare_for_decrypt` does the
//! key-side validation and derivation that depends only on the management
//! key and headers (curve checks, PBKDF2, ECDH agreement), returning a
//! [`KeyUnwrapPrimitive`]; `manage_for_decrypt` then consumes the encrypted
//! key. The split keeps expensive or externally-bound primitives reusable
//! and mirrors how HSM-backed callers bind key handles.
//!
//! Failure discipline: anything the sender could have influenced (wrapped
//! key, headers) fails as [`Error::IntegrityFailure`]; RSA1_5 never fails at
//! all, substituting a random CEK so that the only observable outcome is a
//! downstream tag mismatch.

use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use super::{ContentEncryptionAlgorithm, KeyManagementAlgorithm};
use crate::error::Error;
use crate::headers::Headers;
use crate::jwk::Key;

mod aeskw;
mod ecdh;
mod pbes2;
mod rsa;

pub use self::pbes2::{
    DEFAULT_PBES2_ITERATION_COUNT, DEFAULT_PBES2_SALT_LEN, MAX_PBES2_ITERATION_COUNT,
};

/// The outcome of key management on the producing side.
#[derive(Debug)]
pub struct ContentEncryptionKeys {
    /// The content encryption key to feed the AEAD step.
    pub cek: Zeroizing<Vec<u8>>,
    /// The encrypted-key octets for the compact form; empty for direct
    /// modes.
    pub encrypted_key: Vec<u8>,
}

/// Key-side state prepared for decryption, before the encrypted key is
/// consumed.
pub enum KeyUnwrapPrimitive {
    /// `dir`: the management key *is* the CEK.
    Direct(Zeroizing<Vec<u8>>),
    /// AES-KW with this key-encryption key.
    AesKw(Zeroizing<Vec<u8>>),
    /// AES-GCM-KW with this key-encryption key.
    AesGcmKw(Zeroizing<Vec<u8>>),
    /// PBES2: the PBKDF2-derived key-encryption key.
    Pbes2(Zeroizing<Vec<u8>>),
    /// RSA key encryption with this private key.
    Rsa(Box<::rsa::RsaPrivateKey>),
    /// ECDH-ES: the agreed shared secret `Z`, not yet run through the KDF.
    Ecdh(Zeroizing<Vec<u8>>),
}

impl std::fmt::Debug for KeyUnwrapPrimitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            KeyUnwrapPrimitive::Direct(_) => "Direct",
            KeyUnwrapPrimitive::AesKw(_) => "AesKw",
            KeyUnwrapPrimitive::AesGcmKw(_) => "AesGcmKw",
            KeyUnwrapPrimitive::Pbes2(_) => "Pbes2",
            KeyUnwrapPrimitive::Rsa(_) => "Rsa",
            KeyUnwrapPrimitive::Ecdh(_) => "Ecdh",
        };
        write!(f, "KeyUnwrapPrimitive::{label}")
    }
}

impl KeyManagementAlgorithm {
    /// Produce the CEK and encrypted-key octets for an encryption
    /// operation.
    ///
    /// `cek_override` pins the CEK for test vectors; it is only meaningful
    /// for the wrapping and RSA modes and is refused for `dir` and plain
    /// `ECDH-ES`, where the CEK is fully determined by the key agreement.
    /// May set headers (`epk`, `iv`/`tag`, `p2s`/`p2c`), so it must run
    /// before the header is rendered for AAD.
    pub fn manage_for_encrypt(
        &self,
        key: &Key,
        cek_len: usize,
        headers: &mut Headers,
        cek_override: Option<&[u8]>,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<ContentEncryptionKeys, Error> {
        match self {
            KeyManagementAlgorithm::Direct => {
                cek_not_allowed(cek_override, self.name())?;
                Ok(ContentEncryptionKeys {
                    cek: Zeroizing::new(key.oct()?.value().to_vec()),
                    encrypted_key: Vec::new(),
                })
            }
            KeyManagementAlgorithm::A128Kw
            | KeyManagementAlgorithm::A192Kw
            | KeyManagementAlgorithm::A256Kw => {
                let kek = key.oct()?.value();
                aeskw::check_kek_len(kek, self.kek_len(), self.name())?;
                let cek = cek_or_random(cek_override, cek_len, rng);
                let encrypted_key = aeskw::wrap(kek, &cek)?;
                Ok(ContentEncryptionKeys { cek, encrypted_key })
            }
            KeyManagementAlgorithm::A128GcmKw
            | KeyManagementAlgorithm::A192GcmKw
            | KeyManagementAlgorithm::A256GcmKw => {
                let kek = key.oct()?.value();
                aeskw::check_kek_len(kek, self.kek_len(), self.name())?;
                let cek = cek_or_random(cek_override, cek_len, rng);
                let encrypted_key = aeskw::gcm_wrap(kek, &cek, headers, rng)?;
                Ok(ContentEncryptionKeys { cek, encrypted_key })
            }
            KeyManagementAlgorithm::Pbes2Hs256A128Kw
            | KeyManagementAlgorithm::Pbes2Hs384A192Kw
            | KeyManagementAlgorithm::Pbes2Hs512A256Kw => {
                let kek = pbes2::derive_for_encrypt(self, key.password()?, headers, rng)?;
                let cek = cek_or_random(cek_override, cek_len, rng);
                let encrypted_key = aeskw::wrap(&kek, &cek)?;
                Ok(ContentEncryptionKeys { cek, encrypted_key })
            }
            KeyManagementAlgorithm::Rsa1_5
            | KeyManagementAlgorithm::RsaOaep
            | KeyManagementAlgorithm::RsaOaep256 => {
                let cek = cek_or_random(cek_override, cek_len, rng);
                let encrypted_key = rsa::encrypt_cek(self, key, &cek, rng)?;
                Ok(ContentEncryptionKeys { cek, encrypted_key })
            }
            KeyManagementAlgorithm::EcdhEs => {
                cek_not_allowed(cek_override, self.name())?;
                let derived = ecdh::derive_for_encrypt(self, key, cek_len, headers, rng)?;
                Ok(ContentEncryptionKeys {
                    cek: derived,
                    encrypted_key: Vec::new(),
                })
            }
            KeyManagementAlgorithm::EcdhEsA128Kw
            | KeyManagementAlgorithm::EcdhEsA192Kw
            | KeyManagementAlgorithm::EcdhEsA256Kw => {
                let kek = ecdh::derive_for_encrypt(self, key, self.kek_len(), headers, rng)?;
                let cek = cek_or_random(cek_override, cek_len, rng);
                let encrypted_key = aeskw::wrap(&kek, &cek)?;
                Ok(ContentEncryptionKeys { cek, encrypted_key })
            }
        }
    }

    /// Validate the management key and derive the key-side primitive for
    /// decryption. Reads headers (`epk`, `p2s`/`p2c`) but not the encrypted
    /// key.
    pub fn prepare_for_decrypt(
        &self,
        key: &Key,
        headers: &Headers,
    ) -> Result<KeyUnwrapPrimitive, Error> {
        match self {
            KeyManagementAlgorithm::Direct => Ok(KeyUnwrapPrimitive::Direct(Zeroizing::new(
                key.oct()?.value().to_vec(),
            ))),
            KeyManagementAlgorithm::A128Kw
            | KeyManagementAlgorithm::A192Kw
            | KeyManagementAlgorithm::A256Kw => {
                let kek = key.oct()?.value();
                aeskw::check_kek_len(kek, self.kek_len(), self.name())?;
                Ok(KeyUnwrapPrimitive::AesKw(Zeroizing::new(kek.to_vec())))
            }
            KeyManagementAlgorithm::A128GcmKw
            | KeyManagementAlgorithm::A192GcmKw
            | KeyManagementAlgorithm::A256GcmKw => {
                let kek = key.oct()?.value();
                aeskw::check_kek_len(kek, self.kek_len(), self.name())?;
                Ok(KeyUnwrapPrimitive::AesGcmKw(Zeroizing::new(kek.to_vec())))
            }
            KeyManagementAlgorithm::Pbes2Hs256A128Kw
            | KeyManagementAlgorithm::Pbes2Hs384A192Kw
            | KeyManagementAlgorithm::Pbes2Hs512A256Kw => {
                let kek = pbes2::derive_for_decrypt(self, key.password()?, headers)?;
                Ok(KeyUnwrapPrimitive::Pbes2(kek))
            }
            KeyManagementAlgorithm::Rsa1_5
            | KeyManagementAlgorithm::RsaOaep
            | KeyManagementAlgorithm::RsaOaep256 => {
                let private = key.rsa()?.private_key().cloned().ok_or_else(|| {
                    Error::InvalidKey("decryption requires the RSA private key".into())
                })?;
                Ok(KeyUnwrapPrimitive::Rsa(Box::new(private)))
            }
            KeyManagementAlgorithm::EcdhEs
            | KeyManagementAlgorithm::EcdhEsA128Kw
            | KeyManagementAlgorithm::EcdhEsA192Kw
            | KeyManagementAlgorithm::EcdhEsA256Kw => {
                let z = ecdh::agree_for_decrypt(key, headers)?;
                Ok(KeyUnwrapPrimitive::Ecdh(z))
            }
        }
    }

    /// Consume the encrypted key and return the CEK.
    ///
    /// `rng` feeds the RSA1_5 random-CEK substitution; every other mode
    /// ignores it.
    pub fn manage_for_decrypt(
        &self,
        primitive: KeyUnwrapPrimitive,
        encrypted_key: &[u8],
        cek_len: usize,
        headers: &Headers,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<Zeroizing<Vec<u8>>, Error> {
        match (self, primitive) {
            (KeyManagementAlgorithm::Direct, KeyUnwrapPrimitive::Direct(cek)) => {
                if !encrypted_key.is_empty() {
                    return Err(Error::Jose(
                        "dir key management must have an empty encrypted key".into(),
                    ));
                }
                Ok(cek)
            }
            (_, KeyUnwrapPrimitive::AesKw(kek)) | (_, KeyUnwrapPrimitive::Pbes2(kek)) => {
                aeskw::unwrap(&kek, encrypted_key)
            }
            (_, KeyUnwrapPrimitive::AesGcmKw(kek)) => {
                aeskw::gcm_unwrap(&kek, encrypted_key, headers)
            }
            (alg, KeyUnwrapPrimitive::Rsa(private)) => {
                rsa::decrypt_cek(alg, &private, encrypted_key, cek_len, rng)
            }
            (alg, KeyUnwrapPrimitive::Ecdh(z)) => {
                let keydatalen = if *alg == KeyManagementAlgorithm::EcdhEs {
                    cek_len
                } else {
                    alg.kek_len()
                };
                let derived = ecdh::kdf(alg, &z, keydatalen, headers)?;
                if *alg == KeyManagementAlgorithm::EcdhEs {
                    if !encrypted_key.is_empty() {
                        return Err(Error::Jose(
                            "ECDH-ES direct agreement must have an empty encrypted key".into(),
                        ));
                    }
                    Ok(derived)
                } else {
                    aeskw::unwrap(&derived, encrypted_key)
                }
            }
            (alg, primitive) => Err(Error::Jose(format!(
                "{primitive:?} cannot be used with {}",
                alg.name()
            ))),
        }
    }

    /// Check the management key fits this algorithm and the chosen content
    /// encryption algorithm, before any cryptography runs.
    pub fn validate_encryption_key(
        &self,
        key: &Key,
        enc: ContentEncryptionAlgorithm,
    ) -> Result<(), Error> {
        self.validate_key(key, enc, false)
    }

    /// The decryption-side twin of
    /// [`validate_encryption_key`](Self::validate_encryption_key).
    pub fn validate_decryption_key(
        &self,
        key: &Key,
        enc: ContentEncryptionAlgorithm,
    ) -> Result<(), Error> {
        self.validate_key(key, enc, true)
    }

    fn validate_key(
        &self,
        key: &Key,
        enc: ContentEncryptionAlgorithm,
        decrypting: bool,
    ) -> Result<(), Error> {
        match self {
            KeyManagementAlgorithm::Direct => {
                let oct = key.oct()?;
                if oct.len() != enc.cek_len() {
                    return Err(Error::InvalidKey(format!(
                        "dir with {} requires a {} octet key, got {}",
                        enc.name(),
                        enc.cek_len(),
                        oct.len()
                    )));
                }
                Ok(())
            }
            KeyManagementAlgorithm::A128Kw
            | KeyManagementAlgorithm::A192Kw
            | KeyManagementAlgorithm::A256Kw
            | KeyManagementAlgorithm::A128GcmKw
            | KeyManagementAlgorithm::A192GcmKw
            | KeyManagementAlgorithm::A256GcmKw => {
                aeskw::check_kek_len(key.oct()?.value(), self.kek_len(), self.name())
            }
            KeyManagementAlgorithm::Pbes2Hs256A128Kw
            | KeyManagementAlgorithm::Pbes2Hs384A192Kw
            | KeyManagementAlgorithm::Pbes2Hs512A256Kw => key.password().map(drop),
            KeyManagementAlgorithm::Rsa1_5
            | KeyManagementAlgorithm::RsaOaep
            | KeyManagementAlgorithm::RsaOaep256 => {
                let rsa = key.rsa()?;
                if rsa.modulus_bits() < super::sig::MIN_RSA_KEY_BITS {
                    return Err(Error::InvalidKey(format!(
                        "{}-bit RSA key is below the {}-bit minimum",
                        rsa.modulus_bits(),
                        super::sig::MIN_RSA_KEY_BITS
                    )));
                }
                if decrypting && rsa.private_key().is_none() {
                    return Err(Error::InvalidKey(
                        "decryption requires the RSA private key".into(),
                    ));
                }
                Ok(())
            }
            KeyManagementAlgorithm::EcdhEs
            | KeyManagementAlgorithm::EcdhEsA128Kw
            | KeyManagementAlgorithm::EcdhEsA192Kw
            | KeyManagementAlgorithm::EcdhEsA256Kw => ecdh::validate_key(key, decrypting),
        }
    }

    /// Length of the AES key-encryption key this algorithm uses, where
    /// applicable.
    pub(crate) fn kek_len(&self) -> usize {
        match self {
            KeyManagementAlgorithm::A128Kw
            | KeyManagementAlgorithm::A128GcmKw
            | KeyManagementAlgorithm::Pbes2Hs256A128Kw
            | KeyManagementAlgorithm::EcdhEsA128Kw => 16,
            KeyManagementAlgorithm::A192Kw
            | KeyManagementAlgorithm::A192GcmKw
            | KeyManagementAlgorithm::Pbes2Hs384A192Kw
            | KeyManagementAlgorithm::EcdhEsA192Kw => 24,
            KeyManagementAlgorithm::A256Kw
            | KeyManagementAlgorithm::A256GcmKw
            | KeyManagementAlgorithm::Pbes2Hs512A256Kw
            | KeyManagementAlgorithm::EcdhEsA256Kw => 32,
            _ => 0,
        }
    }
}

fn cek_not_allowed(cek_override: Option<&[u8]>, alg: &str) -> Result<(), Error> {
    if cek_override.is_some() {
        return Err(Error::Jose(format!(
            "an explicit content encryption key cannot be used with {alg}"
        )));
    }
    Ok(())
}

fn cek_or_random(
    cek_override: Option<&[u8]>,
    cek_len: usize,
    rng: &mut dyn CryptoRngCore,
) -> Zeroizing<Vec<u8>> {
    match cek_override {
        Some(cek) => Zeroizing::new(cek.to_vec()),
        None => {
            let mut cek = Zeroizing::new(vec![0u8; cek_len]);
            rng.fill_bytes(&mut cek);
            cek
        }
    }
}
