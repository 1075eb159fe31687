//! JSON Web Encryption ([RFC 7516][RFC7516]) in the Compact Serialization.
//!
//! Producing runs key management first, because several modes write header
//! parameters (`epk`, `p2s`/`p2c`, `iv`/`tag`); only then is the header
//! rendered, once, and those exact octets serve as both the first compact
//! segment and the AAD. Consuming reverses the flow and uses the *original*
//! encoded header octets as AAD, never a re-serialization.
//!
//! Decryption failures are uniform: a wrong tag, bad CBC padding, a garbled
//! wrapped key, all surface as [`Error::IntegrityFailure`]. Decompression,
//! when `zip` is present, happens strictly after tag verification and is
//! bounded against expansion bombs.
//!
//! The default key-management constraints block `RSA1_5` and the `PBES2-*`
//! family; both must be permitted explicitly.
//!
//! [RFC7516]: https://tools.ietf.org/html/rfc7516

use bytes::Bytes;
use rand_core::CryptoRngCore;
use zeroize::Zeroizing;

use crate::base64;
use crate::compact;
use crate::error::Error;
use crate::headers::{check_critical_headers, names, Headers};
use crate::jwa::{
    AlgorithmConstraints, CompressionAlgorithm, ContentEncryptionAlgorithm, KeyManagementAlgorithm,
};
use crate::jwk::Key;
use crate::zip;

/// A JWE in compact form, for producing or consuming.
pub struct JsonWebEncryption {
    headers: Headers,
    encrypted_key: Vec<u8>,
    iv: Vec<u8>,
    ciphertext: Bytes,
    tag: Vec<u8>,
    plaintext: Option<Zeroizing<Vec<u8>>>,
    raw_compact: Option<String>,
    alg_constraints: AlgorithmConstraints,
    enc_constraints: AlgorithmConstraints,
    known_critical_headers: Vec<String>,
    do_key_validation: bool,
    cek_override: Option<Zeroizing<Vec<u8>>>,
    iv_override: Option<Vec<u8>>,
    max_decompressed_len: usize,
}

impl Default for JsonWebEncryption {
    fn default() -> Self {
        Self {
            headers: Headers::new(),
            encrypted_key: Vec::new(),
            iv: Vec::new(),
            ciphertext: Bytes::new(),
            tag: Vec::new(),
            plaintext: None,
            raw_compact: None,
            alg_constraints: AlgorithmConstraints::default_jwe_alg(),
            enc_constraints: AlgorithmConstraints::no_constraints(),
            known_critical_headers: Vec::new(),
            do_key_validation: true,
            cek_override: None,
            iv_override: None,
            max_decompressed_len: zip::DEFAULT_MAX_DECOMPRESSED_LEN,
        }
    }
}

// Plaintext and pinned CEK stay out of the debug output.
impl std::fmt::Debug for JsonWebEncryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonWebEncryption")
            .field("headers", &self.headers)
            .field("decrypted", &self.plaintext.is_some())
            .finish()
    }
}

impl JsonWebEncryption {
    /// An empty JWE ready for headers and plaintext.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the five-part compact serialization.
    ///
    /// The encrypted-key part may be empty (`dir`, `ECDH-ES`); the
    /// ciphertext and tag parts may not.
    pub fn from_compact_serialization(compact_serialization: &str) -> Result<Self, Error> {
        let parts = compact::deserialize(compact_serialization);
        let [header, encrypted_key, iv, ciphertext, tag]: [&str; 5] =
            parts.as_slice().try_into().map_err(|_| {
                Error::MalformedEncoding(format!(
                    "a JWE compact serialization has 5 parts, got {}",
                    parts.len()
                ))
            })?;
        if header.is_empty() {
            return Err(Error::MalformedEncoding(
                "the encoded JWE header cannot be empty".into(),
            ));
        }
        if iv.is_empty() {
            return Err(Error::MalformedEncoding(
                "the encoded JWE initialization vector cannot be empty".into(),
            ));
        }
        if ciphertext.is_empty() {
            return Err(Error::MalformedEncoding(
                "the encoded JWE ciphertext cannot be empty".into(),
            ));
        }
        if tag.is_empty() {
            return Err(Error::MalformedEncoding(
                "the encoded JWE authentication tag cannot be empty".into(),
            ));
        }

        let mut jwe = Self::new();
        jwe.headers.set_encoded_header(header)?;
        jwe.encrypted_key = base64::decode(encrypted_key)?;
        jwe.iv = base64::decode(iv)?;
        jwe.ciphertext = Bytes::from(base64::decode(ciphertext)?);
        jwe.tag = base64::decode(tag)?;
        jwe.raw_compact = Some(compact_serialization.to_owned());
        Ok(jwe)
    }

    /// The header parameters.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable header access for producing.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// The compact string this JWE was parsed from, if any.
    pub fn raw_compact_serialization(&self) -> Option<&str> {
        self.raw_compact.as_deref()
    }

    /// Set the plaintext octets to encrypt.
    pub fn set_plaintext(&mut self, plaintext: &[u8]) {
        self.plaintext = Some(Zeroizing::new(plaintext.to_vec()));
    }

    /// Set the plaintext from UTF-8 text.
    pub fn set_plaintext_string(&mut self, plaintext: &str) {
        self.set_plaintext(plaintext.as_bytes());
    }

    /// The plaintext octets; available after
    /// [`decrypt`](Self::decrypt) or [`set_plaintext`](Self::set_plaintext).
    pub fn plaintext_bytes(&self) -> Result<&[u8], Error> {
        self.plaintext
            .as_deref()
            .map(Vec::as_slice)
            .ok_or_else(|| Error::Jose("the JWE has not been decrypted".into()))
    }

    /// The plaintext as UTF-8 text.
    pub fn plaintext_string(&self) -> Result<&str, Error> {
        std::str::from_utf8(self.plaintext_bytes()?)
            .map_err(|_| Error::MalformedEncoding("JWE plaintext is not UTF-8".into()))
    }

    /// Declare the key management algorithm via the `alg` header.
    pub fn set_algorithm(&mut self, algorithm: KeyManagementAlgorithm) {
        self.headers
            .set_string_value(names::ALGORITHM, algorithm.name());
    }

    /// Declare the content encryption algorithm via the `enc` header.
    pub fn set_content_encryption_algorithm(&mut self, enc: ContentEncryptionAlgorithm) {
        self.headers
            .set_string_value(names::ENCRYPTION_METHOD, enc.name());
    }

    /// Request DEFLATE compression via the `zip` header.
    pub fn enable_default_compression(&mut self) {
        self.headers
            .set_string_value(names::ZIP, CompressionAlgorithm::Deflate.name());
    }

    /// The key management algorithm declared in the header.
    pub fn algorithm(&self) -> Result<KeyManagementAlgorithm, Error> {
        let name = self
            .headers
            .string_value(names::ALGORITHM)
            .ok_or_else(|| Error::Jose("alg header not set".into()))?;
        KeyManagementAlgorithm::from_name(name)
    }

    /// The content encryption algorithm declared in the header.
    pub fn content_encryption_algorithm(&self) -> Result<ContentEncryptionAlgorithm, Error> {
        let name = self
            .headers
            .string_value(names::ENCRYPTION_METHOD)
            .ok_or_else(|| Error::Jose("enc header not set".into()))?;
        ContentEncryptionAlgorithm::from_name(name)
    }

    /// Set the `kid` header.
    pub fn set_key_id(&mut self, kid: &str) {
        self.headers.set_string_value(names::KEY_ID, kid);
    }

    /// Replace the key management algorithm constraints.
    pub fn set_algorithm_constraints(&mut self, constraints: AlgorithmConstraints) {
        self.alg_constraints = constraints;
    }

    /// Replace the content encryption algorithm constraints.
    pub fn set_content_encryption_algorithm_constraints(
        &mut self,
        constraints: AlgorithmConstraints,
    ) {
        self.enc_constraints = constraints;
    }

    /// Declare `crit` header names this caller understands.
    pub fn set_known_critical_headers<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_critical_headers = names.into_iter().map(Into::into).collect();
    }

    /// Relax key validation; intended for interop with peers that bend the rules.
    pub fn set_do_key_validation(&mut self, do_key_validation: bool) {
        self.do_key_validation = do_key_validation;
    }

    /// Pin the content encryption key, for reproducing test vectors. Only
    /// meaningful for the wrapping and RSA modes.
    pub fn set_content_encryption_key(&mut self, cek: &[u8]) {
        self.cek_override = Some(Zeroizing::new(cek.to_vec()));
    }

    /// Pin the content encryption IV, for reproducing test vectors.
    pub fn set_iv(&mut self, iv: &[u8]) {
        self.iv_override = Some(iv.to_vec());
    }

    /// Adjust the ceiling applied when inflating `zip: DEF` content.
    pub fn set_max_decompressed_len(&mut self, max_len: usize) {
        self.max_decompressed_len = max_len;
    }

    /// Encrypt and return the compact serialization.
    pub fn encrypt(&mut self, key: &Key, rng: &mut dyn CryptoRngCore) -> Result<String, Error> {
        let algorithm = self.algorithm()?;
        let enc = self.content_encryption_algorithm()?;
        self.alg_constraints.check(algorithm.name())?;
        self.enc_constraints.check(enc.name())?;

        if self.do_key_validation {
            algorithm.validate_encryption_key(key, enc)?;
        }

        let keys = algorithm.manage_for_encrypt(
            key,
            enc.cek_len(),
            &mut self.headers,
            self.cek_override.as_deref().map(Vec::as_slice),
            rng,
        )?;

        let plaintext = self
            .plaintext
            .as_deref()
            .ok_or_else(|| Error::Jose("no plaintext to encrypt".into()))?;
        let content = match self.compression()? {
            Some(CompressionAlgorithm::Deflate) => zip::compress(plaintext)?,
            None => plaintext.to_vec(),
        };

        // Header mutations are done; render once and authenticate exactly
        // these octets.
        let encoded_header = self.headers.encoded_header()?;
        let aad = encoded_header.as_bytes();

        let encrypted = enc.encrypt(
            &content,
            aad,
            &keys.cek,
            self.iv_override.as_deref(),
            rng,
        )?;

        self.encrypted_key = keys.encrypted_key;
        self.iv = encrypted.iv;
        self.ciphertext = Bytes::from(encrypted.ciphertext);
        self.tag = encrypted.tag;

        let compact = compact::serialize(&[
            &encoded_header,
            &base64::encode(&self.encrypted_key),
            &base64::encode(&self.iv),
            &base64::encode(&self.ciphertext),
            &base64::encode(&self.tag),
        ]);
        self.raw_compact = Some(compact.clone());
        Ok(compact)
    }

    /// Decrypt in place and return the plaintext.
    ///
    /// `rng` feeds the RSA1_5 countermeasure; every other mode ignores it.
    pub fn decrypt(&mut self, key: &Key, rng: &mut dyn CryptoRngCore) -> Result<&[u8], Error> {
        let algorithm = self.algorithm()?;
        let enc = self.content_encryption_algorithm()?;
        self.alg_constraints.check(algorithm.name())?;
        self.enc_constraints.check(enc.name())?;
        check_critical_headers(&self.headers, &self.known_critical_headers)?;

        if self.do_key_validation {
            algorithm.validate_decryption_key(key, enc)?;
        }

        let primitive = algorithm.prepare_for_decrypt(key, &self.headers)?;
        let cek = algorithm.manage_for_decrypt(
            primitive,
            &self.encrypted_key,
            enc.cek_len(),
            &self.headers,
            rng,
        )?;

        let aad_header = self.headers.encoded_header()?;
        let decrypted = enc.decrypt(
            &self.iv,
            &self.ciphertext,
            &self.tag,
            aad_header.as_bytes(),
            &cek,
        )?;

        // Only authenticated content reaches the inflater.
        let plaintext = match self.compression()? {
            Some(CompressionAlgorithm::Deflate) => {
                zip::decompress(&decrypted, self.max_decompressed_len)?
            }
            None => decrypted,
        };

        self.plaintext = Some(Zeroizing::new(plaintext));
        Ok(self.plaintext.as_deref().map(Vec::as_slice).unwrap_or(&[]))
    }

    fn compression(&self) -> Result<Option<CompressionAlgorithm>, Error> {
        self.headers
            .string_value(names::ZIP)
            .map(CompressionAlgorithm::from_name)
            .transpose()
    }
}
