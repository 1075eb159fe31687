//! JSON Web Algorithms ([RFC 7518][RFC7518])
//!
//! Four independent registries map header-declared identifiers onto
//! primitives:
//!
//! - [`SignatureAlgorithm`] — the JWS `alg` values,
//! - [`KeyManagementAlgorithm`] — the JWE `alg` values,
//! - [`ContentEncryptionAlgorithm`] — the JWE `enc` values,
//! - [`CompressionAlgorithm`] — the JWE `zip` values.
//!
//! Each registry is a closed enum: lookup happens once per operation through
//! `from_name` and fails with [`Error::UnsupportedAlgorithm`] for anything
//! unknown. The enums carry no state, so the registries are trivially safe
//! to consult from any thread.
//!
//! [RFC7518]: https://tools.ietf.org/html/rfc7518

use crate::error::Error;

pub mod constraints;
pub mod enc;
pub mod kma;
pub mod sig;

pub use self::constraints::AlgorithmConstraints;
pub use self::enc::EncryptedContent;
pub use self::kma::{ContentEncryptionKeys, KeyUnwrapPrimitive};

/// Whether key management rests on symmetric or asymmetric cryptography.
///
/// The JWT consumer uses this to decide whether an encrypted token carries
/// integrity on its own: symmetric key management does, asymmetric does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPersuasion {
    /// Key management based on a shared symmetric key or password.
    Symmetric,
    /// Key management based on a public/private key pair.
    Asymmetric,
}

/// JWS signature and MAC algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum SignatureAlgorithm {
    Hs256,
    Hs384,
    Hs512,
    Rs256,
    Rs384,
    Rs512,
    Ps256,
    Ps384,
    Ps512,
    Es256,
    Es384,
    Es512,
    Es256k,
    EdDsa,
    /// The `none` algorithm: no signature at all. Refused unless the active
    /// constraints permit it explicitly.
    None,
}

impl SignatureAlgorithm {
    /// All registered identifiers.
    pub const ALL: &'static [SignatureAlgorithm] = &[
        SignatureAlgorithm::Hs256,
        SignatureAlgorithm::Hs384,
        SignatureAlgorithm::Hs512,
        SignatureAlgorithm::Rs256,
        SignatureAlgorithm::Rs384,
        SignatureAlgorithm::Rs512,
        SignatureAlgorithm::Ps256,
        SignatureAlgorithm::Ps384,
        SignatureAlgorithm::Ps512,
        SignatureAlgorithm::Es256,
        SignatureAlgorithm::Es384,
        SignatureAlgorithm::Es512,
        SignatureAlgorithm::Es256k,
        SignatureAlgorithm::EdDsa,
        SignatureAlgorithm::None,
    ];

    /// The `alg` header value.
    pub fn name(&self) -> &'static str {
        match self {
            SignatureAlgorithm::Hs256 => "HS256",
            SignatureAlgorithm::Hs384 => "HS384",
            SignatureAlgorithm::Hs512 => "HS512",
            SignatureAlgorithm::Rs256 => "RS256",
            SignatureAlgorithm::Rs384 => "RS384",
            SignatureAlgorithm::Rs512 => "RS512",
            SignatureAlgorithm::Ps256 => "PS256",
            SignatureAlgorithm::Ps384 => "PS384",
            SignatureAlgorithm::Ps512 => "PS512",
            SignatureAlgorithm::Es256 => "ES256",
            SignatureAlgorithm::Es384 => "ES384",
            SignatureAlgorithm::Es512 => "ES512",
            SignatureAlgorithm::Es256k => "ES256K",
            SignatureAlgorithm::EdDsa => "EdDSA",
            SignatureAlgorithm::None => "none",
        }
    }

    /// Registry lookup by `alg` header value. An identifier that is
    /// registered but not backed by an available implementation is just as
    /// unusable as an unknown one.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        let algorithm = Self::ALL
            .iter()
            .copied()
            .find(|alg| alg.name() == name)
            .ok_or_else(|| Error::UnsupportedAlgorithm(name.to_owned()))?;
        if !algorithm.is_available() {
            return Err(Error::UnsupportedAlgorithm(format!(
                "{name} is not backed by an available implementation"
            )));
        }
        Ok(algorithm)
    }

    /// Whether the algorithm provides integrity protection. Everything here
    /// does except `none`.
    pub fn provides_integrity(&self) -> bool {
        !matches!(self, SignatureAlgorithm::None)
    }

    /// Whether an implementation backs this algorithm.
    pub fn is_available(&self) -> bool {
        match self {
            // Every registered signature algorithm is backed by a linked
            // crate. EdDSA availability narrows per curve at key-validation
            // time: Ed25519 is backed, Ed448 is not.
            SignatureAlgorithm::Hs256
            | SignatureAlgorithm::Hs384
            | SignatureAlgorithm::Hs512
            | SignatureAlgorithm::Rs256
            | SignatureAlgorithm::Rs384
            | SignatureAlgorithm::Rs512
            | SignatureAlgorithm::Ps256
            | SignatureAlgorithm::Ps384
            | SignatureAlgorithm::Ps512
            | SignatureAlgorithm::Es256
            | SignatureAlgorithm::Es384
            | SignatureAlgorithm::Es512
            | SignatureAlgorithm::Es256k
            | SignatureAlgorithm::EdDsa
            | SignatureAlgorithm::None => true,
        }
    }
}

/// JWE key management algorithms: how the content encryption key is
/// established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum KeyManagementAlgorithm {
    Direct,
    A128Kw,
    A192Kw,
    A256Kw,
    A128GcmKw,
    A192GcmKw,
    A256GcmKw,
    Pbes2Hs256A128Kw,
    Pbes2Hs384A192Kw,
    Pbes2Hs512A256Kw,
    Rsa1_5,
    RsaOaep,
    RsaOaep256,
    EcdhEs,
    EcdhEsA128Kw,
    EcdhEsA192Kw,
    EcdhEsA256Kw,
}

impl KeyManagementAlgorithm {
    /// All registered identifiers.
    pub const ALL: &'static [KeyManagementAlgorithm] = &[
        KeyManagementAlgorithm::Direct,
        KeyManagementAlgorithm::A128Kw,
        KeyManagementAlgorithm::A192Kw,
        KeyManagementAlgorithm::A256Kw,
        KeyManagementAlgorithm::A128GcmKw,
        KeyManagementAlgorithm::A192GcmKw,
        KeyManagementAlgorithm::A256GcmKw,
        KeyManagementAlgorithm::Pbes2Hs256A128Kw,
        KeyManagementAlgorithm::Pbes2Hs384A192Kw,
        KeyManagementAlgorithm::Pbes2Hs512A256Kw,
        KeyManagementAlgorithm::Rsa1_5,
        KeyManagementAlgorithm::RsaOaep,
        KeyManagementAlgorithm::RsaOaep256,
        KeyManagementAlgorithm::EcdhEs,
        KeyManagementAlgorithm::EcdhEsA128Kw,
        KeyManagementAlgorithm::EcdhEsA192Kw,
        KeyManagementAlgorithm::EcdhEsA256Kw,
    ];

    /// The `alg` header value.
    pub fn name(&self) -> &'static str {
        match self {
            KeyManagementAlgorithm::Direct => "dir",
            KeyManagementAlgorithm::A128Kw => "A128KW",
            KeyManagementAlgorithm::A192Kw => "A192KW",
            KeyManagementAlgorithm::A256Kw => "A256KW",
            KeyManagementAlgorithm::A128GcmKw => "A128GCMKW",
            KeyManagementAlgorithm::A192GcmKw => "A192GCMKW",
            KeyManagementAlgorithm::A256GcmKw => "A256GCMKW",
            KeyManagementAlgorithm::Pbes2Hs256A128Kw => "PBES2-HS256+A128KW",
            KeyManagementAlgorithm::Pbes2Hs384A192Kw => "PBES2-HS384+A192KW",
            KeyManagementAlgorithm::Pbes2Hs512A256Kw => "PBES2-HS512+A256KW",
            KeyManagementAlgorithm::Rsa1_5 => "RSA1_5",
            KeyManagementAlgorithm::RsaOaep => "RSA-OAEP",
            KeyManagementAlgorithm::RsaOaep256 => "RSA-OAEP-256",
            KeyManagementAlgorithm::EcdhEs => "ECDH-ES",
            KeyManagementAlgorithm::EcdhEsA128Kw => "ECDH-ES+A128KW",
            KeyManagementAlgorithm::EcdhEsA192Kw => "ECDH-ES+A192KW",
            KeyManagementAlgorithm::EcdhEsA256Kw => "ECDH-ES+A256KW",
        }
    }

    /// Registry lookup by `alg` header value, refusing identifiers with no
    /// available implementation behind them.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        let algorithm = Self::ALL
            .iter()
            .copied()
            .find(|alg| alg.name() == name)
            .ok_or_else(|| Error::UnsupportedAlgorithm(name.to_owned()))?;
        if !algorithm.is_available() {
            return Err(Error::UnsupportedAlgorithm(format!(
                "{name} is not backed by an available implementation"
            )));
        }
        Ok(algorithm)
    }

    /// Symmetric or asymmetric key management.
    pub fn key_persuasion(&self) -> KeyPersuasion {
        match self {
            KeyManagementAlgorithm::Direct
            | KeyManagementAlgorithm::A128Kw
            | KeyManagementAlgorithm::A192Kw
            | KeyManagementAlgorithm::A256Kw
            | KeyManagementAlgorithm::A128GcmKw
            | KeyManagementAlgorithm::A192GcmKw
            | KeyManagementAlgorithm::A256GcmKw
            | KeyManagementAlgorithm::Pbes2Hs256A128Kw
            | KeyManagementAlgorithm::Pbes2Hs384A192Kw
            | KeyManagementAlgorithm::Pbes2Hs512A256Kw => KeyPersuasion::Symmetric,
            KeyManagementAlgorithm::Rsa1_5
            | KeyManagementAlgorithm::RsaOaep
            | KeyManagementAlgorithm::RsaOaep256
            | KeyManagementAlgorithm::EcdhEs
            | KeyManagementAlgorithm::EcdhEsA128Kw
            | KeyManagementAlgorithm::EcdhEsA192Kw
            | KeyManagementAlgorithm::EcdhEsA256Kw => KeyPersuasion::Asymmetric,
        }
    }

    /// Key management never authenticates the content by itself.
    pub fn provides_integrity(&self) -> bool {
        false
    }

    /// Whether an implementation backs this algorithm.
    pub fn is_available(&self) -> bool {
        match self {
            // Every registered mode is backed by a linked crate; the ECDH
            // modes narrow per curve at key-validation time (X448 has no
            // backend, X25519 and the NIST curves do).
            KeyManagementAlgorithm::Direct
            | KeyManagementAlgorithm::A128Kw
            | KeyManagementAlgorithm::A192Kw
            | KeyManagementAlgorithm::A256Kw
            | KeyManagementAlgorithm::A128GcmKw
            | KeyManagementAlgorithm::A192GcmKw
            | KeyManagementAlgorithm::A256GcmKw
            | KeyManagementAlgorithm::Pbes2Hs256A128Kw
            | KeyManagementAlgorithm::Pbes2Hs384A192Kw
            | KeyManagementAlgorithm::Pbes2Hs512A256Kw
            | KeyManagementAlgorithm::Rsa1_5
            | KeyManagementAlgorithm::RsaOaep
            | KeyManagementAlgorithm::RsaOaep256
            | KeyManagementAlgorithm::EcdhEs
            | KeyManagementAlgorithm::EcdhEsA128Kw
            | KeyManagementAlgorithm::EcdhEsA192Kw
            | KeyManagementAlgorithm::EcdhEsA256Kw => true,
        }
    }
}

/// JWE content encryption algorithms. All are AEAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ContentEncryptionAlgorithm {
    A128CbcHs256,
    A192CbcHs384,
    A256CbcHs512,
    A128Gcm,
    A192Gcm,
    A256Gcm,
}

impl ContentEncryptionAlgorithm {
    /// All registered identifiers.
    pub const ALL: &'static [ContentEncryptionAlgorithm] = &[
        ContentEncryptionAlgorithm::A128CbcHs256,
        ContentEncryptionAlgorithm::A192CbcHs384,
        ContentEncryptionAlgorithm::A256CbcHs512,
        ContentEncryptionAlgorithm::A128Gcm,
        ContentEncryptionAlgorithm::A192Gcm,
        ContentEncryptionAlgorithm::A256Gcm,
    ];

    /// The `enc` header value.
    pub fn name(&self) -> &'static str {
        match self {
            ContentEncryptionAlgorithm::A128CbcHs256 => "A128CBC-HS256",
            ContentEncryptionAlgorithm::A192CbcHs384 => "A192CBC-HS384",
            ContentEncryptionAlgorithm::A256CbcHs512 => "A256CBC-HS512",
            ContentEncryptionAlgorithm::A128Gcm => "A128GCM",
            ContentEncryptionAlgorithm::A192Gcm => "A192GCM",
            ContentEncryptionAlgorithm::A256Gcm => "A256GCM",
        }
    }

    /// Registry lookup by `enc` header value, refusing identifiers with no
    /// available implementation behind them.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        let algorithm = Self::ALL
            .iter()
            .copied()
            .find(|alg| alg.name() == name)
            .ok_or_else(|| Error::UnsupportedAlgorithm(name.to_owned()))?;
        if !algorithm.is_available() {
            return Err(Error::UnsupportedAlgorithm(format!(
                "{name} is not backed by an available implementation"
            )));
        }
        Ok(algorithm)
    }

    /// Required content encryption key length in octets.
    pub fn cek_len(&self) -> usize {
        match self {
            ContentEncryptionAlgorithm::A128CbcHs256 => 32,
            ContentEncryptionAlgorithm::A192CbcHs384 => 48,
            ContentEncryptionAlgorithm::A256CbcHs512 => 64,
            ContentEncryptionAlgorithm::A128Gcm => 16,
            ContentEncryptionAlgorithm::A192Gcm => 24,
            ContentEncryptionAlgorithm::A256Gcm => 32,
        }
    }

    /// Fixed initialization vector length in octets.
    pub fn iv_len(&self) -> usize {
        match self {
            ContentEncryptionAlgorithm::A128CbcHs256
            | ContentEncryptionAlgorithm::A192CbcHs384
            | ContentEncryptionAlgorithm::A256CbcHs512 => 16,
            ContentEncryptionAlgorithm::A128Gcm
            | ContentEncryptionAlgorithm::A192Gcm
            | ContentEncryptionAlgorithm::A256Gcm => 12,
        }
    }

    /// Authentication tag length in octets.
    pub fn tag_len(&self) -> usize {
        match self {
            ContentEncryptionAlgorithm::A128CbcHs256 => 16,
            ContentEncryptionAlgorithm::A192CbcHs384 => 24,
            ContentEncryptionAlgorithm::A256CbcHs512 => 32,
            ContentEncryptionAlgorithm::A128Gcm
            | ContentEncryptionAlgorithm::A192Gcm
            | ContentEncryptionAlgorithm::A256Gcm => 16,
        }
    }

    /// Content encryption is AEAD, so always integrity-protecting.
    pub fn provides_integrity(&self) -> bool {
        true
    }

    /// Whether an implementation backs this algorithm.
    pub fn is_available(&self) -> bool {
        match self {
            ContentEncryptionAlgorithm::A128CbcHs256
            | ContentEncryptionAlgorithm::A192CbcHs384
            | ContentEncryptionAlgorithm::A256CbcHs512
            | ContentEncryptionAlgorithm::A128Gcm
            | ContentEncryptionAlgorithm::A192Gcm
            | ContentEncryptionAlgorithm::A256Gcm => true,
        }
    }
}

/// JWE compression algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionAlgorithm {
    /// DEFLATE (RFC 1951).
    Deflate,
}

impl CompressionAlgorithm {
    /// The `zip` header value.
    pub fn name(&self) -> &'static str {
        match self {
            CompressionAlgorithm::Deflate => "DEF",
        }
    }

    /// Registry lookup by `zip` header value.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            "DEF" => Ok(CompressionAlgorithm::Deflate),
            other => Err(Error::UnsupportedAlgorithm(other.to_owned())),
        }
    }
}
