//! Error types shared across the crate.
//!
//! Claim-validation failures have their own aggregated error type,
//! [`crate::jwt::consumer::InvalidJwtError`], which collects every reason a
//! token was rejected. Everything else funnels through [`Error`].

/// An error raised while producing or consuming a JOSE object.
///
/// Failures that could act as a padding or key-unwrap oracle are deliberately
/// collapsed into [`Error::IntegrityFailure`]; see the JWE decryption path.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Base64url or compact-form input could not be parsed.
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    /// The algorithm identifier is unknown, or known but not backed by an
    /// available implementation.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The algorithm is recognized but forbidden by the active
    /// [`AlgorithmConstraints`](crate::jwa::AlgorithmConstraints).
    #[error("algorithm constraint violated: {0}")]
    AlgorithmConstraintViolated(String),

    /// The key's family, curve, or strength does not fit the algorithm.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A JWK carried a `kty` this implementation does not model.
    #[error("unknown key type: {0}")]
    UnknownKeyType(String),

    /// A key resolver could not produce a key for the JOSE object at hand.
    #[error("unable to resolve key: {0}")]
    UnresolvableKey(String),

    /// Signature verification failed.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// Authenticated decryption failed. Tag mismatch, padding problems and
    /// key-unwrap failures all surface as this one variant so that none of
    /// them is distinguishable to an attacker.
    #[error("authenticated decryption failed")]
    IntegrityFailure,

    /// A header listed in `crit` is not understood by this recipient.
    #[error("unrecognized critical header: {0}")]
    UnrecognizedCritical(String),

    /// A claim value has the wrong shape or range.
    #[error("malformed claim: {0}")]
    MalformedClaim(String),

    /// Decompressed JWE content exceeded the configured ceiling.
    #[error("decompressed content exceeds the {0} byte limit")]
    DecompressionTooLarge(usize),

    /// A structural problem with the JOSE object itself: a missing required
    /// header, an empty mandatory part, an out-of-range header value.
    #[error("{0}")]
    Jose(String),

    /// JSON (de)serialization failed.
    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    /// A stable numeric code for the error kind.
    pub fn code(&self) -> i32 {
        match self {
            Error::MalformedEncoding(_) => 1,
            Error::UnsupportedAlgorithm(_) => 2,
            Error::AlgorithmConstraintViolated(_) => 3,
            Error::InvalidKey(_) => 4,
            Error::UnknownKeyType(_) => 5,
            Error::UnresolvableKey(_) => 6,
            Error::SignatureInvalid => 7,
            Error::IntegrityFailure => 8,
            Error::UnrecognizedCritical(_) => 9,
            Error::MalformedClaim(_) => 10,
            Error::DecompressionTooLarge(_) => 11,
            Error::Jose(_) => 12,
            Error::Serde(_) => 13,
        }
    }
}
