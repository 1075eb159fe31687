//! JSON Web Tokens ([RFC 7519][RFC7519]): claims and the consumer
//! pipeline.
//!
//! [RFC7519]: https://tools.ietf.org/html/rfc7519

pub mod claims;
pub mod consumer;
pub mod validators;

pub use self::claims::{JwtClaims, NumericDate};
pub use self::consumer::{
    DecryptionKeyResolver, InvalidJwtError, JwtConsumer, JwtConsumerBuilder, JwtContext,
    VerificationKeyResolver,
};
pub use self::validators::{error_codes, ClaimsValidator, ValidationContext, ValidationError};
