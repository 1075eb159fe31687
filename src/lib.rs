#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod base64;
pub mod compact;
mod error;
pub mod headers;
pub mod jose;
pub mod jwa;
pub mod jwe;
pub mod jwk;
pub mod jws;
pub mod jwt;
pub mod zip;

pub use crate::error::Error;
pub use crate::headers::Headers;
pub use crate::jose::JoseObject;
pub use crate::jwa::{
    AlgorithmConstraints, CompressionAlgorithm, ContentEncryptionAlgorithm,
    KeyManagementAlgorithm, SignatureAlgorithm,
};
pub use crate::jwe::JsonWebEncryption;
pub use crate::jwk::{Jwk, Key, OutputLevel};
pub use crate::jws::JsonWebSignature;
pub use crate::jwt::{JwtClaims, JwtConsumer, JwtConsumerBuilder, NumericDate};
