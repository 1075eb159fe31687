//! The tagged key model.
//!
//! [`Key`] is an enum over the key families JOSE deals in. Every algorithm
//! implementation pattern-matches on the variant it requires and fails with
//! [`Error::InvalidKey`] on a mismatch, so a key can never reach a primitive
//! it was not meant for.
//!
//! EC and OKP keys store their coordinates as fixed-width big-endian octet
//! strings whose length is determined by the curve, exactly as they appear
//! in a JWK. Leading zero octets are preserved; typed curve objects are only
//! constructed at the point of use.

use std::fmt;

use elliptic_curve::sec1::{EncodedPoint, FromEncodedPoint, ModulusSize, ToEncodedPoint};
use elliptic_curve::{AffinePoint, CurveArithmetic, FieldBytes, FieldBytesSize};
use rsa::traits::PublicKeyParts;
use rsa::BigUint;
use zeroize::Zeroizing;

use crate::error::Error;

/// Named elliptic curves usable with EC keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcCurve {
    /// NIST P-256 (secp256r1).
    P256,
    /// NIST P-384 (secp384r1).
    P384,
    /// NIST P-521 (secp521r1).
    P521,
    /// secp256k1. Usable for ES256K signatures only, never for ECDH-ES.
    Secp256k1,
}

impl EcCurve {
    /// The JWK `crv` value.
    pub fn name(&self) -> &'static str {
        match self {
            EcCurve::P256 => "P-256",
            EcCurve::P384 => "P-384",
            EcCurve::P521 => "P-521",
            EcCurve::Secp256k1 => "secp256k1",
        }
    }

    /// Look a curve up by its `crv` value.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            "P-256" => Ok(EcCurve::P256),
            "P-384" => Ok(EcCurve::P384),
            "P-521" => Ok(EcCurve::P521),
            "secp256k1" => Ok(EcCurve::Secp256k1),
            other => Err(Error::UnknownKeyType(format!("unknown EC curve {other}"))),
        }
    }

    /// Octet length of one field element: coordinates, private scalars, and
    /// each half of an ECDSA signature.
    pub fn field_len(&self) -> usize {
        match self {
            EcCurve::P256 | EcCurve::Secp256k1 => 32,
            EcCurve::P384 => 48,
            EcCurve::P521 => 66,
        }
    }

    /// Octet length of a concatenated `R || S` ECDSA signature.
    pub fn signature_len(&self) -> usize {
        2 * self.field_len()
    }
}

/// Curves for OKP (RFC 8037) keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OkpCurve {
    /// Ed25519 signing curve.
    Ed25519,
    /// Ed448 signing curve. Modeled but not backed by an implementation.
    Ed448,
    /// X25519 key-agreement curve.
    X25519,
    /// X448 key-agreement curve. Modeled but not backed by an implementation.
    X448,
}

impl OkpCurve {
    /// The JWK `crv` value.
    pub fn name(&self) -> &'static str {
        match self {
            OkpCurve::Ed25519 => "Ed25519",
            OkpCurve::Ed448 => "Ed448",
            OkpCurve::X25519 => "X25519",
            OkpCurve::X448 => "X448",
        }
    }

    /// Look a curve up by its `crv` value.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            "Ed25519" => Ok(OkpCurve::Ed25519),
            "Ed448" => Ok(OkpCurve::Ed448),
            "X25519" => Ok(OkpCurve::X25519),
            "X448" => Ok(OkpCurve::X448),
            other => Err(Error::UnknownKeyType(format!("unknown OKP curve {other}"))),
        }
    }

    /// Octet length of the public key.
    pub fn public_len(&self) -> usize {
        match self {
            OkpCurve::Ed25519 | OkpCurve::X25519 => 32,
            OkpCurve::Ed448 => 57,
            OkpCurve::X448 => 56,
        }
    }

    /// Octet length of the private key.
    pub fn private_len(&self) -> usize {
        self.public_len()
    }

    /// Whether the curve is for signing (Ed*) rather than key agreement (X*).
    pub fn is_signing_curve(&self) -> bool {
        matches!(self, OkpCurve::Ed25519 | OkpCurve::Ed448)
    }

    /// Whether an implementation backs this curve.
    pub fn is_available(&self) -> bool {
        matches!(self, OkpCurve::Ed25519 | OkpCurve::X25519)
    }
}

/// An RSA public key, optionally paired with its private half.
#[derive(Clone)]
pub struct RsaKey {
    public: rsa::RsaPublicKey,
    private: Option<rsa::RsaPrivateKey>,
}

impl PartialEq for RsaKey {
    fn eq(&self, other: &Self) -> bool {
        self.public == other.public && self.private.is_some() == other.private.is_some()
    }
}

impl RsaKey {
    /// Build a public key from big-endian `n` and `e` octets.
    pub fn new_public(n: &[u8], e: &[u8]) -> Result<Self, Error> {
        let public = rsa::RsaPublicKey::new(BigUint::from_bytes_be(n), BigUint::from_bytes_be(e))
            .map_err(|err| Error::InvalidKey(format!("RSA public key: {err}")))?;
        Ok(Self {
            public,
            private: None,
        })
    }

    /// Build a private key from big-endian component octets. The CRT primes
    /// are optional; when absent they are recovered from `n`, `e` and `d`.
    pub fn new_private(n: &[u8], e: &[u8], d: &[u8], primes: &[&[u8]]) -> Result<Self, Error> {
        let primes = primes.iter().map(|p| BigUint::from_bytes_be(p)).collect();
        let private = rsa::RsaPrivateKey::from_components(
            BigUint::from_bytes_be(n),
            BigUint::from_bytes_be(e),
            BigUint::from_bytes_be(d),
            primes,
        )
        .map_err(|err| Error::InvalidKey(format!("RSA private key: {err}")))?;
        let public = private.to_public_key();
        Ok(Self {
            public,
            private: Some(private),
        })
    }

    /// Wrap an existing RustCrypto public key.
    pub fn from_public_key(public: rsa::RsaPublicKey) -> Self {
        Self {
            public,
            private: None,
        }
    }

    /// Wrap an existing RustCrypto private key.
    pub fn from_private_key(private: rsa::RsaPrivateKey) -> Self {
        Self {
            public: private.to_public_key(),
            private: Some(private),
        }
    }

    /// The public half.
    pub fn public_key(&self) -> &rsa::RsaPublicKey {
        &self.public
    }

    /// The private half, if held.
    pub fn private_key(&self) -> Option<&rsa::RsaPrivateKey> {
        self.private.as_ref()
    }

    /// Modulus length in octets.
    pub fn modulus_len(&self) -> usize {
        self.public.size()
    }

    /// Modulus length in bits.
    pub fn modulus_bits(&self) -> usize {
        self.public.n().bits()
    }

    /// `n` as big-endian octets; full modulus width by construction.
    pub fn n_bytes(&self) -> Vec<u8> {
        self.public.n().to_bytes_be()
    }

    /// `e` as minimal big-endian octets.
    pub fn e_bytes(&self) -> Vec<u8> {
        self.public.e().to_bytes_be()
    }

    /// Drop the private half.
    pub fn to_public_only(&self) -> Self {
        Self {
            public: self.public.clone(),
            private: None,
        }
    }
}

impl fmt::Debug for RsaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKey")
            .field("bits", &self.modulus_bits())
            .field("private", &self.private.is_some())
            .finish()
    }
}

/// An elliptic-curve key: curve tag plus fixed-width coordinates.
#[derive(Clone, PartialEq, Eq)]
pub struct EcKey {
    curve: EcCurve,
    x: Vec<u8>,
    y: Vec<u8>,
    d: Option<Zeroizing<Vec<u8>>>,
}

impl EcKey {
    /// Build a key from coordinate octets, left-padding each big-integer
    /// field to the curve's fixed width and checking the point satisfies the
    /// curve equation.
    pub fn new(curve: EcCurve, x: &[u8], y: &[u8], d: Option<&[u8]>) -> Result<Self, Error> {
        let len = curve.field_len();
        let key = Self {
            curve,
            x: left_pad(x, len)?,
            y: left_pad(y, len)?,
            d: d.map(|d| left_pad(d, len).map(Zeroizing::new)).transpose()?,
        };
        key.validate()?;
        Ok(key)
    }

    /// The curve this key lives on.
    pub fn curve(&self) -> EcCurve {
        self.curve
    }

    /// Fixed-width `x` coordinate.
    pub fn x(&self) -> &[u8] {
        &self.x
    }

    /// Fixed-width `y` coordinate.
    pub fn y(&self) -> &[u8] {
        &self.y
    }

    /// Fixed-width private scalar, if held.
    pub fn d(&self) -> Option<&[u8]> {
        self.d.as_deref().map(Vec::as_slice)
    }

    /// Whether the private scalar is held.
    pub fn is_private(&self) -> bool {
        self.d.is_some()
    }

    /// Drop the private scalar.
    pub fn to_public_only(&self) -> Self {
        Self {
            curve: self.curve,
            x: self.x.clone(),
            y: self.y.clone(),
            d: None,
        }
    }

    /// The typed public key, proving the point lies on `C`.
    pub(crate) fn public_key<C>(&self) -> Result<elliptic_curve::PublicKey<C>, Error>
    where
        C: CurveArithmetic,
        FieldBytesSize<C>: ModulusSize,
        AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    {
        let x = FieldBytes::<C>::from_slice(&self.x);
        let y = FieldBytes::<C>::from_slice(&self.y);
        let point = EncodedPoint::<C>::from_affine_coordinates(x, y, false);
        Option::from(elliptic_curve::PublicKey::<C>::from_encoded_point(&point)).ok_or_else(
            || Error::InvalidKey(format!("point is not on curve {}", self.curve.name())),
        )
    }

    /// The typed secret key.
    pub(crate) fn secret_key<C>(&self) -> Result<elliptic_curve::SecretKey<C>, Error>
    where
        C: elliptic_curve::Curve,
    {
        let d = self
            .d
            .as_ref()
            .ok_or_else(|| Error::InvalidKey("EC key has no private component".into()))?;
        elliptic_curve::SecretKey::from_slice(d)
            .map_err(|_| Error::InvalidKey(format!("invalid {} private scalar", self.curve.name())))
    }

    // The curve-equation check happens on construction so that a hostile
    // `epk` never survives parsing.
    fn validate(&self) -> Result<(), Error> {
        match self.curve {
            EcCurve::P256 => self.public_key::<p256::NistP256>().map(drop),
            EcCurve::P384 => self.public_key::<p384::NistP384>().map(drop),
            EcCurve::P521 => self.public_key::<p521::NistP521>().map(drop),
            EcCurve::Secp256k1 => self.public_key::<k256::Secp256k1>().map(drop),
        }
    }
}

impl fmt::Debug for EcKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcKey")
            .field("curve", &self.curve.name())
            .field("private", &self.d.is_some())
            .finish()
    }
}

/// An octet key pair (Ed25519/Ed448/X25519/X448) key.
#[derive(Clone, PartialEq, Eq)]
pub struct OkpKey {
    curve: OkpCurve,
    x: Vec<u8>,
    d: Option<Zeroizing<Vec<u8>>>,
}

impl OkpKey {
    /// Build a key from the raw public octets and optional private octets.
    pub fn new(curve: OkpCurve, x: &[u8], d: Option<&[u8]>) -> Result<Self, Error> {
        if x.len() != curve.public_len() {
            return Err(Error::InvalidKey(format!(
                "{} public key must be {} octets, got {}",
                curve.name(),
                curve.public_len(),
                x.len()
            )));
        }
        if let Some(d) = d {
            if d.len() != curve.private_len() {
                return Err(Error::InvalidKey(format!(
                    "{} private key must be {} octets, got {}",
                    curve.name(),
                    curve.private_len(),
                    d.len()
                )));
            }
        }
        Ok(Self {
            curve,
            x: x.to_vec(),
            d: d.map(|d| Zeroizing::new(d.to_vec())),
        })
    }

    /// The curve this key lives on.
    pub fn curve(&self) -> OkpCurve {
        self.curve
    }

    /// The raw public key octets.
    pub fn x(&self) -> &[u8] {
        &self.x
    }

    /// The raw private key octets, if held.
    pub fn d(&self) -> Option<&[u8]> {
        self.d.as_deref().map(Vec::as_slice)
    }

    /// Whether the private octets are held.
    pub fn is_private(&self) -> bool {
        self.d.is_some()
    }

    /// Drop the private octets.
    pub fn to_public_only(&self) -> Self {
        Self {
            curve: self.curve,
            x: self.x.clone(),
            d: None,
        }
    }
}

impl fmt::Debug for OkpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OkpKey")
            .field("curve", &self.curve.name())
            .field("private", &self.d.is_some())
            .finish()
    }
}

/// A raw symmetric key.
#[derive(Clone, PartialEq, Eq)]
pub struct OctKey(Zeroizing<Vec<u8>>);

impl OctKey {
    /// Wrap raw key octets.
    pub fn new(value: &[u8]) -> Self {
        Self(Zeroizing::new(value.to_vec()))
    }

    /// The key octets.
    pub fn value(&self) -> &[u8] {
        &self.0
    }

    /// Key length in octets.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the key is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for OctKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OctKey").field("len", &self.len()).finish()
    }
}

/// A password for PBES2 key derivation: UTF-8 octets, not a JWK key type.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordKey(Zeroizing<Vec<u8>>);

impl PasswordKey {
    /// Wrap a password string.
    pub fn new(password: &str) -> Self {
        Self(Zeroizing::new(password.as_bytes().to_vec()))
    }

    /// The UTF-8 password octets.
    pub fn value(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PasswordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordKey")
    }
}

/// A key usable with the JOSE algorithms, tagged by family.
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    /// An RSA public or private key.
    Rsa(RsaKey),
    /// An elliptic-curve public or private key.
    Ec(EcKey),
    /// An octet key pair (Ed/X 25519/448) public or private key.
    Okp(OkpKey),
    /// A raw symmetric key.
    Oct(OctKey),
    /// A PBES2 password.
    Password(PasswordKey),
}

impl Key {
    /// A symmetric key from raw octets.
    pub fn from_oct(value: &[u8]) -> Self {
        Key::Oct(OctKey::new(value))
    }

    /// A PBES2 password key.
    pub fn from_password(password: &str) -> Self {
        Key::Password(PasswordKey::new(password))
    }

    /// The JWK `kty` for this key, if it has one. Passwords do not.
    pub fn key_type(&self) -> Option<&'static str> {
        match self {
            Key::Rsa(_) => Some("RSA"),
            Key::Ec(_) => Some("EC"),
            Key::Okp(_) => Some("OKP"),
            Key::Oct(_) => Some("oct"),
            Key::Password(_) => None,
        }
    }

    /// Whether private or symmetric material is held.
    pub fn is_private(&self) -> bool {
        match self {
            Key::Rsa(key) => key.private.is_some(),
            Key::Ec(key) => key.is_private(),
            Key::Okp(key) => key.is_private(),
            Key::Oct(_) | Key::Password(_) => true,
        }
    }

    pub(crate) fn rsa(&self) -> Result<&RsaKey, Error> {
        match self {
            Key::Rsa(key) => Ok(key),
            other => Err(Error::InvalidKey(format!(
                "expected an RSA key, got {}",
                other.family_name()
            ))),
        }
    }

    pub(crate) fn ec(&self) -> Result<&EcKey, Error> {
        match self {
            Key::Ec(key) => Ok(key),
            other => Err(Error::InvalidKey(format!(
                "expected an EC key, got {}",
                other.family_name()
            ))),
        }
    }

    pub(crate) fn okp(&self) -> Result<&OkpKey, Error> {
        match self {
            Key::Okp(key) => Ok(key),
            other => Err(Error::InvalidKey(format!(
                "expected an OKP key, got {}",
                other.family_name()
            ))),
        }
    }

    pub(crate) fn oct(&self) -> Result<&OctKey, Error> {
        match self {
            Key::Oct(key) => Ok(key),
            other => Err(Error::InvalidKey(format!(
                "expected a symmetric (oct) key, got {}",
                other.family_name()
            ))),
        }
    }

    pub(crate) fn password(&self) -> Result<&PasswordKey, Error> {
        match self {
            Key::Password(key) => Ok(key),
            other => Err(Error::InvalidKey(format!(
                "expected a password, got {}",
                other.family_name()
            ))),
        }
    }

    fn family_name(&self) -> &'static str {
        match self {
            Key::Rsa(_) => "an RSA key",
            Key::Ec(_) => "an EC key",
            Key::Okp(_) => "an OKP key",
            Key::Oct(_) => "a symmetric key",
            Key::Password(_) => "a password",
        }
    }
}

/// Left-pad big-endian octets to a fixed width, rejecting oversized input.
pub(crate) fn left_pad(bytes: &[u8], len: usize) -> Result<Vec<u8>, Error> {
    let trimmed: &[u8] = {
        let mut slice = bytes;
        while slice.len() > len && slice.first() == Some(&0) {
            slice = &slice[1..];
        }
        slice
    };
    if trimmed.len() > len {
        return Err(Error::InvalidKey(format!(
            "field element of {} octets exceeds the expected {len}",
            trimmed.len()
        )));
    }
    let mut out = vec![0u8; len - trimmed.len()];
    out.extend_from_slice(trimmed);
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::base64;

    // EC P-256 key from RFC 7515 Appendix A.3.
    const A3_X: &str = "f83OJ3D2xF1Bg8vub9tLe1gHMzV76e8Tus9uPHvRVEU";
    const A3_Y: &str = "x_FEzRu9m36HLN_tue659LNpXW6pCyStikYjKIWI5a0";
    const A3_D: &str = "jpsQnnGQmL-YBIffH1136cspYG6-0iY7X1fCE9-E9LI";

    #[test]
    fn ec_key_round_trip() {
        let x = base64::decode(A3_X).unwrap();
        let y = base64::decode(A3_Y).unwrap();
        let d = base64::decode(A3_D).unwrap();

        let key = EcKey::new(EcCurve::P256, &x, &y, Some(&d)).unwrap();
        assert_eq!(key.x(), &x[..]);
        assert_eq!(key.y(), &y[..]);
        assert!(key.is_private());
        assert!(!key.to_public_only().is_private());
    }

    #[test]
    fn off_curve_point_is_rejected() {
        let x = base64::decode(A3_X).unwrap();
        let mut y = base64::decode(A3_Y).unwrap();
        y[0] ^= 0x01;

        assert!(matches!(
            EcKey::new(EcCurve::P256, &x, &y, None),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn coordinates_are_left_padded() {
        // A 31-octet coordinate must come back 32 octets with a zero front.
        assert_eq!(left_pad(&[1u8; 31], 32).unwrap()[0], 0);
        assert_eq!(left_pad(&[1u8; 31], 32).unwrap().len(), 32);
        assert!(left_pad(&[1u8; 33], 32).is_err());
        // An oversized field with leading zeros is trimmed first.
        let mut wide = vec![0u8; 2];
        wide.extend_from_slice(&[7u8; 31]);
        assert_eq!(left_pad(&wide, 32).unwrap().len(), 32);
    }

    #[test]
    fn okp_key_length_enforced() {
        assert!(OkpKey::new(OkpCurve::Ed25519, &[0u8; 31], None).is_err());
        assert!(OkpKey::new(OkpCurve::Ed25519, &[0u8; 32], None).is_ok());
        assert!(OkpKey::new(OkpCurve::X448, &[0u8; 56], None).is_ok());
    }

    #[test]
    fn family_mismatch_is_invalid_key() {
        let key = Key::from_oct(&[0u8; 32]);
        assert!(matches!(key.rsa(), Err(Error::InvalidKey(_))));
        assert!(key.oct().is_ok());
    }

    #[test]
    fn debug_redacts_secrets() {
        let password = Key::from_password("correct horse battery staple");
        assert_eq!(format!("{password:?}"), "Password(PasswordKey)");

        let oct = Key::from_oct(&[1, 2, 3]);
        assert!(!format!("{oct:?}").contains("[1, 2, 3]"));
    }
}
