//! JWS signature and MAC primitives.
//!
//! The common contract: `sign` produces the JWS Signature octets over the
//! signing input, `verify` checks them, and the two `validate_*_key` methods
//! refuse keys of the wrong family, curve, or strength before any primitive
//! runs. ECDSA signatures use the JOSE wire form, the concatenation of `R`
//! and `S` each left-padded to the curve's field width; the DER form is
//! never accepted.

use digest::core_api::BlockSizeUser;
use digest::Digest;
use hmac::{Mac, SimpleHmac};
use rand_core::CryptoRngCore;
use rsa::{pkcs1v15, pss};
use sha2::{Sha256, Sha384, Sha512};
use signature::{RandomizedSigner, SignatureEncoding, Signer, Verifier};
use subtle::ConstantTimeEq;

use super::SignatureAlgorithm;
use crate::error::Error;
use crate::jwk::key::{EcCurve, OkpCurve};
use crate::jwk::Key;

/// Minimum RSA modulus size accepted for any RSA-based algorithm, in bits.
pub(crate) const MIN_RSA_KEY_BITS: usize = 2048;

// RSASSA-PKCS1-v1_5, expanded per digest so the signature carries the
// right DigestInfo prefix.
macro_rules! rs_sign {
    ($digest:ty, $key:expr, $input:expr) => {{
        let signing_key = pkcs1v15::SigningKey::<$digest>::new(rsa_private($key)?);
        signing_key
            .try_sign($input)
            .map(|signature| signature.to_vec())
            .map_err(|err| Error::Jose(format!("RSA signing failed: {err}")))
    }};
}

macro_rules! rs_verify {
    ($digest:ty, $key:expr, $input:expr, $signature:expr) => {{
        let verifying_key =
            pkcs1v15::VerifyingKey::<$digest>::new($key.rsa()?.public_key().clone());
        match pkcs1v15::Signature::try_from($signature) {
            Ok(signature) => Ok(verifying_key.verify($input, &signature).is_ok()),
            Err(_) => Ok(false),
        }
    }};
}

impl SignatureAlgorithm {
    /// Sign the JWS signing input, returning the raw signature octets.
    ///
    /// `none` produces an empty signature; callers are expected to have
    /// checked the active constraints before getting here.
    pub fn sign(
        &self,
        key: &Key,
        signing_input: &[u8],
        rng: &mut dyn CryptoRngCore,
    ) -> Result<Vec<u8>, Error> {
        match self {
            SignatureAlgorithm::Hs256 => hmac_sign::<Sha256>(key, signing_input),
            SignatureAlgorithm::Hs384 => hmac_sign::<Sha384>(key, signing_input),
            SignatureAlgorithm::Hs512 => hmac_sign::<Sha512>(key, signing_input),
            SignatureAlgorithm::Rs256 => rs_sign!(Sha256, key, signing_input),
            SignatureAlgorithm::Rs384 => rs_sign!(Sha384, key, signing_input),
            SignatureAlgorithm::Rs512 => rs_sign!(Sha512, key, signing_input),
            SignatureAlgorithm::Ps256 => ps_sign::<Sha256>(key, signing_input, rng),
            SignatureAlgorithm::Ps384 => ps_sign::<Sha384>(key, signing_input, rng),
            SignatureAlgorithm::Ps512 => ps_sign::<Sha512>(key, signing_input, rng),
            SignatureAlgorithm::Es256 => ecdsa_sign::<p256::NistP256>(key, signing_input),
            SignatureAlgorithm::Es384 => ecdsa_sign::<p384::NistP384>(key, signing_input),
            SignatureAlgorithm::Es512 => ecdsa_sign_p521(key, signing_input, rng),
            SignatureAlgorithm::Es256k => ecdsa_sign::<k256::Secp256k1>(key, signing_input),
            SignatureAlgorithm::EdDsa => eddsa_sign(key, signing_input),
            SignatureAlgorithm::None => Ok(Vec::new()),
        }
    }

    /// Verify the signature octets over the JWS signing input.
    ///
    /// A malformed signature (wrong length, unparsable point) verifies as
    /// `false` rather than erroring, so callers cannot be steered by crafted
    /// signature bytes.
    pub fn verify(&self, key: &Key, signing_input: &[u8], signature: &[u8]) -> Result<bool, Error> {
        match self {
            SignatureAlgorithm::Hs256 => hmac_verify::<Sha256>(key, signing_input, signature),
            SignatureAlgorithm::Hs384 => hmac_verify::<Sha384>(key, signing_input, signature),
            SignatureAlgorithm::Hs512 => hmac_verify::<Sha512>(key, signing_input, signature),
            SignatureAlgorithm::Rs256 => rs_verify!(Sha256, key, signing_input, signature),
            SignatureAlgorithm::Rs384 => rs_verify!(Sha384, key, signing_input, signature),
            SignatureAlgorithm::Rs512 => rs_verify!(Sha512, key, signing_input, signature),
            SignatureAlgorithm::Ps256 => ps_verify::<Sha256>(key, signing_input, signature),
            SignatureAlgorithm::Ps384 => ps_verify::<Sha384>(key, signing_input, signature),
            SignatureAlgorithm::Ps512 => ps_verify::<Sha512>(key, signing_input, signature),
            SignatureAlgorithm::Es256 => {
                ecdsa_verify::<p256::NistP256>(key, signing_input, signature, EcCurve::P256)
            }
            SignatureAlgorithm::Es384 => {
                ecdsa_verify::<p384::NistP384>(key, signing_input, signature, EcCurve::P384)
            }
            SignatureAlgorithm::Es512 => ecdsa_verify_p521(key, signing_input, signature),
            SignatureAlgorithm::Es256k => {
                ecdsa_verify::<k256::Secp256k1>(key, signing_input, signature, EcCurve::Secp256k1)
            }
            SignatureAlgorithm::EdDsa => eddsa_verify(key, signing_input, signature),
            SignatureAlgorithm::None => Ok(signature.is_empty()),
        }
    }

    /// Check that `key` can produce signatures under this algorithm.
    pub fn validate_signing_key(&self, key: &Key) -> Result<(), Error> {
        self.validate_key(key, true)
    }

    /// Check that `key` can verify signatures under this algorithm.
    pub fn validate_verification_key(&self, key: &Key) -> Result<(), Error> {
        self.validate_key(key, false)
    }

    fn validate_key(&self, key: &Key, signing: bool) -> Result<(), Error> {
        match self {
            SignatureAlgorithm::Hs256 => validate_hmac_key(key, 32),
            SignatureAlgorithm::Hs384 => validate_hmac_key(key, 48),
            SignatureAlgorithm::Hs512 => validate_hmac_key(key, 64),
            SignatureAlgorithm::Rs256
            | SignatureAlgorithm::Rs384
            | SignatureAlgorithm::Rs512
            | SignatureAlgorithm::Ps256
            | SignatureAlgorithm::Ps384
            | SignatureAlgorithm::Ps512 => validate_rsa_key(key, signing),
            SignatureAlgorithm::Es256 => validate_ec_key(key, EcCurve::P256, signing),
            SignatureAlgorithm::Es384 => validate_ec_key(key, EcCurve::P384, signing),
            SignatureAlgorithm::Es512 => validate_ec_key(key, EcCurve::P521, signing),
            SignatureAlgorithm::Es256k => validate_ec_key(key, EcCurve::Secp256k1, signing),
            SignatureAlgorithm::EdDsa => validate_okp_key(key, signing),
            SignatureAlgorithm::None => Ok(()),
        }
    }
}

fn validate_hmac_key(key: &Key, min_len: usize) -> Result<(), Error> {
    let oct = key.oct()?;
    if oct.len() < min_len {
        return Err(Error::InvalidKey(format!(
            "HMAC key of {} octets is shorter than the {} octet hash output",
            oct.len(),
            min_len
        )));
    }
    Ok(())
}

fn validate_rsa_key(key: &Key, signing: bool) -> Result<(), Error> {
    let rsa = key.rsa()?;
    if rsa.modulus_bits() < MIN_RSA_KEY_BITS {
        return Err(Error::InvalidKey(format!(
            "{}-bit RSA key is below the {MIN_RSA_KEY_BITS}-bit minimum",
            rsa.modulus_bits()
        )));
    }
    if signing && rsa.private_key().is_none() {
        return Err(Error::InvalidKey(
            "signing requires the RSA private key".into(),
        ));
    }
    Ok(())
}

fn validate_ec_key(key: &Key, curve: EcCurve, signing: bool) -> Result<(), Error> {
    let ec = key.ec()?;
    if ec.curve() != curve {
        return Err(Error::InvalidKey(format!(
            "expected a key on {}, got {}",
            curve.name(),
            ec.curve().name()
        )));
    }
    if signing && !ec.is_private() {
        return Err(Error::InvalidKey(
            "signing requires the EC private key".into(),
        ));
    }
    Ok(())
}

fn validate_okp_key(key: &Key, signing: bool) -> Result<(), Error> {
    let okp = key.okp()?;
    if !okp.curve().is_signing_curve() {
        return Err(Error::InvalidKey(format!(
            "{} is a key agreement curve, not a signing curve",
            okp.curve().name()
        )));
    }
    if !okp.curve().is_available() {
        return Err(Error::UnsupportedAlgorithm(format!(
            "EdDSA with {} is not backed by an implementation",
            okp.curve().name()
        )));
    }
    if signing && !okp.is_private() {
        return Err(Error::InvalidKey(
            "signing requires the EdDSA private key".into(),
        ));
    }
    Ok(())
}

fn hmac_sign<D>(key: &Key, input: &[u8]) -> Result<Vec<u8>, Error>
where
    D: Digest + BlockSizeUser,
{
    let mut mac = SimpleHmac::<D>::new_from_slice(key.oct()?.value())
        .map_err(|_| Error::InvalidKey("unusable HMAC key".into()))?;
    mac.update(input);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn hmac_verify<D>(key: &Key, input: &[u8], signature: &[u8]) -> Result<bool, Error>
where
    D: Digest + BlockSizeUser,
{
    let expected = hmac_sign::<D>(key, input)?;
    Ok(expected.ct_eq(signature).into())
}

fn rsa_private(key: &Key) -> Result<rsa::RsaPrivateKey, Error> {
    key.rsa()?
        .private_key()
        .cloned()
        .ok_or_else(|| Error::InvalidKey("signing requires the RSA private key".into()))
}


fn ps_sign<D>(key: &Key, input: &[u8], rng: &mut dyn CryptoRngCore) -> Result<Vec<u8>, Error>
where
    D: Digest + digest::FixedOutputReset,
{
    // The salt length defaults to the digest output length.
    let signing_key = pss::SigningKey::<D>::new(rsa_private(key)?);
    let signature = signing_key
        .try_sign_with_rng(&mut &mut *rng, input)
        .map_err(|err| Error::Jose(format!("RSA-PSS signing failed: {err}")))?;
    Ok(signature.to_vec())
}

fn ps_verify<D>(key: &Key, input: &[u8], signature: &[u8]) -> Result<bool, Error>
where
    D: Digest + digest::FixedOutputReset,
{
    let verifying_key = pss::VerifyingKey::<D>::new(key.rsa()?.public_key().clone());
    let Ok(signature) = pss::Signature::try_from(signature) else {
        return Ok(false);
    };
    Ok(verifying_key.verify(input, &signature).is_ok())
}

fn ecdsa_sign<C>(key: &Key, input: &[u8]) -> Result<Vec<u8>, Error>
where
    C: ecdsa::PrimeCurve + elliptic_curve::CurveArithmetic + ecdsa::hazmat::DigestPrimitive,
    elliptic_curve::Scalar<C>: elliptic_curve::ops::Invert<
            Output = elliptic_curve::subtle::CtOption<elliptic_curve::Scalar<C>>,
        > + ecdsa::hazmat::SignPrimitive<C>,
    ecdsa::SignatureSize<C>: digest::generic_array::ArrayLength<u8>,
{
    let ec = key.ec()?;
    let secret = ec.secret_key::<C>()?;
    let signing_key = ecdsa::SigningKey::<C>::from(&secret);
    let signature: ecdsa::Signature<C> = signing_key
        .try_sign(input)
        .map_err(|err| Error::Jose(format!("ECDSA signing failed: {err}")))?;
    Ok(signature.to_bytes().to_vec())
}

fn ecdsa_verify<C>(
    key: &Key,
    input: &[u8],
    signature: &[u8],
    curve: EcCurve,
) -> Result<bool, Error>
where
    C: ecdsa::PrimeCurve + elliptic_curve::CurveArithmetic + ecdsa::hazmat::DigestPrimitive,
    ecdsa::SignatureSize<C>: digest::generic_array::ArrayLength<u8>,
    elliptic_curve::FieldBytesSize<C>: elliptic_curve::sec1::ModulusSize,
    elliptic_curve::AffinePoint<C>: elliptic_curve::sec1::FromEncodedPoint<C>
        + elliptic_curve::sec1::ToEncodedPoint<C>
        + ecdsa::hazmat::VerifyPrimitive<C>,
{
    // R || S only, and only at exactly the curve's width.
    if signature.len() != curve.signature_len() {
        return Ok(false);
    }
    let ec = key.ec()?;
    let verifying_key = ecdsa::VerifyingKey::<C>::from(ec.public_key::<C>()?);
    let Ok(signature) = ecdsa::Signature::<C>::from_slice(signature) else {
        return Ok(false);
    };
    Ok(verifying_key.verify(input, &signature).is_ok())
}

// p521 0.13 does not implement `ecdsa::hazmat::DigestPrimitive` for
// `NistP521` (SHA-512's 64-octet output doesn't match the curve's 66-octet
// field width, so the crate can't offer the deterministic RFC 6979 nonce the
// other curves use here). Its own `p521::ecdsa` wrapper signs/verifies a
// SHA-512 prehash directly against the curve with a randomized nonce, which
// is what ES512 needs.
fn ecdsa_sign_p521(key: &Key, input: &[u8], rng: &mut dyn CryptoRngCore) -> Result<Vec<u8>, Error> {
    use signature::hazmat::RandomizedPrehashSigner;

    let ec = key.ec()?;
    let secret = ec.secret_key::<p521::NistP521>()?;
    let signing_key =
        p521::ecdsa::SigningKey::from(ecdsa::SigningKey::<p521::NistP521>::from(&secret));
    let digest = Sha512::digest(input);
    let signature = signing_key
        .sign_prehash_with_rng(&mut &mut *rng, &digest)
        .map_err(|err| Error::Jose(format!("ECDSA signing failed: {err}")))?;
    Ok(signature.to_bytes().to_vec())
}

fn ecdsa_verify_p521(key: &Key, input: &[u8], signature: &[u8]) -> Result<bool, Error> {
    use signature::hazmat::PrehashVerifier;

    if signature.len() != EcCurve::P521.signature_len() {
        return Ok(false);
    }
    let ec = key.ec()?;
    let verifying_key = p521::ecdsa::VerifyingKey::from(ecdsa::VerifyingKey::<p521::NistP521>::from(
        ec.public_key::<p521::NistP521>()?,
    ));
    let Ok(signature) = p521::ecdsa::Signature::from_slice(signature) else {
        return Ok(false);
    };
    let digest = Sha512::digest(input);
    Ok(verifying_key.verify_prehash(&digest, &signature).is_ok())
}

fn eddsa_sign(key: &Key, input: &[u8]) -> Result<Vec<u8>, Error> {
    let okp = key.okp()?;
    match okp.curve() {
        OkpCurve::Ed25519 => {
            let d: &[u8; 32] = okp
                .d()
                .and_then(|d| d.try_into().ok())
                .ok_or_else(|| Error::InvalidKey("signing requires the Ed25519 private key".into()))?;
            let signing_key = ed25519_dalek::SigningKey::from_bytes(d);
            Ok(signing_key.sign(input).to_bytes().to_vec())
        }
        OkpCurve::Ed448 => Err(Error::UnsupportedAlgorithm(
            "EdDSA with Ed448 is not backed by an implementation".into(),
        )),
        other => Err(Error::InvalidKey(format!(
            "{} cannot produce EdDSA signatures",
            other.name()
        ))),
    }
}

fn eddsa_verify(key: &Key, input: &[u8], signature: &[u8]) -> Result<bool, Error> {
    let okp = key.okp()?;
    match okp.curve() {
        OkpCurve::Ed25519 => {
            let x: &[u8; 32] = okp
                .x()
                .try_into()
                .map_err(|_| Error::InvalidKey("malformed Ed25519 public key".into()))?;
            let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(x)
                .map_err(|_| Error::InvalidKey("malformed Ed25519 public key".into()))?;
            let Ok(signature) = ed25519_dalek::Signature::try_from(signature) else {
                return Ok(false);
            };
            Ok(verifying_key.verify(input, &signature).is_ok())
        }
        OkpCurve::Ed448 => Err(Error::UnsupportedAlgorithm(
            "EdDSA with Ed448 is not backed by an implementation".into(),
        )),
        other => Err(Error::InvalidKey(format!(
            "{} cannot verify EdDSA signatures",
            other.name()
        ))),
    }
}

#[cfg(test)]
mod test {
    use rand_core::OsRng;
    use serde_json::json;

    use super::*;
    use crate::base64;
    use crate::jwk::Jwk;

    fn strip_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    fn signing_input(header: &str, payload: &str) -> Vec<u8> {
        format!("{header}.{payload}").into_bytes()
    }

    #[test]
    fn rfc7515_example_a1_hs256() {
        // HMAC key and signing input from RFC 7515 Appendix A.1.
        let key = Jwk::from_value(&json!({
            "kty":"oct",
            "k": strip_whitespace(
                "AyM1SysPpbyDfgZld3umj1qzKObwVMkoqQ-EstJQLr_T-1qS0gZH75
                 aKtMN3Yj0iPS4hcgUuTwjAzZr1Z9CAow")
        }))
        .unwrap()
        .into_key();

        let input = signing_input(
            "eyJ0eXAiOiJKV1QiLA0KICJhbGciOiJIUzI1NiJ9",
            &strip_whitespace(
                "eyJpc3MiOiJqb2UiLA0KICJleHAiOjEzMDA4MTkzODAsDQogImh0dHA6Ly9leGFt
                 cGxlLmNvbS9pc19yb290Ijp0cnVlfQ",
            ),
        );

        let alg = SignatureAlgorithm::Hs256;
        alg.validate_signing_key(&key).unwrap();
        let signature = alg.sign(&key, &input, &mut OsRng).unwrap();
        assert_eq!(
            base64::encode(&signature),
            "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"
        );
        assert!(alg.verify(&key, &input, &signature).unwrap());

        let mut tampered = signature.clone();
        tampered[0] ^= 1;
        assert!(!alg.verify(&key, &input, &tampered).unwrap());
    }

    #[test]
    fn hmac_key_shorter_than_hash_is_invalid() {
        let key = Key::from_oct(&[7u8; 16]);
        assert!(matches!(
            SignatureAlgorithm::Hs256.validate_signing_key(&key),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn ecdsa_round_trip_and_size_rejection() {
        // EC P-256 key from RFC 7515 Appendix A.3.
        let key = Jwk::from_value(&json!({
            "kty":"EC",
            "crv":"P-256",
            "x":"f83OJ3D2xF1Bg8vub9tLe1gHMzV76e8Tus9uPHvRVEU",
            "y":"x_FEzRu9m36HLN_tue659LNpXW6pCyStikYjKIWI5a0",
            "d":"jpsQnnGQmL-YBIffH1136cspYG6-0iY7X1fCE9-E9LI"
        }))
        .unwrap()
        .into_key();

        let alg = SignatureAlgorithm::Es256;
        let input = signing_input("eyJhbGciOiJFUzI1NiJ9", "cGF5bG9hZA");
        let signature = alg.sign(&key, &input, &mut OsRng).unwrap();
        assert_eq!(signature.len(), 64);
        assert!(alg.verify(&key, &input, &signature).unwrap());

        // A DER-ish or truncated signature must be rejected by size alone.
        assert!(!alg.verify(&key, &input, &signature[..63]).unwrap());
        let mut padded = signature.clone();
        padded.push(0);
        assert!(!alg.verify(&key, &input, &padded).unwrap());
    }

    #[test]
    fn ecdsa_wrong_curve_is_invalid_key() {
        let key = Jwk::from_value(&json!({
            "kty":"EC",
            "crv":"P-256",
            "x":"f83OJ3D2xF1Bg8vub9tLe1gHMzV76e8Tus9uPHvRVEU",
            "y":"x_FEzRu9m36HLN_tue659LNpXW6pCyStikYjKIWI5a0"
        }))
        .unwrap()
        .into_key();

        assert!(matches!(
            SignatureAlgorithm::Es384.validate_verification_key(&key),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn eddsa_rfc8037_a4() {
        // Ed25519 key and signature from RFC 8037 Appendix A.4.
        let key = Jwk::from_value(&json!({
            "kty":"OKP",
            "crv":"Ed25519",
            "d":"nWGxne_9WmC6hEr0kuwsxERJxWl7MmkZcDusAxyuf2A",
            "x":"11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"
        }))
        .unwrap()
        .into_key();

        let input = signing_input("eyJhbGciOiJFZERTQSJ9", "RXhhbXBsZSBvZiBFZDI1NTE5IHNpZ25pbmc");
        let alg = SignatureAlgorithm::EdDsa;
        let signature = alg.sign(&key, &input, &mut OsRng).unwrap();
        assert_eq!(
            base64::encode(&signature),
            strip_whitespace(
                "hgyY0il_MGCjP0JzlnLWG1PPOt7-09PGcvMg3AIbQR6dWbhijcNR4ki4iylGjg5Bhi1J\
                 rM9YnnBIkEh8wQzp3w"
            )
        );
        assert!(alg.verify(&key, &input, &signature).unwrap());
    }

    #[test]
    fn none_produces_and_accepts_empty_signatures_only() {
        let alg = SignatureAlgorithm::None;
        let key = Key::from_oct(&[0u8; 32]);
        assert!(alg.sign(&key, b"irrelevant", &mut OsRng).unwrap().is_empty());
        assert!(alg.verify(&key, b"irrelevant", b"").unwrap());
        assert!(!alg.verify(&key, b"irrelevant", b"sig").unwrap());
    }
}
