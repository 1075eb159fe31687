//! ECDH-ES key agreement (RFC 7518 section 4.6) over the NIST curves and
//! X25519, with the Concat KDF from NIST SP 800-56A section 5.8.1.
//!
//! The producing side generates an ephemeral key on the recipient's curve
//! and publishes it as the `epk` header. The consuming side reads `epk`
//! back; the key model re-checks the curve equation while parsing it, so a
//! point crafted to land on a weaker curve never reaches the scalar
//! multiplication. secp256k1 is refused outright, as RFC 8812 leaves it
//! undefined for JOSE key agreement.

use elliptic_curve::ecdh::EphemeralSecret;
use elliptic_curve::sec1::{Coordinates, FromEncodedPoint, ModulusSize, ToEncodedPoint};
use elliptic_curve::{AffinePoint, CurveArithmetic, FieldBytesSize};
use rand_core::CryptoRngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::base64;
use crate::error::Error;
use crate::headers::{names, Headers};
use crate::jwa::KeyManagementAlgorithm;
use crate::jwk::key::{EcCurve, EcKey, OkpCurve, OkpKey};
use crate::jwk::{Jwk, Key};

pub(super) fn validate_key(key: &Key, decrypting: bool) -> Result<(), Error> {
    match key {
        Key::Ec(ec) => {
            check_curve_allowed(ec.curve())?;
            if decrypting && !ec.is_private() {
                return Err(Error::InvalidKey(
                    "ECDH-ES decryption requires the EC private key".into(),
                ));
            }
            Ok(())
        }
        Key::Okp(okp) => {
            if okp.curve().is_signing_curve() {
                return Err(Error::InvalidKey(format!(
                    "{} is a signing curve, not a key agreement curve",
                    okp.curve().name()
                )));
            }
            if decrypting && !okp.is_private() {
                return Err(Error::InvalidKey(
                    "ECDH-ES decryption requires the OKP private key".into(),
                ));
            }
            Ok(())
        }
        other => Err(Error::InvalidKey(format!(
            "ECDH-ES requires an EC or OKP key, got {:?}",
            other.key_type()
        ))),
    }
}

fn check_curve_allowed(curve: EcCurve) -> Result<(), Error> {
    if curve == EcCurve::Secp256k1 {
        return Err(Error::InvalidKey(
            "the secp256k1 curve is not defined for ECDH-ES key agreement".into(),
        ));
    }
    Ok(())
}

/// Generate an ephemeral key on the recipient's curve, publish it as `epk`,
/// agree on `Z`, and run the KDF.
pub(super) fn derive_for_encrypt(
    alg: &KeyManagementAlgorithm,
    key: &Key,
    keydatalen: usize,
    headers: &mut Headers,
    rng: &mut dyn CryptoRngCore,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let (epk, z) = match key {
        Key::Ec(recipient) => {
            check_curve_allowed(recipient.curve())?;
            let (epk, z) = match recipient.curve() {
                EcCurve::P256 => nist_ephemeral::<p256::NistP256>(recipient, rng)?,
                EcCurve::P384 => nist_ephemeral::<p384::NistP384>(recipient, rng)?,
                EcCurve::P521 => nist_ephemeral::<p521::NistP521>(recipient, rng)?,
                EcCurve::Secp256k1 => unreachable!("refused above"),
            };
            (Key::Ec(epk), z)
        }
        Key::Okp(recipient) => {
            let (epk, z) = x25519_ephemeral(recipient, rng)?;
            (Key::Okp(epk), z)
        }
        other => {
            return Err(Error::InvalidKey(format!(
                "ECDH-ES requires an EC or OKP key, got {:?}",
                other.key_type()
            )))
        }
    };

    headers.set_jwk_value(names::EPHEMERAL_PUBLIC_KEY, &Jwk::from_key(epk))?;
    kdf(alg, &z, keydatalen, headers)
}

/// Read `epk` back and agree on `Z` with the recipient's private key.
pub(super) fn agree_for_decrypt(key: &Key, headers: &Headers) -> Result<Zeroizing<Vec<u8>>, Error> {
    let epk = headers
        .jwk_value(names::EPHEMERAL_PUBLIC_KEY)?
        .ok_or_else(|| Error::Jose("epk header is required for ECDH-ES".into()))?;

    match (key, epk.key()) {
        (Key::Ec(private), Key::Ec(epk)) => {
            check_curve_allowed(private.curve())?;
            if epk.curve() != private.curve() {
                return Err(Error::InvalidKey(format!(
                    "epk is on {} but the private key is on {}",
                    epk.curve().name(),
                    private.curve().name()
                )));
            }
            match private.curve() {
                EcCurve::P256 => nist_agree::<p256::NistP256>(private, epk),
                EcCurve::P384 => nist_agree::<p384::NistP384>(private, epk),
                EcCurve::P521 => nist_agree::<p521::NistP521>(private, epk),
                EcCurve::Secp256k1 => unreachable!("refused above"),
            }
        }
        (Key::Okp(private), Key::Okp(epk)) => x25519_agree(private, epk),
        (_, epk) => Err(Error::InvalidKey(format!(
            "epk key family {:?} does not match the private key",
            epk.key_type()
        ))),
    }
}

/// The Concat KDF over `Z`.
///
/// `OtherInfo` is `AlgorithmID || PartyUInfo || PartyVInfo || SuppPubInfo`,
/// each variable-length field prefixed with its 32-bit big-endian length.
/// The AlgorithmID is the `enc` value in direct agreement and the `alg`
/// value in the key wrapping variants.
pub(super) fn kdf(
    alg: &KeyManagementAlgorithm,
    z: &[u8],
    keydatalen: usize,
    headers: &Headers,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let algorithm_id = if *alg == KeyManagementAlgorithm::EcdhEs {
        headers
            .string_value(names::ENCRYPTION_METHOD)
            .ok_or_else(|| Error::Jose("enc header is required for ECDH-ES".into()))?
            .to_owned()
    } else {
        alg.name().to_owned()
    };
    let apu = party_info(headers, names::AGREEMENT_PARTY_U_INFO)?;
    let apv = party_info(headers, names::AGREEMENT_PARTY_V_INFO)?;

    let mut other_info = Vec::new();
    push_length_prefixed(&mut other_info, algorithm_id.as_bytes());
    push_length_prefixed(&mut other_info, &apu);
    push_length_prefixed(&mut other_info, &apv);
    other_info.extend_from_slice(&((keydatalen as u32) * 8).to_be_bytes());

    let mut derived = Zeroizing::new(vec![0u8; keydatalen]);
    concat_kdf::derive_key_into::<Sha256>(z, &other_info, &mut derived)
        .map_err(|_| Error::Jose("Concat KDF derivation failed".into()))?;
    Ok(derived)
}

fn party_info(headers: &Headers, name: &str) -> Result<Vec<u8>, Error> {
    match headers.string_value(name) {
        Some(value) => base64::decode(value),
        None => Ok(Vec::new()),
    }
}

fn push_length_prefixed(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
}

fn nist_ephemeral<C>(
    recipient: &EcKey,
    rng: &mut dyn CryptoRngCore,
) -> Result<(EcKey, Zeroizing<Vec<u8>>), Error>
where
    C: CurveArithmetic,
    FieldBytesSize<C>: ModulusSize,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
{
    let recipient_public = recipient.public_key::<C>()?;
    let ephemeral = EphemeralSecret::<C>::random(&mut &mut *rng);
    let z = ephemeral.diffie_hellman(&recipient_public);

    let point = ephemeral.public_key().to_encoded_point(false);
    let Coordinates::Uncompressed { x, y } = point.coordinates() else {
        return Err(Error::Jose("ephemeral point is not affine".into()));
    };
    let epk = EcKey::new(recipient.curve(), x, y, None)?;

    Ok((epk, Zeroizing::new(z.raw_secret_bytes().to_vec())))
}

fn nist_agree<C>(private: &EcKey, epk: &EcKey) -> Result<Zeroizing<Vec<u8>>, Error>
where
    C: CurveArithmetic,
    FieldBytesSize<C>: ModulusSize,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
{
    let secret = private.secret_key::<C>()?;
    let public = epk.public_key::<C>()?;
    let z = elliptic_curve::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
    Ok(Zeroizing::new(z.raw_secret_bytes().to_vec()))
}

fn x25519_public(okp: &OkpKey) -> Result<x25519_dalek::PublicKey, Error> {
    let x: [u8; 32] = okp
        .x()
        .try_into()
        .map_err(|_| Error::InvalidKey("malformed X25519 public key".into()))?;
    Ok(x25519_dalek::PublicKey::from(x))
}

fn x25519_ephemeral(
    recipient: &OkpKey,
    rng: &mut dyn CryptoRngCore,
) -> Result<(OkpKey, Zeroizing<Vec<u8>>), Error> {
    match recipient.curve() {
        OkpCurve::X25519 => {}
        OkpCurve::X448 => {
            return Err(Error::UnsupportedAlgorithm(
                "ECDH-ES with X448 is not backed by an implementation".into(),
            ))
        }
        other => {
            return Err(Error::InvalidKey(format!(
                "{} is not a key agreement curve",
                other.name()
            )))
        }
    }

    let their_public = x25519_public(recipient)?;
    let ephemeral = x25519_dalek::EphemeralSecret::random_from_rng(&mut *rng);
    let epk_public = x25519_dalek::PublicKey::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(&their_public);

    let epk = OkpKey::new(OkpCurve::X25519, epk_public.as_bytes(), None)?;
    Ok((epk, Zeroizing::new(shared.as_bytes().to_vec())))
}

fn x25519_agree(private: &OkpKey, epk: &OkpKey) -> Result<Zeroizing<Vec<u8>>, Error> {
    match (private.curve(), epk.curve()) {
        (OkpCurve::X25519, OkpCurve::X25519) => {}
        (OkpCurve::X448, _) => {
            return Err(Error::UnsupportedAlgorithm(
                "ECDH-ES with X448 is not backed by an implementation".into(),
            ))
        }
        (a, b) => {
            return Err(Error::InvalidKey(format!(
                "cannot agree between {} and epk on {}",
                a.name(),
                b.name()
            )))
        }
    }

    let d: [u8; 32] = private
        .d()
        .and_then(|d| d.try_into().ok())
        .ok_or_else(|| Error::InvalidKey("decryption requires the X25519 private key".into()))?;
    let secret = x25519_dalek::StaticSecret::from(d);
    let shared = secret.diffie_hellman(&x25519_public(epk)?);
    Ok(Zeroizing::new(shared.as_bytes().to_vec()))
}
