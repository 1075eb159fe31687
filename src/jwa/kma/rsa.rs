//! RSA key encryption: RSAES-PKCS1-v1_5 and RSAES-OAEP.
//!
//! RSA1_5 decryption carries the classic Bleichenbacher risk: whether the
//! PKCS#1 decoding succeeded must not be observable. Decryption therefore
//! never fails here. A decode failure, or a decoded key of the wrong
//! length, is silently replaced with a fresh random CEK of the expected
//! length; the decryption then proceeds and dies later, uniformly, on the
//! content authentication tag.

use rand_core::CryptoRngCore;
use rsa::{Oaep, Pkcs1v15Encrypt};
use sha1::Sha1;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::Error;
use crate::jwa::KeyManagementAlgorithm;
use crate::jwk::Key;

pub(super) fn encrypt_cek(
    alg: &KeyManagementAlgorithm,
    key: &Key,
    cek: &[u8],
    rng: &mut dyn CryptoRngCore,
) -> Result<Vec<u8>, Error> {
    let public = key.rsa()?.public_key();
    let encrypted = match alg {
        KeyManagementAlgorithm::Rsa1_5 => public.encrypt(&mut &mut *rng, Pkcs1v15Encrypt, cek),
        KeyManagementAlgorithm::RsaOaep => {
            public.encrypt(&mut &mut *rng, Oaep::new::<Sha1>(), cek)
        }
        KeyManagementAlgorithm::RsaOaep256 => {
            public.encrypt(&mut &mut *rng, Oaep::new::<Sha256>(), cek)
        }
        other => {
            return Err(Error::Jose(format!(
                "{} is not an RSA key management algorithm",
                other.name()
            )))
        }
    };
    encrypted.map_err(|err| Error::Jose(format!("RSA key encryption failed: {err}")))
}

pub(super) fn decrypt_cek(
    alg: &KeyManagementAlgorithm,
    private: &rsa::RsaPrivateKey,
    encrypted_key: &[u8],
    cek_len: usize,
    rng: &mut dyn CryptoRngCore,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    match alg {
        KeyManagementAlgorithm::Rsa1_5 => {
            // Substitute rather than fail; see the module docs.
            let cek = match private.decrypt(Pkcs1v15Encrypt, encrypted_key) {
                Ok(cek) if cek.len() == cek_len => Zeroizing::new(cek),
                _ => {
                    let mut random_cek = Zeroizing::new(vec![0u8; cek_len]);
                    rng.fill_bytes(&mut random_cek);
                    random_cek
                }
            };
            Ok(cek)
        }
        KeyManagementAlgorithm::RsaOaep => private
            .decrypt(Oaep::new::<Sha1>(), encrypted_key)
            .map(Zeroizing::new)
            .map_err(|_| Error::IntegrityFailure),
        KeyManagementAlgorithm::RsaOaep256 => private
            .decrypt(Oaep::new::<Sha256>(), encrypted_key)
            .map(Zeroizing::new)
            .map_err(|_| Error::IntegrityFailure),
        other => Err(Error::Jose(format!(
            "{} is not an RSA key management algorithm",
            other.name()
        ))),
    }
}
