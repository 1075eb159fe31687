//! JWE content encryption: the AEAD algorithms that protect the payload.
//!
//! Both families follow the contract from [RFC 7518][RFC7518] section 5:
//! encryption takes the plaintext, the AAD (the ASCII octets of the encoded
//! protected header) and a CEK of exactly the algorithm's required length,
//! and produces an IV, ciphertext and authentication tag. Decryption
//! authenticates before it releases anything: for the composite CBC+HMAC
//! construction the tag comparison runs in constant time *before* the block
//! cipher touches the ciphertext, so padding problems can never be observed
//! separately from MAC failures.
//!
//! [RFC7518]: https://tools.ietf.org/html/rfc7518

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes_gcm::aead::consts::{U12, U16};
use aes_gcm::aead::KeyInit;
use aes_gcm::{AeadCore, AeadInPlace, Aes128Gcm, Aes256Gcm, Nonce, Tag};
use digest::core_api::BlockSizeUser;
use digest::Digest;
use hmac::{Mac, SimpleHmac};
use rand_core::CryptoRngCore;
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

use super::ContentEncryptionAlgorithm;
use crate::error::Error;

/// AES-192-GCM has no ready-made alias in `aes_gcm`; build it the same way
/// the crate builds `Aes128Gcm`/`Aes256Gcm`.
type Aes192Gcm = aes_gcm::AesGcm<aes::Aes192, U12>;

/// The three outputs of AEAD encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedContent {
    /// The initialization vector, of the algorithm's fixed length.
    pub iv: Vec<u8>,
    /// The ciphertext.
    pub ciphertext: Vec<u8>,
    /// The authentication tag.
    pub tag: Vec<u8>,
}

impl ContentEncryptionAlgorithm {
    /// AEAD-encrypt `plaintext` under `cek`, authenticating `aad`.
    ///
    /// A caller-supplied IV is honored for reproducing test vectors; it must
    /// be exactly [`iv_len`](ContentEncryptionAlgorithm::iv_len) octets.
    /// Otherwise a fresh IV is drawn from `rng`.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        aad: &[u8],
        cek: &[u8],
        iv_override: Option<&[u8]>,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<EncryptedContent, Error> {
        self.check_cek(cek)?;
        let iv = match iv_override {
            Some(iv) if iv.len() == self.iv_len() => iv.to_vec(),
            Some(iv) => {
                return Err(Error::Jose(format!(
                    "{} requires a {} octet IV, got {}",
                    self.name(),
                    self.iv_len(),
                    iv.len()
                )))
            }
            None => {
                let mut iv = vec![0u8; self.iv_len()];
                rng.fill_bytes(&mut iv);
                iv
            }
        };

        let (ciphertext, tag) = match self {
            ContentEncryptionAlgorithm::A128CbcHs256 => {
                cbc_hmac_encrypt::<aes::Aes128, Sha256>(plaintext, aad, cek, &iv, self.tag_len())?
            }
            ContentEncryptionAlgorithm::A192CbcHs384 => {
                cbc_hmac_encrypt::<aes::Aes192, Sha384>(plaintext, aad, cek, &iv, self.tag_len())?
            }
            ContentEncryptionAlgorithm::A256CbcHs512 => {
                cbc_hmac_encrypt::<aes::Aes256, Sha512>(plaintext, aad, cek, &iv, self.tag_len())?
            }
            ContentEncryptionAlgorithm::A128Gcm => gcm_encrypt::<Aes128Gcm>(plaintext, aad, cek, &iv)?,
            ContentEncryptionAlgorithm::A192Gcm => gcm_encrypt::<Aes192Gcm>(plaintext, aad, cek, &iv)?,
            ContentEncryptionAlgorithm::A256Gcm => gcm_encrypt::<Aes256Gcm>(plaintext, aad, cek, &iv)?,
        };

        Ok(EncryptedContent {
            iv,
            ciphertext,
            tag,
        })
    }

    /// Authenticate and decrypt. Any failure, tag, padding or otherwise,
    /// surfaces as [`Error::IntegrityFailure`] and releases no plaintext.
    pub fn decrypt(
        &self,
        iv: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
        aad: &[u8],
        cek: &[u8],
    ) -> Result<Vec<u8>, Error> {
        self.check_cek(cek)?;
        if iv.len() != self.iv_len() {
            return Err(Error::IntegrityFailure);
        }
        match self {
            ContentEncryptionAlgorithm::A128CbcHs256 => {
                cbc_hmac_decrypt::<aes::Aes128, Sha256>(iv, ciphertext, tag, aad, cek, self.tag_len())
            }
            ContentEncryptionAlgorithm::A192CbcHs384 => {
                cbc_hmac_decrypt::<aes::Aes192, Sha384>(iv, ciphertext, tag, aad, cek, self.tag_len())
            }
            ContentEncryptionAlgorithm::A256CbcHs512 => {
                cbc_hmac_decrypt::<aes::Aes256, Sha512>(iv, ciphertext, tag, aad, cek, self.tag_len())
            }
            ContentEncryptionAlgorithm::A128Gcm => gcm_decrypt::<Aes128Gcm>(iv, ciphertext, tag, aad, cek),
            ContentEncryptionAlgorithm::A192Gcm => gcm_decrypt::<Aes192Gcm>(iv, ciphertext, tag, aad, cek),
            ContentEncryptionAlgorithm::A256Gcm => gcm_decrypt::<Aes256Gcm>(iv, ciphertext, tag, aad, cek),
        }
    }

    fn check_cek(&self, cek: &[u8]) -> Result<(), Error> {
        if cek.len() != self.cek_len() {
            return Err(Error::InvalidKey(format!(
                "{} requires a {} octet content encryption key, got {}",
                self.name(),
                self.cek_len(),
                cek.len()
            )));
        }
        Ok(())
    }
}

/// Raw AES-GCM with the variant selected by key length, shared with
/// AES-GCM-KW key wrapping.
pub(crate) fn gcm_encrypt_raw(
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), Error> {
    match key.len() {
        16 => gcm_encrypt::<Aes128Gcm>(plaintext, aad, key, iv),
        24 => gcm_encrypt::<Aes192Gcm>(plaintext, aad, key, iv),
        32 => gcm_encrypt::<Aes256Gcm>(plaintext, aad, key, iv),
        other => Err(Error::InvalidKey(format!(
            "{other} octets is not an AES key size"
        ))),
    }
}

/// The decryption twin of [`gcm_encrypt_raw`].
pub(crate) fn gcm_decrypt_raw(
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, Error> {
    match key.len() {
        16 => gcm_decrypt::<Aes128Gcm>(iv, ciphertext, tag, aad, key),
        24 => gcm_decrypt::<Aes192Gcm>(iv, ciphertext, tag, aad, key),
        32 => gcm_decrypt::<Aes256Gcm>(iv, ciphertext, tag, aad, key),
        other => Err(Error::InvalidKey(format!(
            "{other} octets is not an AES key size"
        ))),
    }
}

// AL is the bit length of the AAD as a 64-bit big-endian integer, the final
// component of the authenticated input in RFC 7518 section 5.2.2.1.
fn cbc_hmac_tag<D>(mac_key: &[u8], aad: &[u8], iv: &[u8], ciphertext: &[u8], tag_len: usize) -> Vec<u8>
where
    D: Digest + BlockSizeUser,
{
    let al = (aad.len() as u64 * 8).to_be_bytes();
    let mut mac = <SimpleHmac<D> as Mac>::new_from_slice(mac_key)
        .expect("HMAC accepts any key length");
    mac.update(aad);
    mac.update(iv);
    mac.update(ciphertext);
    mac.update(&al);
    let mut tag = mac.finalize().into_bytes().to_vec();
    tag.truncate(tag_len);
    tag
}

fn cbc_hmac_encrypt<Aes, D>(
    plaintext: &[u8],
    aad: &[u8],
    cek: &[u8],
    iv: &[u8],
    tag_len: usize,
) -> Result<(Vec<u8>, Vec<u8>), Error>
where
    Aes: aes::cipher::BlockCipher + aes::cipher::BlockEncrypt + aes::cipher::KeyInit,
    D: Digest + BlockSizeUser,
{
    let (mac_key, enc_key) = cek.split_at(cek.len() / 2);
    let encryptor = cbc::Encryptor::<Aes>::new_from_slices(enc_key, iv)
        .map_err(|_| Error::InvalidKey("content encryption key has the wrong length".into()))?;
    let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    let tag = cbc_hmac_tag::<D>(mac_key, aad, iv, &ciphertext, tag_len);
    Ok((ciphertext, tag))
}

fn cbc_hmac_decrypt<Aes, D>(
    iv: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    aad: &[u8],
    cek: &[u8],
    tag_len: usize,
) -> Result<Vec<u8>, Error>
where
    Aes: aes::cipher::BlockCipher + aes::cipher::BlockDecrypt + aes::cipher::KeyInit,
    D: Digest + BlockSizeUser,
{
    let (mac_key, enc_key) = cek.split_at(cek.len() / 2);

    let expected = cbc_hmac_tag::<D>(mac_key, aad, iv, ciphertext, tag_len);
    if !bool::from(expected.ct_eq(tag)) {
        return Err(Error::IntegrityFailure);
    }

    let decryptor = cbc::Decryptor::<Aes>::new_from_slices(enc_key, iv)
        .map_err(|_| Error::IntegrityFailure)?;
    decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| Error::IntegrityFailure)
}

fn gcm_encrypt<A>(
    plaintext: &[u8],
    aad: &[u8],
    cek: &[u8],
    iv: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), Error>
where
    A: AeadInPlace + KeyInit + AeadCore<NonceSize = U12, TagSize = U16>,
{
    let cipher = A::new_from_slice(cek)
        .map_err(|_| Error::InvalidKey("content encryption key has the wrong length".into()))?;
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(iv), aad, &mut buffer)
        .map_err(|_| Error::Jose("AES-GCM encryption failed".into()))?;
    Ok((buffer, tag.to_vec()))
}

fn gcm_decrypt<A>(
    iv: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    aad: &[u8],
    cek: &[u8],
) -> Result<Vec<u8>, Error>
where
    A: AeadInPlace + KeyInit + AeadCore<NonceSize = U12, TagSize = U16>,
{
    if tag.len() != 16 {
        return Err(Error::IntegrityFailure);
    }
    let cipher = A::new_from_slice(cek)
        .map_err(|_| Error::InvalidKey("content encryption key has the wrong length".into()))?;
    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(Nonce::from_slice(iv), aad, &mut buffer, Tag::from_slice(tag))
        .map_err(|_| Error::IntegrityFailure)?;
    Ok(buffer)
}
