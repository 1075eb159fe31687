//! PBES2 password-based key management (RFC 7518 section 4.8).
//!
//! PBKDF2 with the HMAC named by the algorithm derives an AES key wrap key
//! from the password. The PBKDF2 salt is `alg-identifier || 0x00 || p2s`,
//! binding derived keys to the exact algorithm so a key derived for one
//! PBES2 variant can never unwrap another's output.
//!
//! The iteration count is attacker-controlled on the consuming side, so it
//! is capped; without the cap a single hostile token dictates an unbounded
//! amount of CPU work.

use pbkdf2::pbkdf2_hmac;
use rand_core::CryptoRngCore;
use sha2::{Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

use crate::base64;
use crate::error::Error;
use crate::headers::{names, Headers};
use crate::jwa::KeyManagementAlgorithm;
use crate::jwk::key::PasswordKey;

/// Iteration count written into `p2c` when the producer does not choose one.
pub const DEFAULT_PBES2_ITERATION_COUNT: i64 = 65_536;

/// Salt length generated into `p2s` when the producer does not supply one.
pub const DEFAULT_PBES2_SALT_LEN: usize = 12;

/// Ceiling on `p2c` accepted from inbound headers.
pub const MAX_PBES2_ITERATION_COUNT: i64 = 2_499_999;

const MIN_ITERATION_COUNT: i64 = 1000;
const MIN_SALT_LEN: usize = 8;

pub(super) fn derive_for_encrypt(
    alg: &KeyManagementAlgorithm,
    password: &PasswordKey,
    headers: &mut Headers,
    rng: &mut dyn CryptoRngCore,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let iteration_count = match headers.long_value(names::PBES2_ITERATION_COUNT)? {
        Some(count) => count,
        None => {
            headers.set_long_value(names::PBES2_ITERATION_COUNT, DEFAULT_PBES2_ITERATION_COUNT);
            DEFAULT_PBES2_ITERATION_COUNT
        }
    };
    if iteration_count < MIN_ITERATION_COUNT {
        return Err(Error::Jose(format!(
            "PBES2 iteration count {iteration_count} is below the minimum of {MIN_ITERATION_COUNT}"
        )));
    }

    let salt_input = match headers.string_value(names::PBES2_SALT_INPUT) {
        Some(salt) => base64::decode(salt)?,
        None => {
            let mut salt = vec![0u8; DEFAULT_PBES2_SALT_LEN];
            rng.fill_bytes(&mut salt);
            headers.set_string_value(names::PBES2_SALT_INPUT, &base64::encode(&salt));
            salt
        }
    };
    if salt_input.len() < MIN_SALT_LEN {
        return Err(Error::Jose(format!(
            "a p2s salt input of {MIN_SALT_LEN} or more octets must be used"
        )));
    }

    derive(alg, password, iteration_count, &salt_input)
}

pub(super) fn derive_for_decrypt(
    alg: &KeyManagementAlgorithm,
    password: &PasswordKey,
    headers: &Headers,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let iteration_count = headers
        .long_value(names::PBES2_ITERATION_COUNT)?
        .ok_or_else(|| Error::Jose("p2c header is required for PBES2".into()))?;
    if iteration_count > MAX_PBES2_ITERATION_COUNT {
        return Err(Error::Jose(format!(
            "PBES2 iteration count {iteration_count} exceeds the {MAX_PBES2_ITERATION_COUNT} \
             ceiling for inbound work"
        )));
    }
    if iteration_count < 1 {
        return Err(Error::Jose("PBES2 iteration count must be positive".into()));
    }

    let salt_input = headers
        .string_value(names::PBES2_SALT_INPUT)
        .ok_or_else(|| Error::Jose("p2s header is required for PBES2".into()))?;
    let salt_input = base64::decode(salt_input)?;

    derive(alg, password, iteration_count, &salt_input)
}

fn derive(
    alg: &KeyManagementAlgorithm,
    password: &PasswordKey,
    iteration_count: i64,
    salt_input: &[u8],
) -> Result<Zeroizing<Vec<u8>>, Error> {
    // salt = UTF8(alg) || 0x00 || p2s
    let mut salt = alg.name().as_bytes().to_vec();
    salt.push(0);
    salt.extend_from_slice(salt_input);

    let mut derived = Zeroizing::new(vec![0u8; alg.kek_len()]);
    let rounds = iteration_count as u32;
    match alg {
        KeyManagementAlgorithm::Pbes2Hs256A128Kw => {
            pbkdf2_hmac::<Sha256>(password.value(), &salt, rounds, &mut derived)
        }
        KeyManagementAlgorithm::Pbes2Hs384A192Kw => {
            pbkdf2_hmac::<Sha384>(password.value(), &salt, rounds, &mut derived)
        }
        KeyManagementAlgorithm::Pbes2Hs512A256Kw => {
            pbkdf2_hmac::<Sha512>(password.value(), &salt, rounds, &mut derived)
        }
        other => {
            return Err(Error::Jose(format!(
                "{} is not a PBES2 algorithm",
                other.name()
            )))
        }
    }
    Ok(derived)
}

#[cfg(test)]
mod test {
    use rand_core::OsRng;

    use super::*;

    #[test]
    fn rfc7517_appendix_c_derived_key() {
        // PBKDF2 inputs and derived key from RFC 7517 Appendix C.4, used by
        // the PBES2-HS256+A128KW example.
        let mut headers = Headers::new();
        headers.set_long_value("p2c", 4096);
        headers.set_string_value("p2s", "2WCTcJZ1Rvd_CJuJripQ1w");

        let password = PasswordKey::new("Thus from my lips, by yours, my sin is purged.");
        let derived = derive_for_decrypt(
            &KeyManagementAlgorithm::Pbes2Hs256A128Kw,
            &password,
            &headers,
        )
        .unwrap();

        assert_eq!(
            &derived[..],
            &[
                110, 171, 169, 92, 129, 92, 109, 117, 233, 242, 116, 233, 170, 14, 24, 75
            ]
        );
    }

    #[test]
    fn defaults_are_written_into_headers() {
        let mut headers = Headers::new();
        let password = PasswordKey::new("a modest password");
        derive_for_encrypt(
            &KeyManagementAlgorithm::Pbes2Hs512A256Kw,
            &password,
            &mut headers,
            &mut OsRng,
        )
        .unwrap();

        assert_eq!(
            headers.long_value("p2c").unwrap(),
            Some(DEFAULT_PBES2_ITERATION_COUNT)
        );
        let salt = crate::base64::decode(headers.string_value("p2s").unwrap()).unwrap();
        assert_eq!(salt.len(), DEFAULT_PBES2_SALT_LEN);
    }

    #[test]
    fn low_iteration_count_rejected_on_encrypt() {
        let mut headers = Headers::new();
        headers.set_long_value("p2c", 999);
        let password = PasswordKey::new("pw");
        assert!(derive_for_encrypt(
            &KeyManagementAlgorithm::Pbes2Hs256A128Kw,
            &password,
            &mut headers,
            &mut OsRng,
        )
        .is_err());
    }

    #[test]
    fn short_salt_rejected_on_encrypt() {
        let mut headers = Headers::new();
        headers.set_string_value("p2s", &crate::base64::encode(&[1u8; 7]));
        let password = PasswordKey::new("pw");
        assert!(derive_for_encrypt(
            &KeyManagementAlgorithm::Pbes2Hs256A128Kw,
            &password,
            &mut headers,
            &mut OsRng,
        )
        .is_err());
    }

    #[test]
    fn oversized_iteration_count_rejected_on_decrypt() {
        let mut headers = Headers::new();
        headers.set_long_value("p2c", MAX_PBES2_ITERATION_COUNT + 1);
        headers.set_string_value("p2s", "2WCTcJZ1Rvd_CJuJripQ1w");
        let password = PasswordKey::new("pw");
        assert!(derive_for_decrypt(
            &KeyManagementAlgorithm::Pbes2Hs256A128Kw,
            &password,
            &headers,
        )
        .is_err());
    }
}
