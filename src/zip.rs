//! JWE plaintext compression (`zip: "DEF"`, RFC 1951 DEFLATE).
//!
//! Decompression is bounded. Compressed input is attacker-sized after tag
//! verification only in principle; a hostile producer with a valid key can
//! still ship a bomb, so expansion stops at a configurable ceiling and fails
//! with [`Error::DecompressionTooLarge`].

use std::io::Read;

use flate2::read::{DeflateDecoder, DeflateEncoder};
use flate2::Compression;

use crate::error::Error;

/// Default ceiling on decompressed plaintext size: 10 MiB.
pub const DEFAULT_MAX_DECOMPRESSED_LEN: usize = 10 * 1024 * 1024;

/// DEFLATE-compress plaintext before encryption.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut encoder = DeflateEncoder::new(data, Compression::default());
    let mut out = Vec::new();
    encoder
        .read_to_end(&mut out)
        .map_err(|err| Error::Jose(format!("compression failed: {err}")))?;
    Ok(out)
}

/// Inflate decrypted content, refusing to produce more than `max_len` bytes.
pub fn decompress(data: &[u8], max_len: usize) -> Result<Vec<u8>, Error> {
    let decoder = DeflateDecoder::new(data);
    let mut out = Vec::new();
    // Read one byte past the ceiling so overflow is detectable.
    let mut bounded = decoder.take(max_len as u64 + 1);
    bounded
        .read_to_end(&mut out)
        .map_err(|_| Error::MalformedEncoding("invalid DEFLATE content".into()))?;
    if out.len() > max_len {
        return Err(Error::DecompressionTooLarge(max_len));
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip() {
        let data = b"Lorem ipsum dolor sit amet, consectetur adipiscing elit. \
Lorem ipsum dolor sit amet, consectetur adipiscing elit.";
        let compressed = compress(data).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(
            decompress(&compressed, DEFAULT_MAX_DECOMPRESSED_LEN).unwrap(),
            data
        );
    }

    #[test]
    fn expansion_ceiling_is_enforced() {
        // 1 MiB of zeros compresses to almost nothing; inflating it under a
        // small ceiling must fail rather than allocate.
        let bomb = compress(&vec![0u8; 1024 * 1024]).unwrap();
        assert!(bomb.len() < 4096);
        assert!(matches!(
            decompress(&bomb, 64 * 1024),
            Err(Error::DecompressionTooLarge(_))
        ));
    }

    #[test]
    fn exact_ceiling_is_allowed() {
        let data = vec![7u8; 1000];
        let compressed = compress(&data).unwrap();
        assert_eq!(decompress(&compressed, 1000).unwrap(), data);
        assert!(decompress(&compressed, 999).is_err());
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            decompress(&[0xde, 0xad, 0xbe, 0xef], 1024),
            Err(Error::MalformedEncoding(_))
        ));
    }
}
