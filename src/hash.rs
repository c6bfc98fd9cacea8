//! Hash pipeline: SHA-256 -> RIPEMD-160, composed into the Bitcoin-style
//! hash160 identifier of a compressed public key.
//!
//! The actual compression primitives (`sha2`, `ripemd`) are treated as
//! trusted black boxes — this module only owns the composition, the
//! 5x32-bit word view used by the bloom filter's probe schedule, and the
//! batching/backend seam.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// `RIPEMD160(SHA256(data))`.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    let ripe = Ripemd160::digest(sha);
    let mut out = [0u8; 20];
    out.copy_from_slice(&ripe);
    out
}

/// A hash160 as five big-endian 32-bit words, the layout the bloom filter's
/// probe schedule operates on directly.
pub fn hash160_words(data: &[u8]) -> [u32; 5] {
    bytes_to_words(&hash160(data))
}

pub fn bytes_to_words(bytes: &[u8; 20]) -> [u32; 5] {
    let mut words = [0u32; 5];
    for i in 0..5 {
        words[i] = u32::from_be_bytes(bytes[i * 4..i * 4 + 4].try_into().unwrap());
    }
    words
}

pub fn words_to_bytes(words: &[u32; 5]) -> [u8; 20] {
    let mut bytes = [0u8; 20];
    for i in 0..5 {
        bytes[i * 4..i * 4 + 4].copy_from_slice(&words[i].to_be_bytes());
    }
    bytes
}

/// Pluggable hashing backend, so a future GPU implementation can slot in
/// behind the same interface the CPU path uses. The CPU backend is the only
/// one shipped and is authoritative.
pub trait Hash160Backend: Send + Sync {
    fn hash160(&self, compressed_pubkey: &[u8; 33]) -> [u8; 20];

    /// Default batched form processes items independently; a SIMD backend
    /// can override this to share work across lanes.
    fn hash160_batch(&self, compressed_pubkeys: &[[u8; 33]]) -> Vec<[u8; 20]> {
        compressed_pubkeys.iter().map(|pk| self.hash160(pk)).collect()
    }
}

/// The reference (and only shipped) backend: plain `sha2`/`ripemd` calls.
#[derive(Default, Clone, Copy)]
pub struct CpuBackend;

impl Hash160Backend for CpuBackend {
    fn hash160(&self, compressed_pubkey: &[u8; 33]) -> [u8; 20] {
        hash160(compressed_pubkey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Scenario S1: k=1 -> G itself, compressed.
    const S1_PUBKEY_HEX: &str =
        "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
    const S1_HASH160_HEX: &str = "751e76e8199196d454941c45d1b3a323f1433bd6";

    // Scenario S2: k=2.
    const S2_HASH160_HEX: &str = "06afd46bcdfd22ef94ac122aa11f241244a37ecc";

    #[test]
    fn s1_known_vector() {
        let pubkey_bytes = hex::decode(S1_PUBKEY_HEX).unwrap();
        let digest = hash160(&pubkey_bytes);
        assert_eq!(hex::encode(digest), S1_HASH160_HEX);
    }

    #[test]
    fn words_roundtrip_bytes() {
        let bytes: [u8; 20] = [
            0x75, 0x1e, 0x76, 0xe8, 0x19, 0x91, 0x96, 0xd4, 0x54, 0x94, 0x1c, 0x45, 0xd1, 0xb3,
            0xa3, 0x23, 0xf1, 0x43, 0x3b, 0xd6,
        ];
        let words = bytes_to_words(&bytes);
        assert_eq!(words_to_bytes(&words), bytes);
    }

    #[test]
    fn s2_known_vector_end_to_end() {
        let point = crate::curve::point_mul(&[2, 0, 0, 0]).unwrap();
        let compressed = crate::curve::compress(&point).unwrap();
        let digest = hash160(&compressed);
        assert_eq!(hex::encode(digest), S2_HASH160_HEX);
    }
}
