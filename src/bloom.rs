//! A bloom filter over 20-byte hash160 values with a fixed, hand-specified
//! 20-probe schedule (not a generic k-hash-function construction) and a
//! small on-disk binary format.

use crate::error::Error;
use crate::hash;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const MAGIC: u32 = 0x4543_4246;
const VERSION: u32 = 1;
const HEADER_LEN: usize = 16;

/// Target false-positive rate used when sizing a filter for `n` items.
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 1e-9;

/// Number of probes per lookup. Fixed by the format, not derived from `n`/`p`.
const PROBES: usize = 20;
const SHIFTS: [u32; 4] = [24, 28, 36, 40];

pub struct BloomFilter {
    /// Size of the bit array in 64-bit words.
    size_words: u64,
    bits: Vec<u64>,
}

impl BloomFilter {
    /// Sizes a new, empty filter for `n` expected items at `p` false-positive
    /// rate: `m = ceil(n * ln(p) / ln(1 / 2^ln2))` bits, rounded up to a
    /// multiple of 64.
    pub fn new(expected_items: u64, false_positive_rate: f64) -> Self {
        let n = expected_items.max(1) as f64;
        let p = if false_positive_rate <= 0.0 { DEFAULT_FALSE_POSITIVE_RATE } else { false_positive_rate };
        let ln_half_ln2 = (1.0 / (2f64.ln() * 2f64.ln())).ln();
        let bits_needed = (n * p.ln() / ln_half_ln2).ceil().max(64.0);
        let words = ((bits_needed as u64) + 63) / 64;
        Self { size_words: words.max(1), bits: vec![0u64; words.max(1) as usize] }
    }

    pub fn size_bits(&self) -> u64 {
        self.size_words * 64
    }

    fn probe_indices(words: &[u32; 5]) -> [u64; PROBES] {
        let a1 = ((words[0] as u64) << 32) | words[1] as u64;
        let a2 = ((words[2] as u64) << 32) | words[3] as u64;
        let a3 = ((words[4] as u64) << 32) | words[0] as u64;
        let a4 = ((words[1] as u64) << 32) | words[2] as u64;
        let a5 = ((words[3] as u64) << 32) | words[4] as u64;

        let mut out = [0u64; PROBES];
        for (group, &s) in SHIFTS.iter().enumerate() {
            out[group * 5] = (a1 << s) | (a2 >> s);
            out[group * 5 + 1] = (a2 << s) | (a3 >> s);
            out[group * 5 + 2] = (a3 << s) | (a4 >> s);
            out[group * 5 + 3] = (a4 << s) | (a5 >> s);
            out[group * 5 + 4] = (a5 << s) | (a1 >> s);
        }
        out
    }

    fn bit_position(&self, index: u64) -> (usize, u64) {
        let bit = index % self.size_bits();
        ((bit / 64) as usize, bit % 64)
    }

    pub fn add(&mut self, hash160: &[u8; 20]) {
        let words = hash::bytes_to_words(hash160);
        for index in Self::probe_indices(&words) {
            let (word, bit) = self.bit_position(index);
            self.bits[word] |= 1u64 << bit;
        }
    }

    /// Scalar reference lookup: checks all 20 probe bits for one hash.
    pub fn has(&self, hash160: &[u8; 20]) -> bool {
        let words = hash::bytes_to_words(hash160);
        Self::probe_indices(&words).iter().all(|&index| {
            let (word, bit) = self.bit_position(index);
            self.bits[word] & (1u64 << bit) != 0
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let mut file = File::create(path)?;
        let mut header = [0u8; HEADER_LEN];
        header[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        header[4..8].copy_from_slice(&VERSION.to_le_bytes());
        header[8..16].copy_from_slice(&self.size_words.to_le_bytes());
        file.write_all(&header)?;
        for word in &self.bits {
            file.write_all(&word.to_le_bytes())?;
        }
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let mut file = File::open(path)?;
        let mut header = [0u8; HEADER_LEN];
        file.read_exact(&mut header)?;

        let magic = u32::from_le_bytes(header[0..4].try_into().unwrap());
        if magic != MAGIC {
            return Err(Error::Format(format!("bad bloom magic: {magic:#010x}")));
        }
        let version = u32::from_le_bytes(header[4..8].try_into().unwrap());
        if version != VERSION {
            return Err(Error::Format(format!("unsupported bloom version: {version}")));
        }
        let size_words = u64::from_le_bytes(header[8..16].try_into().unwrap());

        let mut bits = vec![0u64; size_words as usize];
        let mut buf = vec![0u8; size_words as usize * 8];
        file.read_exact(&mut buf)?;
        for (i, word) in bits.iter_mut().enumerate() {
            *word = u64::from_le_bytes(buf[i * 8..i * 8 + 8].try_into().unwrap());
        }

        Ok(Self { size_words, bits })
    }
}

/// Pluggable membership-query backend, so a future GPU kernel can implement
/// the same batched primitive behind this trait. `BloomFilter` is the only
/// implementation shipped and is authoritative.
pub trait BloomQueryBackend: Send + Sync {
    fn has(&self, hash160: &[u8; 20]) -> bool;

    /// Default batched form loops `has()` per lane; a SIMD backend can
    /// override this to share work across lanes.
    fn has4(&self, hashes: &[[u8; 20]; 4]) -> [bool; 4] {
        let mut out = [false; 4];
        for (o, h) in out.iter_mut().zip(hashes.iter()) {
            *o = self.has(h);
        }
        out
    }

    /// Same portable fallback strategy as `has4`.
    fn has8(&self, hashes: &[[u8; 20]; 8]) -> [bool; 8] {
        let mut out = [false; 8];
        for (o, h) in out.iter_mut().zip(hashes.iter()) {
            *o = self.has(h);
        }
        out
    }
}

impl BloomQueryBackend for BloomFilter {
    fn has(&self, hash160: &[u8; 20]) -> bool {
        BloomFilter::has(self, hash160)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_item_found_and_neighbors_not() {
        let target_hex = "751e76e8199196d454941c45d1b3a323f1433bd6";
        let target: [u8; 20] = hex::decode(target_hex).unwrap().try_into().unwrap();

        let mut filter = BloomFilter::new(1, DEFAULT_FALSE_POSITIVE_RATE);
        filter.add(&target);
        assert!(filter.has(&target));

        for bit in 0..20u32 * 8 {
            let mut flipped = target;
            flipped[(bit / 8) as usize] ^= 1 << (bit % 8);
            assert!(!filter.has(&flipped), "unexpected FOUND for neighbor with bit {bit} flipped");
        }
    }

    #[test]
    fn false_negative_free_for_inserted_items() {
        let mut filter = BloomFilter::new(2000, 1e-4);
        let mut inserted = Vec::new();
        for i in 0u32..2000 {
            let mut h = [0u8; 20];
            h[0..4].copy_from_slice(&i.to_be_bytes());
            filter.add(&h);
            inserted.push(h);
        }
        for h in &inserted {
            assert!(filter.has(h));
        }
    }

    #[test]
    fn persistence_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filter.blf");

        let mut filter = BloomFilter::new(500, 1e-6);
        let mut inserted = Vec::new();
        for i in 0u32..500 {
            let mut h = [0u8; 20];
            h[4..8].copy_from_slice(&i.to_be_bytes());
            filter.add(&h);
            inserted.push(h);
        }
        filter.save(&path).unwrap();

        let raw = std::fs::read(&path).unwrap();
        assert_eq!(&raw[0..4], &[0x46, 0x42, 0x43, 0x45]);

        let loaded = BloomFilter::load(&path).unwrap();
        for h in &inserted {
            assert!(loaded.has(h));
        }
    }

    #[test]
    fn load_rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.blf");
        std::fs::write(&path, [0u8; 16]).unwrap();
        assert!(matches!(BloomFilter::load(&path), Err(Error::Format(_))));
    }

    #[test]
    fn has4_and_has8_agree_with_has() {
        let mut filter = BloomFilter::new(10, 1e-6);
        let mut hashes = Vec::new();
        for i in 0u8..8 {
            let mut h = [0u8; 20];
            h[0] = i;
            filter.add(&h);
            hashes.push(h);
        }
        let four: [[u8; 20]; 4] = hashes[0..4].try_into().unwrap();
        let eight: [[u8; 20]; 8] = hashes[0..8].try_into().unwrap();
        assert_eq!(filter.has4(&four), [true; 4]);
        assert_eq!(filter.has8(&eight), [true; 8]);
    }
}
