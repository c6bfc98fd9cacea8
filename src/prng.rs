//! 8-lane batched xoshiro256** pseudo-random generator.
//!
//! Each lane is an independent xoshiro256** stream, seeded from a single
//! `u64` via splitmix64 and then staggered by repeated 2^128 jumps so the
//! lanes never overlap within any realistic run length. A thread-local-sized
//! cache batches the 8-wide vector step so scalar consumers (`rand_range`)
//! don't pay a full vector step per draw.

use crate::error::Error;
use crate::u256::Limbs;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::io::Read;

/// The published xoshiro256 jump-ahead constant (2^128 calls). Shared by the
/// `++` and `**` output variants — only the output scrambler differs.
const JUMP: [u64; 4] = [
    0x180e_c6d3_3cfd_0aba,
    0xd5a6_1266_f0c9_392c,
    0xa958_2618_e03f_c9aa,
    0x39ab_dc45_29b1_661c,
];

const CACHE_CAPACITY: usize = 4096;

fn rotl(x: u64, k: u32) -> u64 {
    (x << k) | (x >> (64 - k))
}

fn splitmix64_next(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn seed_lane(seed: u64) -> [u64; 4] {
    let mut sm = seed;
    [
        splitmix64_next(&mut sm),
        splitmix64_next(&mut sm),
        splitmix64_next(&mut sm),
        splitmix64_next(&mut sm),
    ]
}

/// One xoshiro256** step: returns the output word and advances `state`.
fn step(state: &mut [u64; 4]) -> u64 {
    let result = rotl(state[1].wrapping_mul(5), 7).wrapping_mul(9);
    let t = state[1] << 17;
    state[2] ^= state[0];
    state[3] ^= state[1];
    state[1] ^= state[2];
    state[0] ^= state[3];
    state[2] ^= t;
    state[3] = rotl(state[3], 45);
    result
}

fn jump(state: &mut [u64; 4]) {
    let mut accum = [0u64; 4];
    for &j in &JUMP {
        for bit in 0..64 {
            if j & (1u64 << bit) != 0 {
                for i in 0..4 {
                    accum[i] ^= state[i];
                }
            }
            step(state);
        }
    }
    *state = accum;
}

struct Lanes {
    state: [[u64; 4]; 8],
}

impl Lanes {
    fn seed(seed_value: u64) -> Self {
        let mut lane_state = seed_lane(seed_value);
        let mut state = [[0u64; 4]; 8];
        for slot in state.iter_mut() {
            jump(&mut lane_state);
            *slot = lane_state;
        }
        Self { state }
    }

    fn next8(&mut self) -> [u64; 8] {
        let mut out = [0u64; 8];
        for (o, lane) in out.iter_mut().zip(self.state.iter_mut()) {
            *o = step(lane);
        }
        out
    }
}

/// The batched PRNG. Owned exclusively by the scalar producer thread.
pub struct Prng {
    lanes: Lanes,
    cache: VecDeque<u64>,
}

impl Prng {
    pub fn seed(seed_value: u64) -> Self {
        Self { lanes: Lanes::seed(seed_value), cache: VecDeque::with_capacity(CACHE_CAPACITY) }
    }

    /// Seeds from 8 bytes of OS entropy read from `/dev/urandom`.
    pub fn seed_from_urandom() -> Result<Self, Error> {
        let mut buf = [0u8; 8];
        std::fs::File::open("/dev/urandom")?.read_exact(&mut buf)?;
        Ok(Self::seed(u64::from_le_bytes(buf)))
    }

    /// Draws the next 8 words, bypassing the cache — used when callers want
    /// vector-aligned batches directly.
    pub fn next8(&mut self) -> [u64; 8] {
        self.lanes.next8()
    }

    /// Fills `buf` with raw 64-bit words, a whole vector step at a time.
    pub fn fill(&mut self, buf: &mut [u64]) {
        let mut i = 0;
        while i < buf.len() {
            let batch = self.lanes.next8();
            let n = (buf.len() - i).min(8);
            buf[i..i + n].copy_from_slice(&batch[..n]);
            i += n;
        }
    }

    fn refill_cache(&mut self) {
        while self.cache.len() + 8 <= CACHE_CAPACITY {
            for w in self.lanes.next8() {
                self.cache.push_back(w);
            }
        }
    }

    fn next_u64(&mut self) -> u64 {
        if self.cache.is_empty() {
            self.refill_cache();
        }
        self.cache.pop_front().unwrap_or_else(|| self.lanes.next8()[0])
    }

    fn next_u256(&mut self) -> Limbs {
        [self.next_u64(), self.next_u64(), self.next_u64(), self.next_u64()]
    }

    /// Uniform random scalar in `[lo, hi]` inclusive, via rejection sampling:
    /// draw a candidate masked down to `bitlen(hi - lo + 1)` bits, retry if
    /// it lands `>= range`. Expected fewer than 2 retries per draw.
    ///
    /// `lo`/`hi` are private-scalar bounds (always `< n`), so the span and
    /// final offset are computed with the mod-n helpers rather than raw
    /// `u256` arithmetic.
    pub fn rand_range(&mut self, lo: &Limbs, hi: &Limbs) -> Limbs {
        let span = crate::scalar::modn_sub(hi, lo);
        let (range, _) = crate::u256::add_u64(&span, 1);
        let bits = crate::u256::bitlen(&range);

        loop {
            let candidate = crate::u256::mask_bits(&self.next_u256(), bits);
            if crate::u256::cmp(&candidate, &range) == Ordering::Less {
                return crate::scalar::modn_add(&candidate, lo);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urandom_seeding_does_not_panic() {
        assert!(Prng::seed_from_urandom().is_ok());
    }

    #[test]
    fn same_seed_same_stream() {
        // S5's literal reference vector can't be derived without running this
        // code, so determinism is the property we can actually assert here.
        let mut a = Prng::seed(1);
        let mut b = Prng::seed(1);
        assert_eq!(a.next8(), b.next8());
        assert_eq!(a.next8(), b.next8());
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = Prng::seed(1);
        let mut b = Prng::seed(2);
        assert_ne!(a.next8(), b.next8());
    }

    #[test]
    fn rand_range_stays_in_bounds() {
        let mut prng = Prng::seed(42);
        let lo = [1u64, 0, 0, 0];
        let hi = [1000u64, 0, 0, 0];
        for _ in 0..2000 {
            let v = prng.rand_range(&lo, &hi);
            assert_eq!(v[1], 0);
            assert_eq!(v[2], 0);
            assert_eq!(v[3], 0);
            assert!(v[0] >= 1 && v[0] <= 1000);
        }
    }

    #[test]
    fn rand_range_distribution_is_roughly_uniform() {
        let mut prng = Prng::seed(7);
        let lo = [0u64, 0, 0, 0];
        let hi = [9u64, 0, 0, 0];
        let mut buckets = [0u32; 10];
        let trials = 20_000;
        for _ in 0..trials {
            let v = prng.rand_range(&lo, &hi);
            buckets[v[0] as usize] += 1;
        }
        let expected = trials as f64 / 10.0;
        let variance: f64 = buckets.iter().map(|&c| (c as f64 - expected).powi(2)).sum::<f64>() / 10.0;
        let stddev = variance.sqrt();
        // four-sigma band around the expected count per bucket.
        for &c in &buckets {
            assert!((c as f64 - expected).abs() < 4.0 * stddev.max(1.0) + expected.sqrt() * 4.0);
        }
    }
}
