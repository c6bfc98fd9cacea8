//! secp256k1 base field Fp arithmetic.
//!
//! p = 2^256 - 2^32 - 977, a low-weight Solinas form. Elements are stored as
//! four 64-bit little-endian limbs, always kept fully reduced (< p).

use crate::error::Error;
use std::cmp::Ordering;

/// p in little-endian 64-bit limbs.
pub const P: [u64; 4] = [
    0xFFFFFFFEFFFFFC2F,
    0xFFFFFFFFFFFFFFFF,
    0xFFFFFFFFFFFFFFFF,
    0xFFFFFFFFFFFFFFFF,
];

/// c = 2^256 mod p = 2^32 + 977, the Solinas reduction constant.
const C: u64 = 0x1000003D1;

/// An element of Fp, always held in canonical (fully reduced) form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldElement {
    pub limbs: [u64; 4],
}

impl FieldElement {
    pub const ZERO: Self = Self { limbs: [0, 0, 0, 0] };
    pub const ONE: Self = Self { limbs: [1, 0, 0, 0] };

    pub const fn from_u64(v: u64) -> Self {
        Self { limbs: [v, 0, 0, 0] }
    }

    pub const fn from_limbs(limbs: [u64; 4]) -> Self {
        Self { limbs }
    }

    /// Builds an element from 32 big-endian bytes, reducing mod p if needed.
    pub fn from_bytes_be(bytes: &[u8; 32]) -> Self {
        let limbs = crate::u256::from_be_bytes(bytes);
        let fe = Self { limbs };
        if cmp_limbs(&fe.limbs, &P) != Ordering::Less {
            fe.sub_p()
        } else {
            fe
        }
    }

    pub fn to_bytes_be(&self) -> [u8; 32] {
        crate::u256::to_be_bytes(&self.limbs)
    }

    pub fn is_zero(&self) -> bool {
        self.limbs.iter().all(|&w| w == 0)
    }

    pub fn is_odd(&self) -> bool {
        self.limbs[0] & 1 == 1
    }

    pub fn cmp(&self, other: &Self) -> Ordering {
        cmp_limbs(&self.limbs, &other.limbs)
    }

    pub fn add(&self, other: &Self) -> Self {
        let mut out = [0u64; 4];
        let mut carry: u128 = 0;
        for i in 0..4 {
            let sum = self.limbs[i] as u128 + other.limbs[i] as u128 + carry;
            out[i] = sum as u64;
            carry = sum >> 64;
        }
        let result = Self { limbs: out };
        if carry != 0 || cmp_limbs(&result.limbs, &P) != Ordering::Less {
            result.sub_p()
        } else {
            result
        }
    }

    pub fn sub(&self, other: &Self) -> Self {
        let mut out = [0u64; 4];
        let mut borrow: i128 = 0;
        for i in 0..4 {
            let diff = self.limbs[i] as i128 - other.limbs[i] as i128 - borrow;
            if diff < 0 {
                out[i] = (diff + (1i128 << 64)) as u64;
                borrow = 1;
            } else {
                out[i] = diff as u64;
                borrow = 0;
            }
        }
        let result = Self { limbs: out };
        if borrow != 0 {
            result.add_p()
        } else {
            result
        }
    }

    pub fn neg(&self) -> Self {
        if self.is_zero() {
            *self
        } else {
            Self { limbs: P }.sub(self)
        }
    }

    pub fn mul(&self, other: &Self) -> Self {
        let wide = mul_wide(&self.limbs, &other.limbs);
        reduce_wide(&wide)
    }

    pub fn sqr(&self) -> Self {
        self.mul(self)
    }

    /// Multiplies by a small (u64) scalar — used by point doubling (factor 3, 8).
    pub fn mul_small(&self, m: u64) -> Self {
        let mut wide = [0u64; 5];
        let mut carry: u128 = 0;
        for i in 0..4 {
            let p = self.limbs[i] as u128 * m as u128 + carry;
            wide[i] = p as u64;
            carry = p >> 64;
        }
        wide[4] = carry as u64;
        reduce_wide5(&wide)
    }

    /// Modular inverse via Fermat's little theorem (self^(p-2)).
    pub fn inv(&self) -> Result<Self, Error> {
        if self.is_zero() {
            return Err(Error::Domain("field inverse of zero".into()));
        }
        let mut exponent = P;
        // p - 2
        let (e, _) = crate::u256::sub(&exponent, &[2, 0, 0, 0]);
        exponent = e;

        let mut result = Self::ONE;
        let mut base = *self;
        for word in exponent {
            let mut w = word;
            for _ in 0..64 {
                if w & 1 == 1 {
                    result = result.mul(&base);
                }
                base = base.sqr();
                w >>= 1;
            }
        }
        Ok(result)
    }

    fn sub_p(&self) -> Self {
        let (out, _) = crate::u256::sub(&self.limbs, &P);
        Self { limbs: out }
    }

    fn add_p(&self) -> Self {
        let (out, _) = crate::u256::add(&self.limbs, &P);
        Self { limbs: out }
    }
}

fn cmp_limbs(a: &[u64; 4], b: &[u64; 4]) -> Ordering {
    for i in (0..4).rev() {
        match a[i].cmp(&b[i]) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn mul_wide(a: &[u64; 4], b: &[u64; 4]) -> [u64; 8] {
    let mut out = [0u64; 8];
    for i in 0..4 {
        let mut carry: u128 = 0;
        for j in 0..4 {
            let p = a[i] as u128 * b[j] as u128 + out[i + j] as u128 + carry;
            out[i + j] = p as u64;
            carry = p >> 64;
        }
        out[i + 4] = carry as u64;
    }
    out
}

/// Solinas reduction of an 8-limb (512-bit) product mod p.
///
/// 2^256 ≡ C (mod p), so folding the high half in by a factor of C converges
/// to a 4-limb value in a small, bounded number of rounds.
fn reduce_wide(wide: &[u64; 8]) -> FieldElement {
    let mut v: Vec<u64> = wide.to_vec();
    fold_and_finish(&mut v)
}

fn reduce_wide5(wide: &[u64; 5]) -> FieldElement {
    let mut v: Vec<u64> = wide.to_vec();
    fold_and_finish(&mut v)
}

fn fold_and_finish(v: &mut Vec<u64>) -> FieldElement {
    while v.len() > 4 {
        let hi = v.split_off(4);
        let scaled = mul_scalar(&hi, C);
        add_into(v, &scaled);
    }
    while v.len() < 4 {
        v.push(0);
    }
    let mut limbs = [0u64; 4];
    limbs.copy_from_slice(&v[0..4]);
    let mut fe = FieldElement { limbs };
    while cmp_limbs(&fe.limbs, &P) != Ordering::Less {
        fe = fe.sub_p();
    }
    fe
}

fn mul_scalar(limbs: &[u64], m: u64) -> Vec<u64> {
    let mut out = Vec::with_capacity(limbs.len() + 1);
    let mut carry: u128 = 0;
    for &l in limbs {
        let p = l as u128 * m as u128 + carry;
        out.push(p as u64);
        carry = p >> 64;
    }
    if carry > 0 {
        out.push(carry as u64);
    }
    out
}

fn add_into(a: &mut Vec<u64>, b: &[u64]) {
    let mut carry: u128 = 0;
    let n = a.len().max(b.len());
    for i in 0..n {
        let av = *a.get(i).unwrap_or(&0) as u128;
        let bv = *b.get(i).unwrap_or(&0) as u128;
        let sum = av + bv + carry;
        if i < a.len() {
            a[i] = sum as u64;
        } else {
            a.push(sum as u64);
        }
        carry = sum >> 64;
    }
    if carry > 0 {
        a.push(carry as u64);
    }
}

/// Montgomery's trick: inverts `n` elements with a single field inversion
/// plus 3n-3 multiplications instead of n inversions.
pub fn batch_invert(elements: &[FieldElement]) -> Result<Vec<FieldElement>, Error> {
    let n = elements.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    let mut prefix = Vec::with_capacity(n);
    let mut acc = FieldElement::ONE;
    for e in elements {
        if e.is_zero() {
            return Err(Error::Domain("batch inversion of zero element".into()));
        }
        acc = acc.mul(e);
        prefix.push(acc);
    }

    let mut inv_acc = acc.inv()?;
    let mut results = vec![FieldElement::ZERO; n];
    for i in (1..n).rev() {
        results[i] = inv_acc.mul(&prefix[i - 1]);
        inv_acc = inv_acc.mul(&elements[i]);
    }
    results[0] = inv_acc;
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sub_are_inverse() {
        let a = FieldElement::from_u64(123456789);
        let b = FieldElement::from_u64(987654321);
        let sum = a.add(&b);
        assert_eq!(sum.sub(&b), a);
    }

    #[test]
    fn mul_by_one_is_identity() {
        let a = FieldElement::from_u64(42);
        assert_eq!(a.mul(&FieldElement::ONE), a);
    }

    #[test]
    fn inverse_round_trips() {
        let a = FieldElement::from_u64(7);
        let inv = a.inv().unwrap();
        assert_eq!(a.mul(&inv), FieldElement::ONE);
    }

    #[test]
    fn inverse_of_zero_fails() {
        assert!(FieldElement::ZERO.inv().is_err());
    }

    #[test]
    fn batch_invert_matches_individual() {
        let elems: Vec<_> = (1u64..6).map(FieldElement::from_u64).collect();
        let batched = batch_invert(&elems).unwrap();
        for (e, inv) in elems.iter().zip(batched.iter()) {
            assert_eq!(e.mul(inv), FieldElement::ONE);
        }
    }

    #[test]
    fn closure_under_add_and_mul() {
        let a = FieldElement::from_limbs([u64::MAX, u64::MAX, u64::MAX, 0]);
        let b = FieldElement::from_u64(u64::MAX);
        let sum = a.add(&b);
        let prod = a.mul(&b);
        assert_eq!(cmp_limbs(&sum.limbs, &P), Ordering::Less);
        assert_eq!(cmp_limbs(&prod.limbs, &P), Ordering::Less);
    }
}
