//! secp256k1 group law: y^2 = x^3 + 7 over Fp, affine coordinates only.
//!
//! The point at infinity is kept out of band (`Point::Infinity`) rather than
//! as a flagged affine value, per the data model: affine points never store
//! it directly.

use crate::error::Error;
use crate::field::{self, FieldElement};

/// Curve coefficient b (a = 0 for secp256k1).
const B: FieldElement = FieldElement::from_limbs([7, 0, 0, 0]);

/// A point on the curve in affine form. Never represents infinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AffinePoint {
    pub x: FieldElement,
    pub y: FieldElement,
}

/// A curve point, with infinity represented out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Point {
    Affine(AffinePoint),
    Infinity,
}

impl Point {
    pub fn is_infinity(&self) -> bool {
        matches!(self, Point::Infinity)
    }

    pub fn affine(&self) -> Option<&AffinePoint> {
        match self {
            Point::Affine(p) => Some(p),
            Point::Infinity => None,
        }
    }
}

/// Returns true if (x, y) satisfies the curve equation.
pub fn is_on_curve(p: &AffinePoint) -> bool {
    let lhs = p.y.sqr();
    let rhs = p.x.sqr().mul(&p.x).add(&B);
    lhs == rhs
}

/// General affine point addition. One field inversion when the fast paths
/// (infinity operand, doubling, mutual inverses) don't apply.
pub fn point_add(p: &Point, q: &Point) -> Point {
    let (p, q) = match (p, q) {
        (Point::Infinity, _) => return *q,
        (_, Point::Infinity) => return *p,
        (Point::Affine(p), Point::Affine(q)) => (p, q),
    };

    if p.x == q.x {
        return if p.y == q.y {
            point_double(&Point::Affine(*p))
        } else {
            Point::Infinity
        };
    }

    let denom = q.x.sub(&p.x);
    // denom is provably nonzero here (p.x != q.x was just checked).
    let inv_denom = denom.inv().expect("nonzero denominator in point_add");
    let slope = q.y.sub(&p.y).mul(&inv_denom);
    let x3 = slope.sqr().sub(&p.x).sub(&q.x);
    let y3 = slope.mul(&p.x.sub(&x3)).sub(&p.y);
    Point::Affine(AffinePoint { x: x3, y: y3 })
}

/// Affine point doubling. One field inversion.
pub fn point_double(p: &Point) -> Point {
    let p = match p {
        Point::Infinity => return Point::Infinity,
        Point::Affine(p) => p,
    };
    if p.y.is_zero() {
        return Point::Infinity;
    }

    let two_y = p.y.add(&p.y);
    let inv_two_y = two_y.inv().expect("nonzero y in point_double (y checked above)");
    let three_x_sq = p.x.sqr().mul_small(3);
    let slope = three_x_sq.mul(&inv_two_y);
    let x3 = slope.sqr().sub(&p.x).sub(&p.x);
    let y3 = slope.mul(&p.x.sub(&x3)).sub(&p.y);
    Point::Affine(AffinePoint { x: x3, y: y3 })
}

/// 33-byte SEC1 compressed public key: 0x02/0x03 prefix + big-endian x.
pub fn compress(p: &Point) -> Result<[u8; 33], Error> {
    let p = p.affine().ok_or_else(|| Error::Domain("cannot compress the point at infinity".into()))?;
    let mut out = [0u8; 33];
    out[0] = if p.y.is_odd() { 0x03 } else { 0x02 };
    out[1..].copy_from_slice(&p.x.to_bytes_be());
    Ok(out)
}

/// Extracts the `w`-th 4-bit nibble (window) of a little-endian 256-bit scalar.
/// Window 0 is the low nibble of limb 0, window 63 is the high nibble of limb 3.
fn nibble_at(scalar: &[u64; 4], w: usize) -> u8 {
    let limb = scalar[w / 16];
    let shift = (w % 16) * 4;
    ((limb >> shift) & 0xF) as u8
}

/// `k * G` for a single scalar, via the fixed-base window table.
pub fn point_mul(scalar: &[u64; 4]) -> Result<Point, Error> {
    Ok(point_mul_batch(std::slice::from_ref(scalar))?.remove(0))
}

/// Batched `k_i * G` for many scalars at once.
///
/// Processes all scalars in lockstep, one 4-bit window at a time, and defers
/// the field inversion needed by each window's point addition so that all
/// items needing one at a given step are inverted together via Montgomery's
/// trick instead of one-at-a-time.
pub fn point_mul_batch(scalars: &[[u64; 4]]) -> Result<Vec<Point>, Error> {
    let table = crate::generator_table::table();
    let n = scalars.len();
    let mut acc: Vec<Point> = vec![Point::Infinity; n];

    for w in 0..64 {
        let mut pend_idx = Vec::new();
        let mut pend_denom = Vec::new();
        let mut pend_acc = Vec::new();
        let mut pend_addend = Vec::new();

        for (i, scalar) in scalars.iter().enumerate() {
            let nibble = nibble_at(scalar, w);
            if nibble == 0 {
                continue;
            }
            let addend = table[w][nibble as usize];

            match acc[i] {
                Point::Infinity => acc[i] = Point::Affine(addend),
                Point::Affine(p) => {
                    if p.x == addend.x {
                        acc[i] = if p.y == addend.y {
                            point_double(&Point::Affine(p))
                        } else {
                            Point::Infinity
                        };
                    } else {
                        pend_idx.push(i);
                        pend_denom.push(addend.x.sub(&p.x));
                        pend_acc.push(p);
                        pend_addend.push(addend);
                    }
                }
            }
        }

        if !pend_denom.is_empty() {
            let inverted = field::batch_invert(&pend_denom)?;
            for (k, &i) in pend_idx.iter().enumerate() {
                let p = &pend_acc[k];
                let q = &pend_addend[k];
                let slope = q.y.sub(&p.y).mul(&inverted[k]);
                let x3 = slope.sqr().sub(&p.x).sub(&q.x);
                let y3 = slope.mul(&p.x.sub(&x3)).sub(&p.y);
                acc[i] = Point::Affine(AffinePoint { x: x3, y: y3 });
            }
        }
    }

    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_is_on_curve() {
        let g = crate::generator_table::generator();
        assert!(is_on_curve(&g));
    }

    #[test]
    fn k1_times_g_is_g() {
        let p = point_mul(&[1, 0, 0, 0]).unwrap();
        assert_eq!(p, Point::Affine(crate::generator_table::generator()));
    }

    #[test]
    fn point_plus_its_negation_is_infinity() {
        let g = crate::generator_table::generator();
        let neg_g = AffinePoint { x: g.x, y: g.y.neg() };
        let sum = point_add(&Point::Affine(g), &Point::Affine(neg_g));
        assert!(sum.is_infinity());
    }

    #[test]
    fn batch_matches_single() {
        let scalars: Vec<[u64; 4]> = (1u64..9).map(|k| [k, 0, 0, 0]).collect();
        let batched = point_mul_batch(&scalars).unwrap();
        for (s, p) in scalars.iter().zip(batched.iter()) {
            assert_eq!(*p, point_mul(s).unwrap());
        }
    }
}
