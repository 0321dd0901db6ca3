//! Word-sized modular arithmetic shared by the prime search and the RNS layer.
//!
//! All moduli are odd primes below `2^62`, so sums of two reduced residues
//! never overflow a `u64` and products fit in a `u128`.

#[inline]
pub fn add_mod(a: u64, b: u64, modulus: u64) -> u64 {
    let sum = a + b;
    if sum >= modulus { sum - modulus } else { sum }
}

#[inline]
pub fn sub_mod(a: u64, b: u64, modulus: u64) -> u64 {
    if a >= b { a - b } else { a + modulus - b }
}

#[inline]
pub fn neg_mod(a: u64, modulus: u64) -> u64 {
    if a == 0 { 0 } else { modulus - a }
}

/// Computes `(a * b) mod modulus` using `u128` intermediate arithmetic.
#[inline]
pub fn mul_mod(a: u64, b: u64, modulus: u64) -> u64 {
    ((a as u128 * b as u128) % modulus as u128) as u64
}

/// Computes `base^exp mod modulus` via binary exponentiation.
pub fn pow_mod(mut base: u64, mut exp: u64, modulus: u64) -> u64 {
    assert!(modulus > 0, "pow_mod: modulus must be positive");
    if modulus == 1 {
        return 0;
    }
    let mut acc = 1u64;
    base %= modulus;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = mul_mod(acc, base, modulus);
        }
        base = mul_mod(base, base, modulus);
        exp >>= 1;
    }
    acc
}

/// Multiplicative inverse via the extended Euclidean algorithm.
///
/// Returns `None` when `value` and `modulus` are not coprime.
pub fn inv_mod(value: u64, modulus: u64) -> Option<u64> {
    let (mut old_r, mut r) = (value as i128 % modulus as i128, modulus as i128);
    let (mut old_s, mut s) = (1i128, 0i128);
    while r != 0 {
        let quotient = old_r / r;
        (old_r, r) = (r, old_r - quotient * r);
        (old_s, s) = (s, old_s - quotient * s);
    }
    if old_r != 1 {
        return None;
    }
    Some(old_s.rem_euclid(modulus as i128) as u64)
}

/// Reduces a signed integer into `[0, modulus)`.
#[inline]
pub fn reduce_signed(value: i64, modulus: u64) -> u64 {
    (value as i128).rem_euclid(modulus as i128) as u64
}

/// Maps a residue in `[0, modulus)` to its centered representative in
/// `(-modulus/2, modulus/2]`.
#[inline]
pub fn center(value: u64, modulus: u64) -> i64 {
    if value > modulus / 2 {
        -((modulus - value) as i64)
    } else {
        value as i64
    }
}

/// Precomputed Shoup quotient `floor(w * 2^64 / q)` for a fixed operand `w`.
#[inline]
pub fn shoup_precompute(w: u64, modulus: u64) -> u64 {
    (((w as u128) << 64) / modulus as u128) as u64
}

/// Computes `a * w mod q` given `w_shoup = shoup_precompute(w, q)`.
///
/// Requires `a < q`; the result is fully reduced.
#[inline]
pub fn mul_shoup(a: u64, w: u64, w_shoup: u64, modulus: u64) -> u64 {
    let hi = ((a as u128 * w_shoup as u128) >> 64) as u64;
    let r = a.wrapping_mul(w).wrapping_sub(hi.wrapping_mul(modulus));
    if r >= modulus { r - modulus } else { r }
}

#[cfg(test)]
mod tests {
    use super::*;

    const Q: u64 = 1_152_921_504_606_584_833; // 2^60 - 2^18 + 1

    #[test]
    fn add_and_sub_wrap_around_the_modulus() {
        assert_eq!(add_mod(Q - 1, 2, Q), 1);
        assert_eq!(sub_mod(1, 2, Q), Q - 1);
        assert_eq!(neg_mod(0, Q), 0);
        assert_eq!(neg_mod(5, Q), Q - 5);
    }

    #[test]
    fn inverse_round_trips() {
        for value in [1u64, 2, 3, 12345, Q - 2] {
            let inverse = inv_mod(value, Q).unwrap();
            assert_eq!(mul_mod(value, inverse, Q), 1);
        }
        assert_eq!(inv_mod(6, 9), None);
    }

    #[test]
    fn pow_mod_handles_edge_cases() {
        assert_eq!(pow_mod(2, 0, 17), 1);
        assert_eq!(pow_mod(5, 3, 1), 0);
        assert_eq!(pow_mod(3, Q - 1, Q), 1);
    }

    #[test]
    fn shoup_matches_widened_reference() {
        let w = Q / 3 + 17;
        let w_shoup = shoup_precompute(w, Q);
        for a in [0u64, 1, 2, Q / 2, Q - 1, 987_654_321_012] {
            assert_eq!(mul_shoup(a, w, w_shoup, Q), mul_mod(a, w, Q));
        }
    }

    #[test]
    fn signed_values_center_back() {
        for value in [-5i64, 0, 7, -(1 << 40)] {
            assert_eq!(center(reduce_signed(value, Q), Q), value);
        }
    }
}
