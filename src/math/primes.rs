//! NTT-friendly prime search for modulus chains.
//!
//! Primality uses deterministic Miller-Rabin: the fixed base set below has no
//! strong pseudoprime under `3.3 * 10^24`, which covers every `u64`.
//! Reference: https://miller-rabin.appspot.com/

use super::modular::{mul_mod, pow_mod};

const MILLER_RABIN_BASES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Returns `true` if `n` is prime.
pub fn is_prime(n: u64) -> bool {
    match n {
        0 | 1 => return false,
        2 | 3 => return true,
        _ if n.is_multiple_of(2) => return false,
        _ => {}
    }

    let r = (n - 1).trailing_zeros();
    let d = (n - 1) >> r;
    'bases: for &a in &MILLER_RABIN_BASES {
        if a >= n {
            continue;
        }
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..r {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'bases;
            }
        }
        return false;
    }
    true
}

/// Returns `true` when `p` is prime and `p = 1 (mod 2 * degree)`, i.e. `Z_p`
/// holds a primitive `2 * degree`-th root of unity for the negacyclic NTT.
#[inline]
pub fn is_ntt_friendly_prime(p: u64, degree: u64) -> bool {
    match degree.checked_mul(2) {
        Some(order) if degree > 0 => is_prime(p) && p % order == 1,
        _ => false,
    }
}

/// Smallest NTT-friendly prime strictly greater than `value`.
///
/// Returns `None` when the search would leave the `u64` range.
pub fn ntt_prime_above(value: u64, degree: u64) -> Option<u64> {
    let step = degree.checked_mul(2)?;
    let delta = match value % step {
        0 => 1,
        remainder => step + 1 - remainder,
    };
    let mut candidate = value.checked_add(delta)?;
    loop {
        if is_prime(candidate) {
            return Some(candidate);
        }
        candidate = candidate.checked_add(step)?;
    }
}

/// Largest NTT-friendly prime strictly less than `value`.
pub fn ntt_prime_below(value: u64, degree: u64) -> Option<u64> {
    let step = degree.checked_mul(2)?;
    let last = value.checked_sub(1)?;
    let mut candidate = last.checked_sub((last + step - 1) % step)?;
    loop {
        if candidate <= 2 {
            return None;
        }
        if is_prime(candidate) {
            return Some(candidate);
        }
        candidate = candidate.checked_sub(step)?;
    }
}

/// Picks `count` distinct NTT-friendly primes alternating above and below
/// `2^bits`, so that their product stays close to `2^(bits * count)`.
pub fn alternating_primes(bits: u32, count: usize, degree: u64) -> Option<Vec<u64>> {
    let center = 1u64.checked_shl(bits)?;
    let mut primes = Vec::with_capacity(count);
    let (mut upper, mut lower) = (center, center);
    for index in 0..count {
        if index % 2 == 0 {
            upper = ntt_prime_above(upper, degree)?;
            primes.push(upper);
        } else {
            lower = ntt_prime_below(lower, degree)?;
            primes.push(lower);
        }
    }
    Some(primes)
}
