//! In-place negacyclic NTT (Longa-Naehrig, "Speeding up the Number Theoretic
//! Transform for Faster Ideal Lattice-Based Cryptography", Algorithms 1 and 2).
//!
//! The forward transform takes natural-order coefficients to bit-reversed
//! evaluations; the inverse undoes it, including the `N^{-1}` factor. Because
//! `psi` twists the input, pointwise products in the evaluation domain are
//! products in `Z_q[X] / (X^N + 1)` with no separate pre/post scaling.

use crate::math::modular::{add_mod, mul_shoup, sub_mod};

use super::basis::NttTable;

pub fn forward(values: &mut [u64], table: &NttTable) {
    let n = table.degree;
    let q = table.modulus;
    debug_assert_eq!(values.len(), n, "forward: length mismatch");

    let mut t = n;
    let mut m = 1;
    while m < n {
        t >>= 1;
        for i in 0..m {
            let w = table.psi_powers[m + i];
            let w_shoup = table.psi_powers_shoup[m + i];
            let start = 2 * i * t;
            for j in start..start + t {
                let u = values[j];
                let v = mul_shoup(values[j + t], w, w_shoup, q);
                values[j] = add_mod(u, v, q);
                values[j + t] = sub_mod(u, v, q);
            }
        }
        m <<= 1;
    }
}

pub fn inverse(values: &mut [u64], table: &NttTable) {
    let n = table.degree;
    let q = table.modulus;
    debug_assert_eq!(values.len(), n, "inverse: length mismatch");

    let mut t = 1;
    let mut m = n;
    while m > 1 {
        let h = m >> 1;
        for i in 0..h {
            let w = table.psi_inv_powers[h + i];
            let w_shoup = table.psi_inv_powers_shoup[h + i];
            let start = 2 * i * t;
            for j in start..start + t {
                let u = values[j];
                let v = values[j + t];
                values[j] = add_mod(u, v, q);
                values[j + t] = mul_shoup(sub_mod(u, v, q), w, w_shoup, q);
            }
        }
        t <<= 1;
        m = h;
    }
    for value in values.iter_mut() {
        *value = mul_shoup(*value, table.degree_inv, table.degree_inv_shoup, q);
    }
}
