use std::{
    ops::{AddAssign, Neg, SubAssign},
    sync::Arc,
};

use crypto_bigint::U1024;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::math::{
    modular::{add_mod, center, inv_mod, mul_mod, neg_mod, reduce_signed, sub_mod},
    uniform_residues,
};

use super::{
    basis::RnsBasis,
    errors::{RingError, RingResult},
    ntt,
};

/// A polynomial in `Z_{q_0} x … x Z_{q_{k-1}}[X] / (X^N + 1)`.
///
/// Stores one residue vector per RNS channel. The `in_ntt_domain` flag
/// tracks whether the vectors hold coefficients or NTT evaluations.
///
/// # Invariants
/// - `channels.len() == basis.channel_count()`
/// - `channels[i].len() == basis.degree()`
/// - every `channels[i][j] < basis.modulus(i)`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RnsPolyData", try_from = "RnsPolyData")]
pub struct RnsPoly {
    channels: Vec<Vec<u64>>,
    basis: Arc<RnsBasis>,
    in_ntt_domain: bool,
}

// ─── Constructors ─────────────────────────────────────────────────────────────

impl RnsPoly {
    /// Creates the zero polynomial in coefficient domain.
    pub fn zero(basis: Arc<RnsBasis>) -> Self {
        let channels = vec![vec![0u64; basis.degree()]; basis.channel_count()];
        Self {
            channels,
            basis,
            in_ntt_domain: false,
        }
    }

    /// Creates a polynomial from signed coefficients, reducing each into
    /// `[0, q_i)` per channel.
    pub fn from_signed_coeffs(coeffs: &[i64], basis: Arc<RnsBasis>) -> Self {
        assert_eq!(
            coeffs.len(),
            basis.degree(),
            "from_signed_coeffs: expected {} coefficients",
            basis.degree()
        );
        let channels = basis
            .moduli()
            .iter()
            .map(|&q| coeffs.iter().map(|&c| reduce_signed(c, q)).collect())
            .collect();
        Self {
            channels,
            basis,
            in_ntt_domain: false,
        }
    }

    /// The constant polynomial `value`.
    pub fn constant(value: i64, basis: Arc<RnsBasis>) -> Self {
        let mut poly = Self::zero(basis);
        for (channel, &q) in poly.channels.iter_mut().zip(poly.basis.moduli()) {
            channel[0] = reduce_signed(value, q);
        }
        poly
    }

    /// Samples every channel independently and uniformly. The result is
    /// tagged as NTT domain, which is equally uniform.
    pub fn uniform<R: Rng + ?Sized>(basis: Arc<RnsBasis>, rng: &mut R) -> Self {
        let degree = basis.degree();
        let channels = basis
            .moduli()
            .iter()
            .map(|&q| uniform_residues(q, degree, rng))
            .collect();
        Self {
            channels,
            basis,
            in_ntt_domain: true,
        }
    }
}

// ─── Accessors & domain conversion ───────────────────────────────────────────

impl RnsPoly {
    pub fn channels(&self) -> &[Vec<u64>] {
        &self.channels
    }

    pub fn basis(&self) -> &Arc<RnsBasis> {
        &self.basis
    }

    pub fn degree(&self) -> usize {
        self.basis.degree()
    }

    pub fn is_ntt_domain(&self) -> bool {
        self.in_ntt_domain
    }

    /// Converts to NTT domain in-place (no-op if already there).
    pub fn to_ntt_domain(&mut self) {
        if self.in_ntt_domain {
            return;
        }
        for (ch, channel) in self.channels.iter_mut().enumerate() {
            ntt::forward(channel, self.basis.ntt_table(ch));
        }
        self.in_ntt_domain = true;
    }

    /// Converts to coefficient domain in-place (no-op if already there).
    pub fn to_coeff_domain(&mut self) {
        if !self.in_ntt_domain {
            return;
        }
        for (ch, channel) in self.channels.iter_mut().enumerate() {
            ntt::inverse(channel, self.basis.ntt_table(ch));
        }
        self.in_ntt_domain = false;
    }

    /// Channel `ch` as centered signed coefficients.
    pub fn centered_channel(&self, ch: usize) -> Vec<i64> {
        debug_assert!(!self.in_ntt_domain, "centered_channel: requires coefficient domain");
        let q = self.basis.modulus(ch);
        self.channels[ch].iter().map(|&c| center(c, q)).collect()
    }

    /// Every coefficient reconstructed over the whole basis with Garner's
    /// mixed-radix CRT, centered in `(-Q/2, Q/2]` and rounded to `f64`.
    pub fn centered_coeffs(&self) -> Vec<f64> {
        debug_assert!(!self.in_ntt_domain, "centered_coeffs: requires coefficient domain");
        let moduli = self.basis.moduli();

        // prefix_inv[i] = (q_0 * … * q_{i-1})^{-1} mod q_i
        let prefix_inv: Vec<u64> = moduli
            .iter()
            .enumerate()
            .map(|(i, &q)| {
                let prefix = moduli[..i].iter().fold(1, |acc, &p| mul_mod(acc, p % q, q));
                inv_mod(prefix, q).unwrap_or(0)
            })
            .collect();
        let mut radix = Vec::with_capacity(moduli.len());
        let mut product = U1024::ONE;
        for &q in moduli {
            radix.push(product);
            product = product.wrapping_mul(&U1024::from_u64(q));
        }

        let mut digits = vec![0u64; moduli.len()];
        (0..self.degree())
            .map(|k| {
                for (i, &q) in moduli.iter().enumerate() {
                    let partial = (0..i).rev().fold(0, |acc, j| {
                        add_mod(mul_mod(acc, moduli[j] % q, q), digits[j] % q, q)
                    });
                    digits[i] = mul_mod(sub_mod(self.channels[i][k], partial, q), prefix_inv[i], q);
                }
                let value = digits
                    .iter()
                    .zip(&radix)
                    .fold(U1024::ZERO, |acc, (&d, r)| {
                        acc.wrapping_add(&r.wrapping_mul(&U1024::from_u64(d)))
                    });
                if value.wrapping_add(&value) > product {
                    -big_to_f64(&product.wrapping_sub(&value))
                } else {
                    big_to_f64(&value)
                }
            })
            .collect()
    }
}

fn big_to_f64(value: &U1024) -> f64 {
    value
        .as_words()
        .iter()
        .rev()
        .fold(0.0, |acc, &word| acc * 2f64.powi(64) + word as f64)
}

// ─── Serialization ────────────────────────────────────────────────────────────

/// Wire form of an [`RnsPoly`]; the NTT tables are rebuilt on load.
#[derive(Serialize, Deserialize)]
struct RnsPolyData {
    degree: usize,
    moduli: Vec<u64>,
    in_ntt_domain: bool,
    channels: Vec<Vec<u64>>,
}

impl From<RnsPoly> for RnsPolyData {
    fn from(poly: RnsPoly) -> Self {
        Self {
            degree: poly.basis.degree(),
            moduli: poly.basis.moduli().to_vec(),
            in_ntt_domain: poly.in_ntt_domain,
            channels: poly.channels,
        }
    }
}

impl TryFrom<RnsPolyData> for RnsPoly {
    type Error = RingError;

    fn try_from(data: RnsPolyData) -> RingResult<Self> {
        let basis = RnsBasis::new(data.degree, &data.moduli)?;
        if data.channels.len() != data.moduli.len()
            || data.channels.iter().any(|channel| channel.len() != data.degree)
        {
            return Err(RingError::MalformedChannels {
                channel_count: data.moduli.len(),
                degree: data.degree,
            });
        }
        for (channel, &modulus) in data.channels.iter().zip(&data.moduli) {
            if channel.iter().any(|&residue| residue >= modulus) {
                return Err(RingError::ResidueOutOfRange { modulus });
            }
        }
        Ok(RnsPoly {
            channels: data.channels,
            basis: Arc::new(basis),
            in_ntt_domain: data.in_ntt_domain,
        })
    }
}

// ─── Arithmetic ───────────────────────────────────────────────────────────────

impl AddAssign<&RnsPoly> for RnsPoly {
    fn add_assign(&mut self, rhs: &RnsPoly) {
        self.assert_compatible(rhs, "add_assign");
        for (ch, channel) in self.channels.iter_mut().enumerate() {
            let q = self.basis.modulus(ch);
            for (a, &b) in channel.iter_mut().zip(&rhs.channels[ch]) {
                *a = add_mod(*a, b, q);
            }
        }
    }
}

impl SubAssign<&RnsPoly> for RnsPoly {
    fn sub_assign(&mut self, rhs: &RnsPoly) {
        self.assert_compatible(rhs, "sub_assign");
        for (ch, channel) in self.channels.iter_mut().enumerate() {
            let q = self.basis.modulus(ch);
            for (a, &b) in channel.iter_mut().zip(&rhs.channels[ch]) {
                *a = sub_mod(*a, b, q);
            }
        }
    }
}

impl Neg for RnsPoly {
    type Output = RnsPoly;

    fn neg(mut self) -> RnsPoly {
        for (ch, channel) in self.channels.iter_mut().enumerate() {
            let q = self.basis.modulus(ch);
            for a in channel.iter_mut() {
                *a = neg_mod(*a, q);
            }
        }
        self
    }
}

impl RnsPoly {
    fn assert_compatible(&self, rhs: &RnsPoly, op: &str) {
        debug_assert_eq!(
            self.basis.moduli(),
            rhs.basis.moduli(),
            "{op}: basis mismatch"
        );
        debug_assert_eq!(self.in_ntt_domain, rhs.in_ntt_domain, "{op}: domain mismatch");
    }

    /// Pointwise product; both operands must be in NTT domain.
    pub fn mul_assign_ntt(&mut self, rhs: &RnsPoly) {
        self.assert_compatible(rhs, "mul_assign_ntt");
        debug_assert!(self.in_ntt_domain, "mul_assign_ntt: requires NTT domain");
        for (ch, channel) in self.channels.iter_mut().enumerate() {
            let q = self.basis.modulus(ch);
            for (a, &b) in channel.iter_mut().zip(&rhs.channels[ch]) {
                *a = mul_mod(*a, b, q);
            }
        }
    }

    /// Ring product returning a coefficient-domain polynomial, regardless of
    /// the operands' domains.
    pub fn ring_mul(&self, rhs: &RnsPoly) -> RnsPoly {
        let mut lhs = self.clone();
        lhs.to_ntt_domain();
        let mut rhs = rhs.clone();
        rhs.to_ntt_domain();
        lhs.mul_assign_ntt(&rhs);
        lhs.to_coeff_domain();
        lhs
    }

    /// Multiplies every coefficient by the integer `factor`.
    pub fn mul_scalar_assign(&mut self, factor: i64) {
        for (ch, channel) in self.channels.iter_mut().enumerate() {
            let q = self.basis.modulus(ch);
            let f = reduce_signed(factor, q);
            for a in channel.iter_mut() {
                *a = mul_mod(*a, f, q);
            }
        }
    }
}

// ─── Modulus switching ───────────────────────────────────────────────────────

impl RnsPoly {
    /// Computes `round(self / q_last)` over the basis without its last
    /// modulus. This is the rescale step, and the mod-down step of hybrid
    /// key switching when the last modulus is the special prime.
    ///
    /// `target` must equal this basis minus its last channel.
    pub fn divide_round_by_last(&self, target: Arc<RnsBasis>) -> RnsPoly {
        debug_assert!(!self.in_ntt_domain, "divide_round_by_last: requires coefficient domain");
        let last = self.channels.len() - 1;
        debug_assert_eq!(
            target.moduli(),
            &self.basis.moduli()[..last],
            "divide_round_by_last: target basis mismatch"
        );
        let q_last = self.basis.modulus(last);
        let remainders: Vec<i64> = self.channels[last].iter().map(|&r| center(r, q_last)).collect();

        let channels = self.channels[..last]
            .iter()
            .zip(target.moduli())
            .map(|(channel, &q)| {
                // q_last and q are distinct primes, so the inverse exists.
                let q_last_inv = inv_mod(q_last % q, q).unwrap_or(0);
                channel
                    .iter()
                    .zip(&remainders)
                    .map(|(&x, &r)| mul_mod(sub_mod(x, reduce_signed(r, q), q), q_last_inv, q))
                    .collect()
            })
            .collect();
        RnsPoly {
            channels,
            basis: target,
            in_ntt_domain: false,
        }
    }

    /// Copies the listed channels, in order, into a polynomial over `target`.
    pub fn select_channels(&self, indices: &[usize], target: Arc<RnsBasis>) -> RnsPoly {
        debug_assert_eq!(indices.len(), target.channel_count(), "select_channels: arity");
        let channels = indices.iter().map(|&i| self.channels[i].clone()).collect();
        RnsPoly {
            channels,
            basis: target,
            in_ntt_domain: self.in_ntt_domain,
        }
    }

    /// Drops channels above `keep` (mod-switch without rounding).
    pub fn truncate_channels(&self, keep: usize, target: Arc<RnsBasis>) -> RnsPoly {
        let indices: Vec<usize> = (0..keep).collect();
        self.select_channels(&indices, target)
    }

    /// Lifts the centered residues of channel `ch` to every channel of
    /// `target`. This is one digit of the RNS gadget decomposition.
    pub fn lift_channel(&self, ch: usize, target: Arc<RnsBasis>) -> RnsPoly {
        let centered = self.centered_channel(ch);
        RnsPoly::from_signed_coeffs(&centered, target)
    }

    /// Keeps channel `ch` and zeroes every other channel.
    pub fn isolate_channel(&self, ch: usize) -> RnsPoly {
        let mut out = self.clone();
        for (i, channel) in out.channels.iter_mut().enumerate() {
            if i != ch {
                channel.fill(0);
            }
        }
        out
    }

    /// Swaps in `basis`, which must have the same degree and moduli. Lets
    /// deserialized polynomials share a session's precomputed tables.
    pub(crate) fn rebind(mut self, basis: Arc<RnsBasis>) -> RnsPoly {
        debug_assert_eq!(*self.basis, *basis, "rebind: basis mismatch");
        self.basis = basis;
        self
    }

    /// Applies the ring automorphism `X -> X^galois` for odd `galois`.
    pub fn automorphism(&self, galois: usize) -> RnsPoly {
        debug_assert!(!self.in_ntt_domain, "automorphism: requires coefficient domain");
        debug_assert!(galois % 2 == 1, "automorphism: galois element must be odd");
        let n = self.degree();
        let two_n = 2 * n;
        let channels = self
            .channels
            .iter()
            .zip(self.basis.moduli())
            .map(|(channel, &q)| {
                let mut out = vec![0u64; n];
                for (k, &c) in channel.iter().enumerate() {
                    let target = (k * galois) % two_n;
                    if target < n {
                        out[target] = c;
                    } else {
                        out[target - n] = neg_mod(c, q);
                    }
                }
                out
            })
            .collect();
        RnsPoly {
            channels,
            basis: Arc::clone(&self.basis),
            in_ntt_domain: false,
        }
    }
}
