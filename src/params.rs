//! Encryption parameters and the parameter selector.
//!
//! The selector turns a multiplicative depth and a precision hint into a
//! concrete ring degree and modulus chain. Every chain has the same shape:
//!
//! ```text
//!   q_0            q_1 … q_depth           P
//!   60-bit base    one prime per level     60-bit special prime
//!                  close to 2^scale_bits   (key switching only)
//! ```
//!
//! The scale is `2^(precision_hint + NOISE_HEADROOM_BITS)`: the extra bits
//! absorb rescale and key-switching noise so decoded values keep about
//! `precision_hint` fractional bits.

use std::fmt;

use crypto_bigint::U1024;
use serde::{Deserialize, Serialize};

use crate::crypto::errors::{HeError, HeResult};
use crate::math::{alternating_primes, is_ntt_friendly_prime, ntt_prime_below};

pub const NOISE_HEADROOM_BITS: u32 = 20;
pub const MAX_SCALE_BITS: u32 = 50;
pub const FIRST_MODULUS_BITS: u32 = 60;
pub const SPECIAL_MODULUS_BITS: u32 = 60;
pub const MAX_RING_DEGREE: usize = 1 << 17;
/// Upper bound on `log2(Q * P)`; CRT decoding works in 1024-bit integers.
pub const MAX_TOTAL_MODULUS_BITS: u32 = 1000;

const RING_DEGREES: [usize; 5] = [2048, 4096, 8192, 16384, 32768];

/// Classical security target, following the HE standard's maximum
/// `log2(Q * P)` per ring degree for ternary secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SecurityLevel {
    #[default]
    Bits128,
    Bits192,
}

impl SecurityLevel {
    pub fn max_modulus_bits(self, ring_degree: usize) -> Option<u32> {
        let table: [u32; 5] = match self {
            SecurityLevel::Bits128 => [54, 109, 218, 438, 881],
            SecurityLevel::Bits192 => [37, 75, 152, 305, 611],
        };
        RING_DEGREES
            .iter()
            .position(|&degree| degree == ring_degree)
            .map(|index| table[index])
    }

    pub fn bits(self) -> u32 {
        match self {
            SecurityLevel::Bits128 => 128,
            SecurityLevel::Bits192 => 192,
        }
    }
}

/// Immutable parameter set a session is built from.
///
/// Invariant: `modulus_chain.len() == max_level() + 1`, every modulus (and
/// the special modulus) is a distinct NTT-friendly prime for `ring_degree`.
///
/// Deserialization re-runs the structural checks and, for selected
/// parameters, the security budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ParametersData", try_from = "ParametersData")]
pub struct EncryptionParameters {
    ring_degree: usize,
    modulus_chain: Vec<u64>,
    special_modulus: u64,
    scale_bits: u32,
    precision_hint: u32,
    security_level: Option<SecurityLevel>,
}

impl EncryptionParameters {
    /// Explicit parameters with structural validation only.
    ///
    /// No security estimate is made; use [`ParameterSelector`] for that.
    /// The precision hint is derived as `scale_bits - NOISE_HEADROOM_BITS`
    /// (at least one bit).
    pub fn custom(
        ring_degree: usize,
        modulus_chain: Vec<u64>,
        special_modulus: u64,
        scale_bits: u32,
    ) -> HeResult<Self> {
        if ring_degree < 4 || ring_degree > MAX_RING_DEGREE || !ring_degree.is_power_of_two() {
            return Err(HeError::parameter(format!(
                "ring degree {ring_degree} must be a power of two in [4, {MAX_RING_DEGREE}]"
            )));
        }
        let Some(&first) = modulus_chain.first() else {
            return Err(HeError::parameter("modulus chain must not be empty"));
        };
        let all_moduli = modulus_chain.iter().chain(std::iter::once(&special_modulus));
        for (index, &modulus) in all_moduli.clone().enumerate() {
            if !is_ntt_friendly_prime(modulus, ring_degree as u64) || modulus >= 1 << 62 {
                return Err(HeError::parameter(format!(
                    "modulus {modulus} is not an NTT-friendly prime below 2^62 for degree {ring_degree}"
                )));
            }
            if all_moduli.clone().take(index).any(|&other| other == modulus) {
                return Err(HeError::parameter(format!("modulus {modulus} is repeated")));
            }
        }
        let bit_sum: u32 = all_moduli.clone().map(|q| 64 - q.leading_zeros()).sum();
        if bit_sum > MAX_TOTAL_MODULUS_BITS {
            return Err(HeError::parameter(format!(
                "modulus chain spans {bit_sum} bits, more than {MAX_TOTAL_MODULUS_BITS}"
            )));
        }
        let first_bits = 64 - first.leading_zeros();
        if scale_bits == 0 || scale_bits > MAX_SCALE_BITS || scale_bits + 2 > first_bits {
            return Err(HeError::parameter(format!(
                "scale of 2^{scale_bits} does not fit below a {first_bits}-bit first modulus \
                 (at most 2^{MAX_SCALE_BITS})"
            )));
        }

        Ok(Self {
            ring_degree,
            modulus_chain,
            special_modulus,
            scale_bits,
            precision_hint: scale_bits.saturating_sub(NOISE_HEADROOM_BITS).max(1),
            security_level: None,
        })
    }

    pub fn ring_degree(&self) -> usize {
        self.ring_degree
    }

    pub fn slot_count(&self) -> usize {
        self.ring_degree / 2
    }

    pub fn modulus_chain(&self) -> &[u64] {
        &self.modulus_chain
    }

    pub fn special_modulus(&self) -> u64 {
        self.special_modulus
    }

    /// Highest level; also the number of rescales a fresh ciphertext allows.
    pub fn max_level(&self) -> usize {
        self.modulus_chain.len() - 1
    }

    pub fn scale_bits(&self) -> u32 {
        self.scale_bits
    }

    pub fn default_scale(&self) -> f64 {
        2f64.powi(self.scale_bits as i32)
    }

    pub fn precision_hint(&self) -> u32 {
        self.precision_hint
    }

    /// Round-trip tolerance for a fresh encoding: `2^-precision_hint`.
    pub fn epsilon(&self) -> f64 {
        2f64.powi(-(self.precision_hint as i32))
    }

    /// `None` for parameters built with [`EncryptionParameters::custom`].
    pub fn security_level(&self) -> Option<SecurityLevel> {
        self.security_level
    }

    /// Exact bit length of `q_0 * … * q_L * P`.
    pub fn total_modulus_bits(&self) -> u32 {
        total_bits(&self.modulus_chain, self.special_modulus)
    }
}

impl fmt::Display for EncryptionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chain_bits: Vec<String> = self
            .modulus_chain
            .iter()
            .map(|q| (64 - q.leading_zeros()).to_string())
            .collect();
        write!(
            f,
            "N={}, chain=[{}] bits, special={} bits, scale=2^{}, log(QP)={}",
            self.ring_degree,
            chain_bits.join(", "),
            64 - self.special_modulus.leading_zeros(),
            self.scale_bits,
            self.total_modulus_bits()
        )?;
        if let Some(level) = self.security_level {
            write!(f, ", {}-bit security", level.bits())?;
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct ParametersData {
    ring_degree: usize,
    modulus_chain: Vec<u64>,
    special_modulus: u64,
    scale_bits: u32,
    precision_hint: u32,
    security_level: Option<SecurityLevel>,
}

impl From<EncryptionParameters> for ParametersData {
    fn from(params: EncryptionParameters) -> Self {
        Self {
            ring_degree: params.ring_degree,
            modulus_chain: params.modulus_chain,
            special_modulus: params.special_modulus,
            scale_bits: params.scale_bits,
            precision_hint: params.precision_hint,
            security_level: params.security_level,
        }
    }
}

impl TryFrom<ParametersData> for EncryptionParameters {
    type Error = HeError;

    fn try_from(data: ParametersData) -> HeResult<Self> {
        let mut params = EncryptionParameters::custom(
            data.ring_degree,
            data.modulus_chain,
            data.special_modulus,
            data.scale_bits,
        )?;
        if data.precision_hint == 0 || data.precision_hint > data.scale_bits {
            return Err(HeError::parameter(format!(
                "precision hint {} must be in [1, {}]",
                data.precision_hint, data.scale_bits
            )));
        }
        if let Some(level) = data.security_level {
            let budget = level.max_modulus_bits(params.ring_degree).unwrap_or(0);
            if params.total_modulus_bits() > budget {
                return Err(HeError::parameter(format!(
                    "{} modulus bits exceed the {}-bit security budget of {budget} bits",
                    params.total_modulus_bits(),
                    level.bits()
                )));
            }
        }
        params.precision_hint = data.precision_hint;
        params.security_level = data.security_level;
        Ok(params)
    }
}

fn total_bits(chain: &[u64], special: u64) -> u32 {
    chain
        .iter()
        .chain(std::iter::once(&special))
        .fold(U1024::ONE, |acc, &q| acc.wrapping_mul(&U1024::from_u64(q)))
        .bits()
}

/// Chooses the smallest ring degree whose security budget holds the modulus
/// chain needed for a requested depth and precision.
#[derive(Debug, Clone)]
pub struct ParameterSelector {
    max_multiplicative_depth: usize,
    precision_hint: u32,
    security_level: SecurityLevel,
}

impl ParameterSelector {
    pub fn new(max_multiplicative_depth: usize, precision_hint: u32) -> Self {
        Self {
            max_multiplicative_depth,
            precision_hint,
            security_level: SecurityLevel::default(),
        }
    }

    pub fn security_level(mut self, level: SecurityLevel) -> Self {
        self.security_level = level;
        self
    }

    pub fn select(&self) -> HeResult<EncryptionParameters> {
        let depth = self.max_multiplicative_depth;
        if self.precision_hint == 0 {
            return Err(HeError::parameter("precision hint must be at least one bit"));
        }
        let scale_bits = self.precision_hint.saturating_add(NOISE_HEADROOM_BITS);
        if scale_bits > MAX_SCALE_BITS {
            return Err(HeError::parameter(format!(
                "precision of {} bits exceeds the supported maximum of {} bits",
                self.precision_hint,
                MAX_SCALE_BITS - NOISE_HEADROOM_BITS
            )));
        }

        // Alternating primes sit within one bit of 2^scale_bits.
        let estimate = (depth as u64)
            .saturating_mul(scale_bits as u64 + 1)
            .saturating_add((FIRST_MODULUS_BITS + SPECIAL_MODULUS_BITS) as u64);

        for &ring_degree in &RING_DEGREES {
            let Some(budget) = self.security_level.max_modulus_bits(ring_degree) else {
                continue;
            };
            if estimate > budget as u64 {
                continue;
            }
            let Some((chain, special)) = build_chain(ring_degree, depth, scale_bits) else {
                continue;
            };
            if total_bits(&chain, special) > budget {
                continue;
            }
            return Ok(EncryptionParameters {
                ring_degree,
                modulus_chain: chain,
                special_modulus: special,
                scale_bits,
                precision_hint: self.precision_hint,
                security_level: Some(self.security_level),
            });
        }

        Err(HeError::parameter(format!(
            "depth {depth} with {} bits of precision needs about {estimate} modulus bits, \
             more than any supported ring degree allows at {}-bit security",
            self.precision_hint,
            self.security_level.bits()
        )))
    }
}

/// Shorthand for `ParameterSelector::new(depth, precision_hint).select()`.
pub fn select_parameters(
    max_multiplicative_depth: usize,
    precision_hint: u32,
) -> HeResult<EncryptionParameters> {
    ParameterSelector::new(max_multiplicative_depth, precision_hint).select()
}

fn build_chain(ring_degree: usize, depth: usize, scale_bits: u32) -> Option<(Vec<u64>, u64)> {
    let degree = ring_degree as u64;
    let first = ntt_prime_below(1 << FIRST_MODULUS_BITS, degree)?;
    let special = ntt_prime_below(first, degree)?;
    let mut chain = Vec::with_capacity(depth + 1);
    chain.push(first);
    chain.extend(alternating_primes(scale_bits, depth, degree)?);
    Some((chain, special))
}
