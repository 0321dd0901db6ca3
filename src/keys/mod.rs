//! Key material of one session.

pub mod public_key;
pub mod secret_key;
pub mod switching_key;

use std::{collections::HashMap, sync::Arc};

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use public_key::PublicKey;
pub use secret_key::{SecretKey, SecretKeyParams};
pub use switching_key::KeySwitchKey;

use crate::math::{gaussian_coefficients, modular::pow_mod};
use crate::rings::{RnsBasis, RnsPoly};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum KeyError {
    #[error("hamming weight {weight} must be in [1, {degree}]")]
    InvalidHammingWeight { weight: usize, degree: usize },
    #[error("error standard deviation {0} must be finite and positive")]
    InvalidErrorStd(f64),
}

pub type KeyResult<T> = Result<T, KeyError>;

/// Relinearization key plus the rotation (Galois) keys requested at
/// session construction. Immutable once generated and safe to share.
///
/// Galois keys are indexed by their Galois element, so the conjugation key
/// (element `2N - 1`) lives next to the rotation keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationKeys {
    relinearization: KeySwitchKey,
    rotations: HashMap<usize, KeySwitchKey>,
}

impl EvaluationKeys {
    pub fn generate<R: Rng + ?Sized>(
        secret_key: &SecretKey,
        rotation_steps: &[i64],
        conjugation: bool,
        error_std: f64,
        rng: &mut R,
    ) -> KeyResult<Self> {
        if !(error_std.is_finite() && error_std > 0.0) {
            return Err(KeyError::InvalidErrorStd(error_std));
        }
        let s = secret_key.poly();
        let mut s_squared = s.clone();
        s_squared.mul_assign_ntt(s);
        let relinearization = KeySwitchKey::generate(&s_squared, secret_key, error_std, rng);

        let degree = s.degree();
        let galois_elements = rotation_steps
            .iter()
            .map(|&steps| galois_element(steps, degree))
            .chain(conjugation.then(|| conjugation_element(degree)));
        let s_coeff = RnsPoly::from_signed_coeffs(secret_key.coeffs(), Arc::clone(s.basis()));
        let mut rotations = HashMap::new();
        for galois in galois_elements {
            if galois == 1 || rotations.contains_key(&galois) {
                continue;
            }
            let mut rotated = s_coeff.automorphism(galois);
            rotated.to_ntt_domain();
            rotations.insert(
                galois,
                KeySwitchKey::generate(&rotated, secret_key, error_std, rng),
            );
        }

        Ok(Self {
            relinearization,
            rotations,
        })
    }

    pub fn relinearization_key(&self) -> &KeySwitchKey {
        &self.relinearization
    }

    pub fn rotation_key(&self, galois: usize) -> Option<&KeySwitchKey> {
        self.rotations.get(&galois)
    }

    pub fn conjugation_key(&self) -> Option<&KeySwitchKey> {
        let degree = self.relinearization.degree();
        self.rotations.get(&conjugation_element(degree))
    }

    /// Relinearization key first, then every Galois key.
    pub(crate) fn switch_keys(&self) -> impl Iterator<Item = &KeySwitchKey> {
        std::iter::once(&self.relinearization).chain(self.rotations.values())
    }

    /// Number of Galois keys, the conjugation key included.
    pub fn rotation_count(&self) -> usize {
        self.rotations.len()
    }
}

/// Galois element `g` such that `X -> X^g` moves slot `j` to slot
/// `j + steps` (cyclically over `degree / 2` slots).
pub fn galois_element(steps: i64, degree: usize) -> usize {
    let slots = (degree / 2) as i64;
    let left = (-steps).rem_euclid(slots) as u64;
    pow_mod(5, left, 2 * degree as u64) as usize
}

/// `X -> X^{2N-1}`, which conjugates every slot.
pub fn conjugation_element(degree: usize) -> usize {
    2 * degree - 1
}

/// Everything key generation produces for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeySet {
    pub public_key: PublicKey,
    pub secret_key: SecretKey,
    pub evaluation_keys: EvaluationKeys,
}

pub(crate) fn error_poly<R: Rng + ?Sized>(
    error_std: f64,
    basis: Arc<RnsBasis>,
    rng: &mut R,
) -> RnsPoly {
    let coeffs = gaussian_coefficients(error_std, basis.degree(), rng);
    let mut poly = RnsPoly::from_signed_coeffs(&coeffs, basis);
    poly.to_ntt_domain();
    poly
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ntt_prime_below;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    const DEGREE: usize = 32;

    fn key_basis() -> Arc<RnsBasis> {
        let q0 = ntt_prime_below(1 << 60, DEGREE as u64).unwrap();
        let q1 = ntt_prime_below(1 << 30, DEGREE as u64).unwrap();
        let p = ntt_prime_below(q0, DEGREE as u64).unwrap();
        Arc::new(RnsBasis::new(DEGREE, &[q0, q1, p]).unwrap())
    }

    fn secret(rng: &mut ChaCha20Rng) -> SecretKey {
        SecretKey::generate(&SecretKeyParams { hamming_weight: 8 }, key_basis(), 1, rng).unwrap()
    }

    #[test]
    fn hamming_weight_is_validated() {
        let params = SecretKeyParams { hamming_weight: 0 };
        assert_eq!(
            params.validate(32),
            Err(KeyError::InvalidHammingWeight {
                weight: 0,
                degree: 32
            })
        );
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert_eq!(secret(&mut rng).hamming_weight(), 8);
    }

    #[test]
    fn galois_elements_follow_the_slot_generator() {
        assert_eq!(galois_element(0, 32), 1);
        assert_eq!(galois_element(-1, 32), 5);
        assert_eq!(galois_element(15, 32), 5);
        assert_eq!(galois_element(1, 32), pow_mod(5, 15, 64) as usize);
    }

    #[test]
    fn public_key_decrypts_to_small_noise() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let sk = secret(&mut rng);
        let full = key_basis();
        let top = Arc::new(full.sub_basis(&[0, 1]).unwrap());
        let pk = PublicKey::generate(&sk, Arc::clone(&top), 3.2, &mut rng);

        let (mut b, a) = pk.at_level(&top);
        let mut a_s = a;
        a_s.mul_assign_ntt(&sk.leading_channels(2, Arc::clone(&top)));
        b += &a_s;
        b.to_coeff_domain();
        assert!(b.centered_channel(0).iter().all(|e| e.abs() < 40));
    }

    #[test]
    fn relinearization_key_switches_s_squared() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let sk = secret(&mut rng);
        let keys = EvaluationKeys::generate(&sk, &[1], false, 3.2, &mut rng).unwrap();
        assert_eq!(keys.rotation_count(), 1);

        let full = key_basis();
        let target = Arc::new(full.sub_basis(&[0, 1]).unwrap());
        let mut d = RnsPoly::uniform(Arc::clone(&target), &mut rng);
        d.to_coeff_domain();

        let (mut u0, u1) = keys.relinearization_key().switch(&d, &full, &target);
        // u0 + u1*s - d*s^2 must be small.
        let s = sk.leading_channels(2, Arc::clone(&target));
        let mut s2 = s.clone();
        s2.mul_assign_ntt(&s);
        let mut s2_coeff = s2;
        s2_coeff.to_coeff_domain();
        u0 += &u1.ring_mul(&s);
        u0 -= &d.ring_mul(&s2_coeff);
        assert!(u0.centered_channel(0).iter().all(|e| e.abs() < 1 << 20));
        assert!(u0.centered_channel(1).iter().all(|e| e.abs() < 1 << 20));
    }

    #[test]
    fn conjugation_key_is_a_galois_key() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let sk = secret(&mut rng);
        let plain = EvaluationKeys::generate(&sk, &[1], false, 3.2, &mut rng).unwrap();
        assert!(plain.conjugation_key().is_none());

        let keys = EvaluationKeys::generate(&sk, &[1], true, 3.2, &mut rng).unwrap();
        assert_eq!(keys.rotation_count(), 2);
        assert!(keys.conjugation_key().is_some());
        assert!(keys.rotation_key(conjugation_element(DEGREE)).is_some());
        assert_eq!(conjugation_element(DEGREE), 2 * DEGREE - 1);
    }

    #[test]
    fn invalid_error_std_is_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(4);
        let sk = secret(&mut rng);
        assert!(matches!(
            EvaluationKeys::generate(&sk, &[], false, 0.0, &mut rng),
            Err(KeyError::InvalidErrorStd(_))
        ));
    }
}
