//! Hybrid key switching with one special prime `P`.
//!
//! A key switching from `s'` to `s` holds one digit per chain modulus:
//!
//! ```text
//!   b_i = -a_i * s + e_i + [P * s']_{q_i}     (P * s' only on channel i)
//! ```
//!
//! To switch `d * s'` at level `l`, each centered residue `[d]_{q_i}` is lifted
//! to `q_0 … q_l, P`, multiplied into the matching digit, and the sum is
//! divided by `P` with rounding. The CRT gadget makes the digits sum to
//! `P * d * s'`, and dividing by `P` shrinks the key noise below one bit of
//! the scale.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{SecretKey, error_poly};
use crate::rings::{RnsBasis, RnsPoly};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeySwitchKey {
    digits: Vec<(RnsPoly, RnsPoly)>,
}

impl KeySwitchKey {
    /// Builds a key switching `source` (NTT domain over the full key basis)
    /// into the secret of `secret_key`.
    pub fn generate<R: Rng + ?Sized>(
        source: &RnsPoly,
        secret_key: &SecretKey,
        error_std: f64,
        rng: &mut R,
    ) -> Self {
        let s = secret_key.poly();
        let key_basis = Arc::clone(s.basis());
        let special_channel = key_basis.channel_count() - 1;
        let special = key_basis.modulus(special_channel);

        let mut gadget = source.clone();
        gadget.mul_scalar_assign(special as i64);

        let digits = (0..special_channel)
            .map(|i| {
                let a = RnsPoly::uniform(Arc::clone(&key_basis), rng);
                let mut a_s = a.clone();
                a_s.mul_assign_ntt(s);
                let mut b = error_poly(error_std, Arc::clone(&key_basis), rng);
                b -= &a_s;
                b += &gadget.isolate_channel(i);
                (b, a)
            })
            .collect();
        Self { digits }
    }

    pub fn digit_count(&self) -> usize {
        self.digits.len()
    }

    /// Full key basis the digits live in; `None` only for an empty key.
    pub(crate) fn basis(&self) -> Option<&Arc<RnsBasis>> {
        self.digits.first().map(|(b, _)| b.basis())
    }

    pub fn degree(&self) -> usize {
        self.digits.first().map_or(0, |(b, _)| b.degree())
    }

    /// Returns `(u0, u1)` over `target` with `u0 + u1 * s ≈ input * s'`.
    ///
    /// `input` is a coefficient-domain polynomial over `target` (basis
    /// `q_0 … q_l`); `key_basis` is `q_0 … q_l, P`.
    pub fn switch(
        &self,
        input: &RnsPoly,
        key_basis: &Arc<RnsBasis>,
        target: &Arc<RnsBasis>,
    ) -> (RnsPoly, RnsPoly) {
        let level_channels = target.channel_count();
        debug_assert_eq!(key_basis.channel_count(), level_channels + 1);
        debug_assert!(level_channels <= self.digits.len());

        let special_channel = self.digits[0].0.channels().len() - 1;
        let indices: Vec<usize> = (0..level_channels)
            .chain(std::iter::once(special_channel))
            .collect();

        let mut acc0 = RnsPoly::zero(Arc::clone(key_basis));
        acc0.to_ntt_domain();
        let mut acc1 = acc0.clone();

        for (i, (b, a)) in self.digits.iter().take(level_channels).enumerate() {
            let mut digit = input.lift_channel(i, Arc::clone(key_basis));
            digit.to_ntt_domain();

            let mut term = b.select_channels(&indices, Arc::clone(key_basis));
            term.mul_assign_ntt(&digit);
            acc0 += &term;

            let mut term = a.select_channels(&indices, Arc::clone(key_basis));
            term.mul_assign_ntt(&digit);
            acc1 += &term;
        }

        acc0.to_coeff_domain();
        acc1.to_coeff_domain();
        (
            acc0.divide_round_by_last(Arc::clone(target)),
            acc1.divide_round_by_last(Arc::clone(target)),
        )
    }
}
