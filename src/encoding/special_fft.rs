//! Canonical embedding between real slot vectors and ring coefficients.
//!
//! Slot `j` holds `m(zeta^(5^j))` with `zeta = exp(i*pi/N)`. Writing
//! `5^j = 2*t_j + 1`, every evaluation at an odd power of `zeta` is one entry
//! of a length-`N` DFT of the twisted coefficients `m_k * zeta^k`, so both
//! directions cost one `rustfft` transform.

use std::{f64::consts::PI, fmt, sync::Arc};

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use crate::math::modular::pow_mod;

#[derive(Clone)]
pub struct SlotTransform {
    degree: usize,
    twist: Vec<Complex64>,
    slot_index: Vec<usize>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for SlotTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotTransform")
            .field("degree", &self.degree)
            .field("slots", &self.slot_index.len())
            .finish_non_exhaustive()
    }
}

impl SlotTransform {
    pub fn new(degree: usize) -> Self {
        debug_assert!(degree >= 4 && degree.is_power_of_two());
        let slots = degree / 2;
        let order = 2 * degree as u64;

        let twist = (0..degree)
            .map(|k| Complex64::from_polar(1.0, PI * k as f64 / degree as f64))
            .collect();
        let slot_index = (0..slots)
            .map(|j| ((pow_mod(5, j as u64, order) - 1) / 2) as usize)
            .collect();

        let mut planner = FftPlanner::new();
        Self {
            degree,
            twist,
            slot_index,
            forward: planner.plan_fft_forward(degree),
            inverse: planner.plan_fft_inverse(degree),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slot_index.len()
    }

    /// Real coefficients whose embedding carries `values` in the first
    /// `values.len()` slots and zero elsewhere.
    pub fn slots_to_coeffs(&self, values: &[f64]) -> Vec<f64> {
        debug_assert!(values.len() <= self.slot_count());
        let n = self.degree;
        let mut buffer = vec![Complex64::new(0.0, 0.0); n];
        for (&t, &value) in self.slot_index.iter().zip(values) {
            buffer[t] = Complex64::new(value, 0.0);
            buffer[n - 1 - t] = Complex64::new(value, 0.0);
        }
        self.forward.process(&mut buffer);
        buffer
            .iter()
            .zip(&self.twist)
            .map(|(a, w)| (a * w.conj()).re / n as f64)
            .collect()
    }

    /// Real parts of all slots of the polynomial with coefficients `coeffs`.
    pub fn coeffs_to_slots(&self, coeffs: &[f64]) -> Vec<f64> {
        debug_assert_eq!(coeffs.len(), self.degree);
        let mut buffer: Vec<Complex64> = coeffs
            .iter()
            .zip(&self.twist)
            .map(|(&m, w)| w * m)
            .collect();
        self.inverse.process(&mut buffer);
        self.slot_index.iter().map(|&t| buffer[t].re).collect()
    }
}
