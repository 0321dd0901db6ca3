use std::sync::Arc;

use super::{Plaintext, SlotTransform, Value, ValueKind};
use crate::crypto::errors::{HeError, HeResult};
use crate::rings::{RnsBasis, RnsPoly};

/// Maps native values to plaintexts of one session and back.
///
/// Scalars become constant polynomials, so they occupy every slot and
/// combine with vectors by broadcasting. Vectors go through the canonical
/// embedding and fill the leading slots.
///
/// Fresh encodings are bounded by `q_0 / 2` so they stay decodable at every
/// level. Decoding reconstructs coefficients over the plaintext's whole
/// basis, so results computed at level `l` may grow up to `(q_0 … q_l) / 2`.
#[derive(Debug, Clone)]
pub struct Encoder {
    session_id: u64,
    slots: SlotTransform,
    level_bases: Vec<Arc<RnsBasis>>,
}

impl Encoder {
    /// `level_bases[l]` is the basis `q_0 … q_l`.
    pub fn new(session_id: u64, level_bases: Vec<Arc<RnsBasis>>) -> Self {
        let degree = level_bases[0].degree();
        Self {
            session_id,
            slots: SlotTransform::new(degree),
            level_bases,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.slot_count()
    }

    pub fn max_level(&self) -> usize {
        self.level_bases.len() - 1
    }

    pub fn encode(&self, value: &Value, scale: f64, level: usize) -> HeResult<Plaintext> {
        match value {
            Value::Int(v) => self.encode_scalar(*v as f64, ValueKind::Int, scale, level),
            Value::Float(v) => self.encode_scalar(*v, ValueKind::Float, scale, level),
            Value::Vector(values) => self.encode_vector(values, scale, level),
        }
    }

    pub fn encode_int(&self, value: i64, scale: f64, level: usize) -> HeResult<Plaintext> {
        self.encode_scalar(value as f64, ValueKind::Int, scale, level)
    }

    pub fn encode_float(&self, value: f64, scale: f64, level: usize) -> HeResult<Plaintext> {
        self.encode_scalar(value, ValueKind::Float, scale, level)
    }

    pub fn encode_vector(&self, values: &[f64], scale: f64, level: usize) -> HeResult<Plaintext> {
        let capacity = self.slot_count();
        if values.len() > capacity {
            return Err(HeError::Capacity {
                len: values.len(),
                capacity,
            });
        }
        let basis = self.basis(level, scale)?;
        let worst = values
            .iter()
            .copied()
            .find(|v| !v.is_finite())
            .unwrap_or_else(|| values.iter().fold(0.0, |acc, v| acc.max(v.abs())));
        self.check_range(worst, scale)?;

        let coeffs: Vec<i64> = self
            .slots
            .slots_to_coeffs(values)
            .iter()
            .map(|c| (c * scale).round() as i64)
            .collect();
        Ok(Plaintext {
            poly: RnsPoly::from_signed_coeffs(&coeffs, basis),
            scale,
            level,
            kind: ValueKind::Vector { len: values.len() },
            constant: None,
            session_id: self.session_id,
        })
    }

    fn encode_scalar(&self, value: f64, kind: ValueKind, scale: f64, level: usize) -> HeResult<Plaintext> {
        let basis = self.basis(level, scale)?;
        self.check_range(value, scale)?;
        let scaled = (value * scale).round() as i64;
        Ok(Plaintext {
            poly: RnsPoly::constant(scaled, basis),
            scale,
            level,
            kind,
            constant: Some(scaled),
            session_id: self.session_id,
        })
    }

    pub fn decode(&self, plaintext: &Plaintext) -> HeResult<Value> {
        if plaintext.session_id != self.session_id {
            return Err(HeError::KeyMismatch {
                expected: self.session_id,
                found: plaintext.session_id,
            });
        }
        let mut poly = plaintext.poly.clone();
        poly.to_coeff_domain();
        let coeffs = poly.centered_coeffs();
        let scale = plaintext.scale;

        Ok(match plaintext.kind {
            ValueKind::Int => Value::Int((coeffs[0] / scale).round() as i64),
            ValueKind::Float => Value::Float(coeffs[0] / scale),
            ValueKind::Vector { len } => {
                let unscaled: Vec<f64> = coeffs.iter().map(|&c| c / scale).collect();
                let mut slots = self.slots.coeffs_to_slots(&unscaled);
                slots.truncate(len);
                Value::Vector(slots)
            }
        })
    }

    /// Largest magnitude encodable at `scale`. Decoding tolerates more at
    /// higher levels, see [`Encoder::decode_bound`].
    pub fn value_bound(&self, scale: f64) -> f64 {
        self.level_bases[0].modulus(0) as f64 / 2.0 / scale
    }

    /// Largest magnitude a plaintext at `level` and `scale` decodes without
    /// wrapping.
    pub fn decode_bound(&self, level: usize, scale: f64) -> f64 {
        self.level_bases
            .get(level)
            .map(|basis| {
                basis
                    .moduli()
                    .iter()
                    .fold(0.5 / scale, |acc, &q| acc * q as f64)
            })
            .unwrap_or(f64::NAN)
    }

    fn check_range(&self, value: f64, scale: f64) -> HeResult<()> {
        let bound = self.value_bound(scale);
        if value.is_finite() && value.abs() < bound {
            Ok(())
        } else {
            Err(HeError::ValueOutOfRange { value, bound })
        }
    }

    fn basis(&self, level: usize, scale: f64) -> HeResult<Arc<RnsBasis>> {
        if !(scale.is_finite() && scale >= 1.0) {
            return Err(HeError::parameter(format!("scale {scale} must be finite and at least 1")));
        }
        self.level_bases
            .get(level)
            .cloned()
            .ok_or_else(|| HeError::parameter(format!("level {level} exceeds the modulus chain")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ntt_prime_below;
    use approx::assert_abs_diff_eq;

    const DEGREE: usize = 32;

    fn encoder() -> Encoder {
        let q0 = ntt_prime_below(1 << 60, DEGREE as u64).unwrap();
        let q1 = ntt_prime_below(1 << 30, DEGREE as u64).unwrap();
        let full = RnsBasis::new(DEGREE, &[q0, q1]).unwrap();
        let bases = vec![Arc::new(full.sub_basis(&[0]).unwrap()), Arc::new(full)];
        Encoder::new(7, bases)
    }

    #[test]
    fn integers_round_trip_exactly() {
        let encoder = encoder();
        for value in [0i64, 1, -1, 42, -123_456] {
            let pt = encoder.encode_int(value, 2f64.powi(30), 1).unwrap();
            assert_eq!(pt.constant_term(), Some(value << 30));
            assert_eq!(encoder.decode(&pt).unwrap(), Value::Int(value));
        }
    }

    #[test]
    fn floats_round_trip_within_scale() {
        let encoder = encoder();
        let scale = 2f64.powi(30);
        let pt = encoder.encode_float(-3.25e-3, scale, 0).unwrap();
        let decoded = encoder.decode(&pt).unwrap().as_f64().unwrap();
        assert_abs_diff_eq!(decoded, -3.25e-3, epsilon = 1.0 / scale);
    }

    #[test]
    fn vectors_round_trip_and_keep_length() {
        let encoder = encoder();
        let values = [1.5, -2.25, 0.0, 100.125, -0.001];
        let pt = encoder.encode_vector(&values, 2f64.powi(30), 1).unwrap();
        assert_eq!(pt.kind(), ValueKind::Vector { len: 5 });
        let decoded = encoder.decode(&pt).unwrap();
        for (got, want) in decoded.as_slice().unwrap().iter().zip(&values) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-6);
        }
    }

    #[test]
    fn decode_reads_beyond_the_first_modulus() {
        let encoder = encoder();
        let scale = 2f64.powi(30);
        let big = -(3i64 << 60);
        let pt = Plaintext {
            poly: RnsPoly::constant(big, encoder.level_bases[1].clone()),
            scale,
            level: 1,
            kind: ValueKind::Int,
            constant: Some(big),
            session_id: 7,
        };
        assert!((big as f64 / scale).abs() > encoder.value_bound(scale));
        assert!((big as f64 / scale).abs() < encoder.decode_bound(1, scale));
        assert_eq!(encoder.decode(&pt).unwrap(), Value::Int(-(3 << 30)));
    }

    #[test]
    fn capacity_is_half_the_degree() {
        let encoder = encoder();
        let full = vec![1.0; DEGREE / 2];
        assert!(encoder.encode_vector(&full, 1024.0, 0).is_ok());
        let over = vec![1.0; DEGREE / 2 + 1];
        assert_eq!(
            encoder.encode_vector(&over, 1024.0, 0).unwrap_err(),
            HeError::Capacity {
                len: DEGREE / 2 + 1,
                capacity: DEGREE / 2
            }
        );
    }

    #[test]
    fn out_of_range_and_non_finite_values_are_rejected() {
        let encoder = encoder();
        let scale = 2f64.powi(40);
        assert!(matches!(
            encoder.encode_float(1e9, scale, 0),
            Err(HeError::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            encoder.encode_float(f64::NAN, scale, 0),
            Err(HeError::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            encoder.encode_vector(&[1.0, f64::INFINITY], scale, 0),
            Err(HeError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn bad_level_or_scale_is_a_parameter_error() {
        let encoder = encoder();
        assert!(matches!(encoder.encode_int(1, 1024.0, 2), Err(HeError::Parameter { .. })));
        assert!(matches!(encoder.encode_int(1, 0.5, 0), Err(HeError::Parameter { .. })));
    }

    #[test]
    fn foreign_plaintexts_are_rejected() {
        let encoder = encoder();
        let mut pt = encoder.encode_int(5, 1024.0, 0).unwrap();
        pt.session_id = 8;
        assert_eq!(
            encoder.decode(&pt).unwrap_err(),
            HeError::KeyMismatch {
                expected: 7,
                found: 8
            }
        );
    }
}
