use std::sync::Arc;

use crate::math::{
    is_ntt_friendly_prime,
    modular::{inv_mod, mul_mod, pow_mod, shoup_precompute},
};

use super::errors::{RingError, RingResult};

/// Precomputed twiddles for the negacyclic NTT over `Z_q[X] / (X^N + 1)`.
///
/// Powers of the primitive `2N`-th root `psi` are stored in bit-reversed
/// order together with their Shoup quotients, the layout expected by the
/// merged Cooley-Tukey / Gentleman-Sande butterflies in [`super::ntt`].
#[derive(Debug, Clone)]
pub struct NttTable {
    pub(super) modulus: u64,
    pub(super) degree: usize,
    pub(super) psi_powers: Vec<u64>,
    pub(super) psi_powers_shoup: Vec<u64>,
    pub(super) psi_inv_powers: Vec<u64>,
    pub(super) psi_inv_powers_shoup: Vec<u64>,
    pub(super) degree_inv: u64,
    pub(super) degree_inv_shoup: u64,
}

impl NttTable {
    pub fn new(modulus: u64, degree: usize) -> RingResult<Self> {
        if degree < 2 || !degree.is_power_of_two() {
            return Err(RingError::InvalidDegree { degree });
        }
        if !is_ntt_friendly_prime(modulus, degree as u64) {
            return Err(RingError::NonNttFriendlyModulus { modulus, degree });
        }

        let psi = find_negacyclic_root(modulus, degree)
            .ok_or(RingError::NonNttFriendlyModulus { modulus, degree })?;
        let psi_inv = inv_mod(psi, modulus)
            .ok_or(RingError::NonNttFriendlyModulus { modulus, degree })?;
        let bit_count = degree.trailing_zeros();

        let mut psi_powers = vec![0u64; degree];
        let mut psi_inv_powers = vec![0u64; degree];
        let (mut power, mut inv_power) = (1u64, 1u64);
        for k in 0..degree {
            let slot = reverse_bits(k, bit_count);
            psi_powers[slot] = power;
            psi_inv_powers[slot] = inv_power;
            power = mul_mod(power, psi, modulus);
            inv_power = mul_mod(inv_power, psi_inv, modulus);
        }

        let shoup = |values: &[u64]| -> Vec<u64> {
            values.iter().map(|&w| shoup_precompute(w, modulus)).collect()
        };
        let degree_inv = inv_mod(degree as u64, modulus)
            .ok_or(RingError::NonNttFriendlyModulus { modulus, degree })?;

        Ok(Self {
            modulus,
            degree,
            psi_powers_shoup: shoup(&psi_powers),
            psi_inv_powers_shoup: shoup(&psi_inv_powers),
            psi_powers,
            psi_inv_powers,
            degree_inv,
            degree_inv_shoup: shoup_precompute(degree_inv, modulus),
        })
    }

    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    pub fn degree(&self) -> usize {
        self.degree
    }
}

/// An ordered set of NTT-friendly primes sharing one ring degree.
///
/// Sub-bases share their parent's tables through `Arc`, so building the
/// per-level bases of a modulus chain costs no extra twiddle computation.
///
/// Invariant: `moduli.len() == tables.len()` and
/// `tables[i].modulus == moduli[i]` for all `i`.
#[derive(Debug, Clone)]
pub struct RnsBasis {
    degree: usize,
    moduli: Vec<u64>,
    tables: Vec<Arc<NttTable>>,
}

// Tables are derived from `(degree, moduli)`.
impl PartialEq for RnsBasis {
    fn eq(&self, other: &Self) -> bool {
        self.degree == other.degree && self.moduli == other.moduli
    }
}

impl Eq for RnsBasis {}

impl RnsBasis {
    pub fn new(degree: usize, moduli: &[u64]) -> RingResult<Self> {
        if moduli.is_empty() {
            return Err(RingError::EmptyBasis);
        }
        for (i, &modulus) in moduli.iter().enumerate() {
            if moduli[..i].contains(&modulus) {
                return Err(RingError::DuplicateModulus { modulus });
            }
        }
        let tables = moduli
            .iter()
            .map(|&modulus| NttTable::new(modulus, degree).map(Arc::new))
            .collect::<RingResult<Vec<_>>>()?;
        Ok(Self {
            degree,
            moduli: moduli.to_vec(),
            tables,
        })
    }

    /// Builds the basis made of the selected channels, in the given order.
    pub fn sub_basis(&self, indices: &[usize]) -> RingResult<Self> {
        if indices.is_empty() {
            return Err(RingError::EmptyBasis);
        }
        let channel_count = self.channel_count();
        let mut moduli = Vec::with_capacity(indices.len());
        let mut tables = Vec::with_capacity(indices.len());
        for &index in indices {
            if index >= channel_count {
                return Err(RingError::ChannelOutOfRange { index, channel_count });
            }
            if moduli.contains(&self.moduli[index]) {
                return Err(RingError::DuplicateModulus {
                    modulus: self.moduli[index],
                });
            }
            moduli.push(self.moduli[index]);
            tables.push(Arc::clone(&self.tables[index]));
        }
        Ok(Self {
            degree: self.degree,
            moduli,
            tables,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    pub fn modulus(&self, channel: usize) -> u64 {
        self.moduli[channel]
    }

    pub fn ntt_table(&self, channel: usize) -> &NttTable {
        &self.tables[channel]
    }

    pub fn channel_count(&self) -> usize {
        self.moduli.len()
    }
}

/// Finds `psi` with `psi^N = -1 (mod q)`, i.e. a primitive `2N`-th root.
fn find_negacyclic_root(modulus: u64, degree: usize) -> Option<u64> {
    let exponent = (modulus - 1) / (2 * degree as u64);
    (2..modulus.min(1 << 20))
        .map(|candidate| pow_mod(candidate, exponent, modulus))
        .find(|&psi| pow_mod(psi, degree as u64, modulus) == modulus - 1)
}

pub(super) fn reverse_bits(value: usize, bit_count: u32) -> usize {
    value.reverse_bits() >> (usize::BITS - bit_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_table_with_negacyclic_root() {
        let table = NttTable::new(17, 8).unwrap();
        assert_eq!(table.psi_powers[0], 1);
        // psi sits at bit-reversed index 1 -> slot 4 for N = 8.
        let psi = table.psi_powers[4];
        assert_eq!(pow_mod(psi, 8, 17), 16);
        assert_eq!(mul_mod(table.degree_inv, 8, 17), 1);
    }

    #[test]
    fn rejects_bad_degree_and_modulus() {
        assert_eq!(
            NttTable::new(17, 6).unwrap_err(),
            RingError::InvalidDegree { degree: 6 }
        );
        assert_eq!(
            NttTable::new(19, 8).unwrap_err(),
            RingError::NonNttFriendlyModulus {
                modulus: 19,
                degree: 8
            }
        );
    }

    #[test]
    fn rejects_empty_and_duplicate_bases() {
        assert_eq!(RnsBasis::new(8, &[]).unwrap_err(), RingError::EmptyBasis);
        assert_eq!(
            RnsBasis::new(8, &[17, 97, 17]).unwrap_err(),
            RingError::DuplicateModulus { modulus: 17 }
        );
    }

    #[test]
    fn sub_basis_shares_tables() {
        let basis = RnsBasis::new(8, &[17, 97, 113]).unwrap();
        let sub = basis.sub_basis(&[0, 2]).unwrap();
        assert_eq!(sub.moduli(), &[17, 113]);
        assert!(Arc::ptr_eq(&sub.tables[1], &basis.tables[2]));
        assert!(matches!(
            basis.sub_basis(&[3]),
            Err(RingError::ChannelOutOfRange { index: 3, .. })
        ));
    }
}
