use std::{fmt, sync::Arc};

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{KeyError, KeyResult};
use crate::math::ternary_coefficients;
use crate::rings::{RnsBasis, RnsPoly};

/// Parameters for secret key generation.
#[derive(Debug, Clone, Copy)]
pub struct SecretKeyParams {
    /// Number of non-zero ternary coefficients.
    pub hamming_weight: usize,
}

impl SecretKeyParams {
    pub fn validate(&self, degree: usize) -> KeyResult<()> {
        if self.hamming_weight == 0 || self.hamming_weight > degree {
            return Err(KeyError::InvalidHammingWeight {
                weight: self.hamming_weight,
                degree,
            });
        }
        Ok(())
    }
}

/// Sparse ternary secret `s`, held over the full key basis `q_0 … q_L, P`.
///
/// Only the decrypting party should hold this value; it never leaves the
/// session that generated it except through explicit cloning.
#[derive(Clone, Serialize, Deserialize)]
pub struct SecretKey {
    coeffs: Vec<i64>,
    poly: RnsPoly,
    session_id: u64,
}

impl SecretKey {
    pub fn generate<R: Rng + ?Sized>(
        params: &SecretKeyParams,
        key_basis: Arc<RnsBasis>,
        session_id: u64,
        rng: &mut R,
    ) -> KeyResult<Self> {
        params.validate(key_basis.degree())?;
        let coeffs = ternary_coefficients(params.hamming_weight, key_basis.degree(), rng);
        let mut poly = RnsPoly::from_signed_coeffs(&coeffs, key_basis);
        poly.to_ntt_domain();
        Ok(Self {
            coeffs,
            poly,
            session_id,
        })
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn hamming_weight(&self) -> usize {
        self.coeffs.iter().filter(|&&c| c != 0).count()
    }

    /// NTT-domain secret over the full key basis.
    pub(crate) fn poly(&self) -> &RnsPoly {
        &self.poly
    }

    pub(crate) fn coeffs(&self) -> &[i64] {
        &self.coeffs
    }

    /// NTT-domain secret restricted to the first `channels` moduli.
    pub(crate) fn leading_channels(&self, channels: usize, basis: Arc<RnsBasis>) -> RnsPoly {
        self.poly.truncate_channels(channels, basis)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("session_id", &format_args!("{:#018x}", self.session_id))
            .finish_non_exhaustive()
    }
}
