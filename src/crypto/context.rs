use std::sync::Arc;

use tracing::debug;

use super::errors::HeResult;
use crate::encoding::Encoder;
use crate::params::EncryptionParameters;
use crate::rings::RnsBasis;

/// When the engine relinearizes the 3-term product of a multiplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelinearizationPolicy {
    /// Relinearize right after every ciphertext multiplication.
    #[default]
    Immediate,
    /// Keep 3-term products until an operation needs two terms: another
    /// multiplication, a rotation, or decryption.
    Deferred,
}

/// Immutable per-session bundle of parameters and the data derived from
/// them. Built once, before any key exists.
#[derive(Debug)]
pub struct SchemeContext {
    id: u64,
    params: EncryptionParameters,
    level_bases: Vec<Arc<RnsBasis>>,
    key_bases: Vec<Arc<RnsBasis>>,
    scales: Vec<f64>,
    encoder: Encoder,
    relinearization: RelinearizationPolicy,
}

impl SchemeContext {
    pub fn new(
        params: EncryptionParameters,
        id: u64,
        relinearization: RelinearizationPolicy,
    ) -> HeResult<Self> {
        let mut moduli = params.modulus_chain().to_vec();
        moduli.push(params.special_modulus());
        let full = RnsBasis::new(params.ring_degree(), &moduli)?;

        let max_level = params.max_level();
        let special_channel = max_level + 1;
        let mut level_bases = Vec::with_capacity(max_level + 1);
        let mut key_bases = Vec::with_capacity(max_level + 1);
        for level in 0..=max_level {
            let mut indices: Vec<usize> = (0..=level).collect();
            level_bases.push(Arc::new(full.sub_basis(&indices)?));
            indices.push(special_channel);
            key_bases.push(Arc::new(full.sub_basis(&indices)?));
        }

        // s_L = 2^scale_bits, s_{l-1} = s_l^2 / q_l: the scale a product of
        // two level-l operands has after its rescale.
        let mut scales = vec![0.0; max_level + 1];
        scales[max_level] = params.default_scale();
        for level in (1..=max_level).rev() {
            let s = scales[level];
            scales[level - 1] = s * s / params.modulus_chain()[level] as f64;
        }
        debug!(?scales, "derived canonical scales");

        let encoder = Encoder::new(id, level_bases.clone());
        Ok(Self {
            id,
            params,
            level_bases,
            key_bases,
            scales,
            encoder,
            relinearization,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn params(&self) -> &EncryptionParameters {
        &self.params
    }

    pub fn max_level(&self) -> usize {
        self.params.max_level()
    }

    /// Basis `q_0 … q_level`.
    pub fn level_basis(&self, level: usize) -> &Arc<RnsBasis> {
        &self.level_bases[level]
    }

    /// Basis `q_0 … q_level, P` used while key switching at `level`.
    pub fn key_basis(&self, level: usize) -> &Arc<RnsBasis> {
        &self.key_bases[level]
    }

    /// Basis `q_0 … q_L, P` that key material lives in.
    pub fn full_key_basis(&self) -> &Arc<RnsBasis> {
        &self.key_bases[self.max_level()]
    }

    /// The scale every ciphertext at `level` carries unless encrypted at a
    /// custom scale.
    pub fn canonical_scale(&self, level: usize) -> f64 {
        self.scales[level]
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn relinearization(&self) -> RelinearizationPolicy {
        self.relinearization
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::select_parameters;

    #[test]
    fn bases_follow_the_chain() {
        let params = select_parameters(2, 20).unwrap();
        let chain = params.modulus_chain().to_vec();
        let special = params.special_modulus();
        let context = SchemeContext::new(params, 9, RelinearizationPolicy::Immediate).unwrap();

        assert_eq!(context.level_basis(0).moduli(), &chain[..1]);
        assert_eq!(context.level_basis(2).moduli(), &chain[..]);
        assert_eq!(context.key_basis(1).moduli(), &[chain[0], chain[1], special]);
        assert_eq!(context.full_key_basis().channel_count(), 4);
    }

    #[test]
    fn canonical_scales_stay_near_the_default() {
        let params = select_parameters(3, 10).unwrap();
        let context = SchemeContext::new(params, 1, RelinearizationPolicy::Immediate).unwrap();
        assert_eq!(context.canonical_scale(3), 2f64.powi(30));
        for level in 0..3 {
            let ratio = context.canonical_scale(level) / 2f64.powi(30);
            assert!((ratio - 1.0).abs() < 1e-2, "level {level}: ratio {ratio}");
        }
    }
}
