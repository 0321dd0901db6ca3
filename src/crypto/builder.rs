use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::info;

use super::{
    context::{RelinearizationPolicy, SchemeContext},
    errors::{HeError, HeResult},
    session::Session,
};
use crate::keys::{EvaluationKeys, KeySet, PublicKey, SecretKey, SecretKeyParams};
use crate::params::{EncryptionParameters, ParameterSelector, SecurityLevel};

pub const DEFAULT_DEPTH: usize = 2;
pub const DEFAULT_PRECISION_BITS: u32 = 20;
pub const DEFAULT_HAMMING_WEIGHT: usize = 64;
pub const DEFAULT_ERROR_STD: f64 = 3.2;

/// Configures and creates a [`Session`].
///
/// Parameters are selected (or validated) first and key material is
/// generated last, so nothing about a session changes after `build`.
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    max_multiplicative_depth: Option<usize>,
    precision_hint: Option<u32>,
    security_level: Option<SecurityLevel>,
    relinearization: Option<RelinearizationPolicy>,
    hamming_weight: Option<usize>,
    error_std: Option<f64>,
    rotations: Vec<i64>,
    conjugation: bool,
    seed: Option<u64>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_multiplicative_depth(mut self, depth: usize) -> Self {
        self.max_multiplicative_depth = Some(depth);
        self
    }

    /// Bits of fractional precision decoded values should keep.
    pub fn precision_hint(mut self, bits: u32) -> Self {
        self.precision_hint = Some(bits);
        self
    }

    pub fn security_level(mut self, level: SecurityLevel) -> Self {
        self.security_level = Some(level);
        self
    }

    pub fn relinearization(mut self, policy: RelinearizationPolicy) -> Self {
        self.relinearization = Some(policy);
        self
    }

    /// Non-zero coefficients of the ternary secret (default 64).
    pub fn hamming_weight(mut self, weight: usize) -> Self {
        self.hamming_weight = Some(weight);
        self
    }

    pub fn error_std(mut self, std_dev: f64) -> Self {
        self.error_std = Some(std_dev);
        self
    }

    /// Slot rotations to generate Galois keys for.
    pub fn rotations(mut self, steps: &[i64]) -> Self {
        self.rotations.extend_from_slice(steps);
        self
    }

    /// Also generate the conjugation key (Galois element `2N - 1`).
    pub fn conjugation(mut self, enabled: bool) -> Self {
        self.conjugation = enabled;
        self
    }

    /// Seeds key generation, which makes the key material reproducible.
    /// Session ids are always fresh, so two sessions built from one seed
    /// still reject each other's ciphertexts. Encryption randomness is
    /// unaffected.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> HeResult<Session> {
        let params = ParameterSelector::new(
            self.max_multiplicative_depth.unwrap_or(DEFAULT_DEPTH),
            self.precision_hint.unwrap_or(DEFAULT_PRECISION_BITS),
        )
        .security_level(self.security_level.unwrap_or_default())
        .select()?;
        self.build_with_parameters(params)
    }

    pub fn build_with_parameters(self, params: EncryptionParameters) -> HeResult<Session> {
        let mut rng = match self.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_rng(&mut rand::rng()),
        };
        let id: u64 = rand::rng().random();
        let degree = params.ring_degree();
        let hamming_weight = self
            .hamming_weight
            .unwrap_or(DEFAULT_HAMMING_WEIGHT.min(degree / 2));
        let error_std = self.error_std.unwrap_or(DEFAULT_ERROR_STD);

        let context = SchemeContext::new(
            params,
            id,
            self.relinearization.unwrap_or_default(),
        )?;
        let secret_key = SecretKey::generate(
            &SecretKeyParams { hamming_weight },
            context.full_key_basis().clone(),
            id,
            &mut rng,
        )?;
        let evaluation_keys =
            EvaluationKeys::generate(
                &secret_key,
                &self.rotations,
                self.conjugation,
                error_std,
                &mut rng,
            )?;
        let public_key = PublicKey::generate(
            &secret_key,
            context.level_basis(context.max_level()).clone(),
            error_std,
            &mut rng,
        );

        info!(
            session = format_args!("{id:#018x}"),
            parameters = %context.params(),
            rotation_keys = evaluation_keys.rotation_count(),
            policy = ?context.relinearization(),
            "created session"
        );

        let keys = KeySet {
            public_key,
            secret_key,
            evaluation_keys,
        };
        Ok(Session::from_key_set(context, keys, error_std))
    }

    /// Rebuilds a session from saved parameters and keys. The session keeps
    /// the id its keys were generated under, so saved ciphertexts of that
    /// session can be restored into it. Only the relinearization policy and
    /// the error deviation of this builder apply.
    pub fn restore(self, params: EncryptionParameters, keys: KeySet) -> HeResult<Session> {
        let id = keys.secret_key.session_id();
        if keys.public_key.session_id() != id {
            return Err(HeError::KeyMismatch {
                expected: id,
                found: keys.public_key.session_id(),
            });
        }
        let error_std = self.error_std.unwrap_or(DEFAULT_ERROR_STD);
        let context = SchemeContext::new(params, id, self.relinearization.unwrap_or_default())?;

        let full = context.full_key_basis();
        let top = context.level_basis(context.max_level());
        let switch_keys_match = keys.evaluation_keys.switch_keys().all(|key| {
            key.basis() == Some(full) && key.digit_count() == context.max_level() + 1
        });
        if keys.secret_key.poly().basis() != full
            || keys.public_key.basis() != top
            || !switch_keys_match
        {
            return Err(HeError::parameter(
                "key material was generated for a different modulus chain",
            ));
        }

        info!(
            session = format_args!("{id:#018x}"),
            parameters = %context.params(),
            rotation_keys = keys.evaluation_keys.rotation_count(),
            "restored session"
        );
        Ok(Session::from_key_set(context, keys, error_std))
    }
}
