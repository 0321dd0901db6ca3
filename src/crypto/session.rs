use std::sync::Arc;

use rand::Rng;
use tracing::instrument;

use super::{
    builder::SessionBuilder,
    ciphertext::{Ciphertext, CiphertextData},
    context::SchemeContext,
    errors::{HeError, HeResult},
};
use crate::encoding::{Plaintext, Value};
use crate::keys::{EvaluationKeys, KeySet, PublicKey, SecretKey, error_poly};
use crate::math::ternary_coefficients;
use crate::params::EncryptionParameters;
use crate::rings::RnsPoly;

/// Public half of a session: context, public key and evaluation keys.
/// Shared by every ciphertext the session produces.
#[derive(Debug)]
pub(crate) struct SessionInner {
    pub(crate) context: SchemeContext,
    pub(crate) public_key: PublicKey,
    pub(crate) evaluation_keys: EvaluationKeys,
    pub(crate) error_std: f64,
}

impl SessionInner {
    pub(crate) fn id(&self) -> u64 {
        self.context.id()
    }

    pub(crate) fn check_session(&self, found: u64) -> HeResult<()> {
        if found == self.id() {
            Ok(())
        } else {
            Err(HeError::KeyMismatch {
                expected: self.id(),
                found,
            })
        }
    }

    /// `c0 = b*u + e0 + m`, `c1 = a*u + e1` with the public key cut down to
    /// the plaintext's level.
    #[instrument(level = "debug", skip_all, fields(level = plaintext.level, kind = ?plaintext.kind))]
    pub(crate) fn encrypt_plaintext<R: Rng + ?Sized>(
        self: &Arc<Self>,
        plaintext: &Plaintext,
        rng: &mut R,
    ) -> HeResult<Ciphertext> {
        self.check_session(plaintext.session_id)?;
        let basis = self.context.level_basis(plaintext.level);
        let degree = basis.degree();
        let (b, a) = self.public_key.at_level(basis);

        let u_coeffs = ternary_coefficients(degree / 2, degree, rng);
        let mut u = RnsPoly::from_signed_coeffs(&u_coeffs, Arc::clone(basis));
        u.to_ntt_domain();

        let mut c0 = b;
        c0.mul_assign_ntt(&u);
        c0 += &error_poly(self.error_std, Arc::clone(basis), rng);
        c0.to_coeff_domain();
        c0 += &plaintext.poly;

        let mut c1 = a;
        c1.mul_assign_ntt(&u);
        c1 += &error_poly(self.error_std, Arc::clone(basis), rng);
        c1.to_coeff_domain();

        Ok(Ciphertext {
            components: vec![c0, c1],
            level: plaintext.level,
            scale: plaintext.scale,
            kind: plaintext.kind,
            session: Arc::clone(self),
        })
    }

    pub(crate) fn restore_ciphertext(self: &Arc<Self>, data: CiphertextData) -> HeResult<Ciphertext> {
        self.check_session(data.session_id)?;
        if data.level > self.context.max_level() {
            return Err(HeError::parameter(format!(
                "level {} exceeds the modulus chain",
                data.level
            )));
        }
        if !(2..=3).contains(&data.components.len()) {
            return Err(HeError::parameter(format!(
                "a ciphertext has 2 or 3 components, got {}",
                data.components.len()
            )));
        }
        if !(data.scale.is_finite() && data.scale >= 1.0) {
            return Err(HeError::parameter(format!("scale {} is not usable", data.scale)));
        }
        let basis = self.context.level_basis(data.level);
        let components = data
            .components
            .into_iter()
            .map(|poly| {
                if poly.basis() != basis || poly.is_ntt_domain() {
                    Err(HeError::parameter(format!(
                        "component is not a coefficient-domain polynomial of level {}",
                        data.level
                    )))
                } else {
                    Ok(poly.rebind(Arc::clone(basis)))
                }
            })
            .collect::<HeResult<Vec<_>>>()?;
        Ok(Ciphertext {
            components,
            level: data.level,
            scale: data.scale,
            kind: data.kind,
            session: Arc::clone(self),
        })
    }
}

/// Everything needed to encrypt and evaluate, but not to decrypt.
///
/// Cheap to clone and safe to hand to other threads or parties.
#[derive(Debug, Clone)]
pub struct Encryptor {
    inner: Arc<SessionInner>,
}

impl Encryptor {
    pub fn id(&self) -> u64 {
        self.inner.id()
    }

    pub fn parameters(&self) -> &EncryptionParameters {
        self.inner.context.params()
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.inner.public_key
    }

    pub fn evaluation_keys(&self) -> &EvaluationKeys {
        &self.inner.evaluation_keys
    }

    /// Encodes at the default scale and the top level.
    pub fn encode(&self, value: impl Into<Value>) -> HeResult<Plaintext> {
        let context = &self.inner.context;
        context.encoder().encode(
            &value.into(),
            context.canonical_scale(context.max_level()),
            context.max_level(),
        )
    }

    pub fn encode_at(&self, value: impl Into<Value>, scale: f64, level: usize) -> HeResult<Plaintext> {
        self.inner.context.encoder().encode(&value.into(), scale, level)
    }

    pub fn decode(&self, plaintext: &Plaintext) -> HeResult<Value> {
        self.inner.context.encoder().decode(plaintext)
    }

    /// Rebinds a detached ciphertext of this session. Fails with
    /// `KeyMismatch` for data produced by any other session.
    pub fn restore_ciphertext(&self, data: CiphertextData) -> HeResult<Ciphertext> {
        self.inner.restore_ciphertext(data)
    }

    /// Largest magnitude [`Encryptor::encode`] accepts. Results may grow
    /// past it as long as they stay below the bound of their level.
    pub fn value_bound(&self) -> f64 {
        let context = &self.inner.context;
        context.encoder().value_bound(context.canonical_scale(context.max_level()))
    }

    pub fn encrypt(&self, value: impl Into<Value>) -> HeResult<Ciphertext> {
        self.encrypt_with_rng(value, &mut rand::rng())
    }

    pub fn encrypt_with_rng<R: Rng + ?Sized>(
        &self,
        value: impl Into<Value>,
        rng: &mut R,
    ) -> HeResult<Ciphertext> {
        let plaintext = self.encode(value)?;
        self.inner.encrypt_plaintext(&plaintext, rng)
    }

    /// Encrypts at the top level with an explicit scale instead of the
    /// session default.
    pub fn encrypt_with_scale(&self, value: impl Into<Value>, scale: f64) -> HeResult<Ciphertext> {
        let level = self.inner.context.max_level();
        let plaintext = self.encode_at(value, scale, level)?;
        self.inner.encrypt_plaintext(&plaintext, &mut rand::rng())
    }

    pub fn encrypt_plaintext(&self, plaintext: &Plaintext) -> HeResult<Ciphertext> {
        self.inner.encrypt_plaintext(plaintext, &mut rand::rng())
    }
}

/// A key-holding session: one parameter set, one key set, fixed for life.
///
/// Every ciphertext produced under a session is bound to it; combining or
/// decrypting handles across sessions fails with [`HeError::KeyMismatch`].
#[derive(Debug, Clone)]
pub struct Session {
    encryptor: Encryptor,
    secret_key: SecretKey,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Generates a fresh key set for explicit parameters.
    pub fn new(params: EncryptionParameters) -> HeResult<Self> {
        SessionBuilder::new().build_with_parameters(params)
    }

    /// Selects parameters for `max_multiplicative_depth` and
    /// `precision_hint`, then generates keys.
    pub fn with_depth(max_multiplicative_depth: usize, precision_hint: u32) -> HeResult<Self> {
        SessionBuilder::new()
            .max_multiplicative_depth(max_multiplicative_depth)
            .precision_hint(precision_hint)
            .build()
    }

    pub(crate) fn from_key_set(context: SchemeContext, keys: KeySet, error_std: f64) -> Self {
        let inner = SessionInner {
            context,
            public_key: keys.public_key,
            evaluation_keys: keys.evaluation_keys,
            error_std,
        };
        Self {
            encryptor: Encryptor {
                inner: Arc::new(inner),
            },
            secret_key: keys.secret_key,
        }
    }

    pub fn id(&self) -> u64 {
        self.encryptor.id()
    }

    pub fn parameters(&self) -> &EncryptionParameters {
        self.encryptor.parameters()
    }

    pub fn encryptor(&self) -> Encryptor {
        self.encryptor.clone()
    }

    pub fn public_key(&self) -> &PublicKey {
        self.encryptor.public_key()
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub fn evaluation_keys(&self) -> &EvaluationKeys {
        self.encryptor.evaluation_keys()
    }

    /// Owned copy of every key, e.g. to save the session and bring it back
    /// with [`SessionBuilder::restore`].
    pub fn key_set(&self) -> KeySet {
        KeySet {
            public_key: self.public_key().clone(),
            secret_key: self.secret_key.clone(),
            evaluation_keys: self.evaluation_keys().clone(),
        }
    }

    /// `(public, secret, evaluation)` keys of this session.
    pub fn keys(&self) -> (&PublicKey, &SecretKey, &EvaluationKeys) {
        (self.public_key(), &self.secret_key, self.evaluation_keys())
    }

    pub fn encode(&self, value: impl Into<Value>) -> HeResult<Plaintext> {
        self.encryptor.encode(value)
    }

    pub fn encode_at(&self, value: impl Into<Value>, scale: f64, level: usize) -> HeResult<Plaintext> {
        self.encryptor.encode_at(value, scale, level)
    }

    pub fn decode(&self, plaintext: &Plaintext) -> HeResult<Value> {
        self.encryptor.decode(plaintext)
    }

    pub fn value_bound(&self) -> f64 {
        self.encryptor.value_bound()
    }

    pub fn restore_ciphertext(&self, data: CiphertextData) -> HeResult<Ciphertext> {
        self.encryptor.restore_ciphertext(data)
    }

    pub fn encrypt(&self, value: impl Into<Value>) -> HeResult<Ciphertext> {
        self.encryptor.encrypt(value)
    }

    pub fn encrypt_with_rng<R: Rng + ?Sized>(
        &self,
        value: impl Into<Value>,
        rng: &mut R,
    ) -> HeResult<Ciphertext> {
        self.encryptor.encrypt_with_rng(value, rng)
    }

    pub fn encrypt_with_scale(&self, value: impl Into<Value>, scale: f64) -> HeResult<Ciphertext> {
        self.encryptor.encrypt_with_scale(value, scale)
    }

    pub fn encrypt_plaintext(&self, plaintext: &Plaintext) -> HeResult<Ciphertext> {
        self.encryptor.encrypt_plaintext(plaintext)
    }

    #[instrument(skip_all, fields(level = ciphertext.level(), terms = ciphertext.size_terms()))]
    pub fn decrypt(&self, ciphertext: &Ciphertext) -> HeResult<Value> {
        ciphertext.decrypt(&self.secret_key)
    }

    pub fn decrypt_to_plaintext(&self, ciphertext: &Ciphertext) -> HeResult<Plaintext> {
        ciphertext.decrypt_to_plaintext(&self.secret_key)
    }
}
