use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use super::{engine, errors::HeResult, session::SessionInner};
use crate::encoding::{Plaintext, Value, ValueKind};
use crate::keys::SecretKey;
use crate::params::EncryptionParameters;
use crate::rings::RnsPoly;

/// An encrypted value and the metadata the engine needs to keep
/// composition safe.
///
/// Handles are immutable: every operation returns a new handle and leaves
/// its operands untouched, so one handle can feed any number of
/// independent expressions, on any number of threads.
#[derive(Clone)]
pub struct Ciphertext {
    /// Coefficient-domain polynomials over the basis of `level`; decrypting
    /// evaluates `sum_i components[i] * s^i`.
    pub(crate) components: Vec<RnsPoly>,
    pub(crate) level: usize,
    pub(crate) scale: f64,
    pub(crate) kind: ValueKind,
    pub(crate) session: Arc<SessionInner>,
}

impl Ciphertext {
    /// Remaining rescale steps in the modulus chain.
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Number of polynomial components: 2 normally, 3 for an
    /// unrelinearized product under the deferred policy.
    pub fn size_terms(&self) -> usize {
        self.components.len()
    }

    pub fn session_id(&self) -> u64 {
        self.session.id()
    }

    pub fn parameters(&self) -> &EncryptionParameters {
        self.session.context.params()
    }

    pub fn components(&self) -> &[RnsPoly] {
        &self.components
    }

    pub fn decrypt(&self, secret_key: &SecretKey) -> HeResult<Value> {
        let plaintext = self.decrypt_to_plaintext(secret_key)?;
        self.session.context.encoder().decode(&plaintext)
    }

    /// `m = c0 + c1*s` over the ciphertext's level, after relinearizing a
    /// 3-term handle.
    pub fn decrypt_to_plaintext(&self, secret_key: &SecretKey) -> HeResult<Plaintext> {
        self.session.check_session(secret_key.session_id())?;
        let ciphertext = engine::relinearize(self);
        let basis = self.session.context.level_basis(self.level);
        let s = secret_key.leading_channels(basis.channel_count(), Arc::clone(basis));

        let mut poly = ciphertext.components[1].clone();
        poly.to_ntt_domain();
        poly.mul_assign_ntt(&s);
        poly.to_coeff_domain();
        poly += &ciphertext.components[0];

        Ok(Plaintext {
            poly,
            scale: self.scale,
            level: self.level,
            kind: self.kind,
            constant: None,
            session_id: self.session_id(),
        })
    }

    /// Shrinks a 3-term handle back to two terms; two-term handles are
    /// returned as a copy.
    pub fn relinearize(&self) -> Ciphertext {
        engine::relinearize(self)
    }

    /// Drops to `level`, landing on that level's canonical scale.
    pub fn lower_to_level(&self, level: usize) -> HeResult<Ciphertext> {
        engine::lower_to_level(self, level, None)
    }

    /// Cyclic slot rotation: slot `j` moves to slot `j + steps`, like
    /// `numpy.roll`. Needs a rotation key requested at session creation.
    pub fn rotate(&self, steps: i64) -> HeResult<Ciphertext> {
        engine::rotate(self, steps)
    }

    /// Complex conjugation of every slot, the analogue of swapping the two
    /// rows of a batched BFV matrix. Real-valued slots are unchanged. Needs
    /// a session built with the conjugation key.
    pub fn conjugate(&self) -> HeResult<Ciphertext> {
        engine::conjugate(self)
    }

    /// `self^exponent` by repeated squaring, consuming
    /// `ceil(log2(exponent))` levels.
    pub fn pow(&self, exponent: u32) -> HeResult<Ciphertext> {
        engine::pow(self, exponent)
    }

    /// Detaches the handle from its session so it can be stored or sent.
    pub fn to_data(&self) -> CiphertextData {
        CiphertextData {
            session_id: self.session_id(),
            level: self.level,
            scale: self.scale,
            kind: self.kind,
            components: self.components.clone(),
        }
    }
}

/// Serializable form of a [`Ciphertext`]. Becomes a handle again through
/// `restore_ciphertext` on the session it was produced by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CiphertextData {
    pub session_id: u64,
    pub level: usize,
    pub scale: f64,
    pub kind: ValueKind,
    pub components: Vec<RnsPoly>,
}

impl PartialEq for Ciphertext {
    fn eq(&self, other: &Self) -> bool {
        self.session_id() == other.session_id()
            && self.level == other.level
            && self.scale.to_bits() == other.scale.to_bits()
            && self.kind == other.kind
            && self.components == other.components
    }
}

impl fmt::Debug for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ciphertext")
            .field("session", &format_args!("{:#018x}", self.session_id()))
            .field("level", &self.level)
            .field("scale", &self.scale)
            .field("kind", &self.kind)
            .field("size_terms", &self.size_terms())
            .finish()
    }
}
