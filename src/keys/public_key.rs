use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{SecretKey, error_poly};
use crate::rings::{RnsBasis, RnsPoly};

/// RLWE encryption of zero under the secret: `b = -a*s + e`.
///
/// Held in NTT domain over the top-level basis `q_0 … q_L`; encrypting at a
/// lower level uses the leading channels only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKey {
    b: RnsPoly,
    a: RnsPoly,
    session_id: u64,
}

impl PublicKey {
    pub fn generate<R: Rng + ?Sized>(
        secret_key: &SecretKey,
        top_basis: Arc<RnsBasis>,
        error_std: f64,
        rng: &mut R,
    ) -> Self {
        let channels = top_basis.channel_count();
        let s = secret_key.leading_channels(channels, Arc::clone(&top_basis));
        let a = RnsPoly::uniform(Arc::clone(&top_basis), rng);

        let mut a_s = a.clone();
        a_s.mul_assign_ntt(&s);
        let mut b = error_poly(error_std, top_basis, rng);
        b -= &a_s;

        Self {
            b,
            a,
            session_id: secret_key.session_id(),
        }
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub(crate) fn basis(&self) -> &Arc<RnsBasis> {
        self.a.basis()
    }

    /// `(b, a)` restricted to the basis of one level.
    pub(crate) fn at_level(&self, basis: &Arc<RnsBasis>) -> (RnsPoly, RnsPoly) {
        let channels = basis.channel_count();
        (
            self.b.truncate_channels(channels, Arc::clone(basis)),
            self.a.truncate_channels(channels, Arc::clone(basis)),
        )
    }
}
