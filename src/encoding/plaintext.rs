use super::ValueKind;
use crate::rings::RnsPoly;

/// An encoded native value: coefficient-domain polynomial over the basis of
/// `level`, scaled by `scale`, tagged with the encoding path and the session
/// whose encoder produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Plaintext {
    pub(crate) poly: RnsPoly,
    pub(crate) scale: f64,
    pub(crate) level: usize,
    pub(crate) kind: ValueKind,
    pub(crate) constant: Option<i64>,
    pub(crate) session_id: u64,
}

impl Plaintext {
    pub fn poly(&self) -> &RnsPoly {
        &self.poly
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// The scaled integer of a scalar encoding, which is a constant
    /// polynomial. `None` for vectors.
    pub fn constant_term(&self) -> Option<i64> {
        self.constant
    }
}
