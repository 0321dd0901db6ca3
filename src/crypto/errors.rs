use thiserror::Error;

use crate::keys::KeyError;
use crate::rings::RingError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HeError {
    #[error("unsupported parameters: {reason}")]
    Parameter { reason: String },

    #[error("key mismatch: expected session {expected:#018x}, got {found:#018x}")]
    KeyMismatch { expected: u64, found: u64 },

    #[error("vector of length {len} exceeds the {capacity} available plaintext slots")]
    Capacity { len: usize, capacity: usize },

    #[error("cannot align scales {lhs:.6e} and {rhs:.6e} at level {level}; re-create the session with a larger multiplicative depth or precision budget")]
    ScaleMismatch { lhs: f64, rhs: f64, level: usize },

    #[error("operation needs {required} remaining level(s) but only {available} remain; re-create the session with a larger multiplicative depth or precision budget")]
    DepthExhausted { required: usize, available: usize },

    #[error("value {value} does not fit the plaintext modulus at this scale (|value| must be below {bound:.6e})")]
    ValueOutOfRange { value: f64, bound: f64 },

    #[error("no rotation key for {steps} step(s); request it when building the session")]
    MissingRotationKey { steps: i64 },

    #[error("no conjugation key; request it when building the session")]
    MissingConjugationKey,

    #[error("operands {lhs} and {rhs} involve no ciphertext")]
    UnsupportedOperands {
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Ring(#[from] RingError),
}

pub type HeResult<T> = Result<T, HeError>;

impl HeError {
    pub(crate) fn parameter(reason: impl Into<String>) -> Self {
        HeError::Parameter {
            reason: reason.into(),
        }
    }
}
