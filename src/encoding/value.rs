use serde::{Deserialize, Serialize};

/// A native value accepted by the encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Vector(Vec<f64>),
}

/// Which encoding path produced a plaintext; decoding is its exact
/// structural inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Int,
    Float,
    Vector { len: usize },
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Vector(values) => ValueKind::Vector { len: values.len() },
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Scalar value as a float; integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            Value::Vector(_) => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[f64]> {
        match self {
            Value::Vector(values) => Some(values),
            _ => None,
        }
    }

    /// The multiplicative identity of the given kind.
    pub fn one(kind: ValueKind) -> Value {
        match kind {
            ValueKind::Int => Value::Int(1),
            ValueKind::Float => Value::Float(1.0),
            ValueKind::Vector { len } => Value::Vector(vec![1.0; len]),
        }
    }
}

impl ValueKind {
    /// Result kind of combining two operands: integers stay integral only
    /// together, and anything combined with a vector is a vector.
    pub fn promote(self, other: ValueKind) -> ValueKind {
        match (self, other) {
            (ValueKind::Vector { len: a }, ValueKind::Vector { len: b }) => {
                ValueKind::Vector { len: a.max(b) }
            }
            (vector @ ValueKind::Vector { .. }, _) | (_, vector @ ValueKind::Vector { .. }) => {
                vector
            }
            (ValueKind::Int, ValueKind::Int) => ValueKind::Int,
            _ => ValueKind::Float,
        }
    }

    pub fn is_scalar(self) -> bool {
        !matches!(self, ValueKind::Vector { .. })
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

/// Operators take `i64` (and `f64`) natively, which is also what an
/// unsuffixed integer literal infers to next to a ciphertext. Widen an
/// `i32` with `i64::from` or pass it through `Session::encrypt`.
impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Value::Vector(values)
    }
}

impl From<&[f64]> for Value {
    fn from(values: &[f64]) -> Self {
        Value::Vector(values.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Value {
    fn from(values: [f64; N]) -> Self {
        Value::Vector(values.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_table() {
        use ValueKind::*;
        assert_eq!(Int.promote(Int), Int);
        assert_eq!(Int.promote(Float), Float);
        assert_eq!(Float.promote(Int), Float);
        assert_eq!(Int.promote(Vector { len: 3 }), Vector { len: 3 });
        assert_eq!(Vector { len: 2 }.promote(Float), Vector { len: 2 });
        assert_eq!(Vector { len: 2 }.promote(Vector { len: 5 }), Vector { len: 5 });
    }

    #[test]
    fn conversions_pick_the_right_path() {
        assert_eq!(Value::from(3_i64).kind(), ValueKind::Int);
        assert_eq!(Value::from(-3_i32).as_int(), Some(-3));
        assert_eq!(Value::from(1.5).as_f64(), Some(1.5));
        assert_eq!(Value::from([1.0, 2.0]).kind(), ValueKind::Vector { len: 2 });
        assert_eq!(Value::from(&[1.0][..]).as_slice(), Some(&[1.0][..]));
        assert_eq!(Value::one(ValueKind::Vector { len: 2 }), Value::Vector(vec![1.0, 1.0]));
    }
}
