//! `std::ops` front end for the engine. Every binary operator evaluates to
//! `HeResult<Ciphertext>`, so expressions chain with `?`:
//!
//! ```ignore
//! let y = ((&x * 2.0)? + 1.0)?;
//! ```

use std::ops::{Add, Mul, Neg, Sub};

use super::{
    ciphertext::Ciphertext,
    engine::{self, BinaryOp, Operand},
    errors::HeResult,
};
use crate::encoding::{Plaintext, Value};

macro_rules! impl_cipher_ops {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait<&Ciphertext> for &Ciphertext {
            type Output = HeResult<Ciphertext>;

            fn $method(self, rhs: &Ciphertext) -> Self::Output {
                engine::evaluate($op, Operand::Cipher(self), Operand::Cipher(rhs))
            }
        }

        impl $trait<Ciphertext> for &Ciphertext {
            type Output = HeResult<Ciphertext>;

            fn $method(self, rhs: Ciphertext) -> Self::Output {
                $trait::$method(self, &rhs)
            }
        }

        impl $trait<&Ciphertext> for Ciphertext {
            type Output = HeResult<Ciphertext>;

            fn $method(self, rhs: &Ciphertext) -> Self::Output {
                $trait::$method(&self, rhs)
            }
        }

        impl $trait<Ciphertext> for Ciphertext {
            type Output = HeResult<Ciphertext>;

            fn $method(self, rhs: Ciphertext) -> Self::Output {
                $trait::$method(&self, &rhs)
            }
        }

        impl $trait<&Plaintext> for &Ciphertext {
            type Output = HeResult<Ciphertext>;

            fn $method(self, rhs: &Plaintext) -> Self::Output {
                engine::evaluate($op, Operand::Cipher(self), Operand::Plain(rhs))
            }
        }

        impl $trait<&Plaintext> for Ciphertext {
            type Output = HeResult<Ciphertext>;

            fn $method(self, rhs: &Plaintext) -> Self::Output {
                $trait::$method(&self, rhs)
            }
        }

        impl $trait<&Ciphertext> for &Plaintext {
            type Output = HeResult<Ciphertext>;

            fn $method(self, rhs: &Ciphertext) -> Self::Output {
                engine::evaluate($op, Operand::Plain(self), Operand::Cipher(rhs))
            }
        }

        impl $trait<Ciphertext> for &Plaintext {
            type Output = HeResult<Ciphertext>;

            fn $method(self, rhs: Ciphertext) -> Self::Output {
                $trait::$method(self, &rhs)
            }
        }
    };
}

macro_rules! impl_native_ops {
    ($trait:ident, $method:ident, $op:expr, [$($generics:tt)*] $native:ty) => {
        impl<$($generics)*> $trait<$native> for &Ciphertext {
            type Output = HeResult<Ciphertext>;

            fn $method(self, rhs: $native) -> Self::Output {
                engine::evaluate($op, Operand::Cipher(self), Operand::Native(Value::from(rhs)))
            }
        }

        impl<$($generics)*> $trait<$native> for Ciphertext {
            type Output = HeResult<Ciphertext>;

            fn $method(self, rhs: $native) -> Self::Output {
                $trait::$method(&self, rhs)
            }
        }

        impl<$($generics)*> $trait<&Ciphertext> for $native {
            type Output = HeResult<Ciphertext>;

            fn $method(self, rhs: &Ciphertext) -> Self::Output {
                engine::evaluate($op, Operand::Native(Value::from(self)), Operand::Cipher(rhs))
            }
        }

        impl<$($generics)*> $trait<Ciphertext> for $native {
            type Output = HeResult<Ciphertext>;

            fn $method(self, rhs: Ciphertext) -> Self::Output {
                $trait::$method(self, &rhs)
            }
        }
    };
}

macro_rules! impl_all_native {
    ($trait:ident, $method:ident, $op:expr) => {
        impl_native_ops!($trait, $method, $op, [] i64);
        impl_native_ops!($trait, $method, $op, [] f64);
        impl_native_ops!($trait, $method, $op, [] Vec<f64>);
        impl_native_ops!($trait, $method, $op, ['a] &'a [f64]);
    };
}

impl_cipher_ops!(Add, add, BinaryOp::Add);
impl_cipher_ops!(Sub, sub, BinaryOp::Sub);
impl_cipher_ops!(Mul, mul, BinaryOp::Mul);

impl_all_native!(Add, add, BinaryOp::Add);
impl_all_native!(Sub, sub, BinaryOp::Sub);
impl_all_native!(Mul, mul, BinaryOp::Mul);

impl Neg for &Ciphertext {
    type Output = Ciphertext;

    fn neg(self) -> Ciphertext {
        engine::negate(self)
    }
}

impl Neg for Ciphertext {
    type Output = Ciphertext;

    fn neg(self) -> Ciphertext {
        engine::negate(&self)
    }
}
