//! Arithmetic on encrypted numbers.
//!
//! A [`Session`] owns one parameter set and one key set. Values encrypted
//! under it become [`Ciphertext`] handles that combine with `+`, `-`, `*`,
//! [`Ciphertext::pow`] and [`Ciphertext::rotate`], with native numbers,
//! vectors or plaintexts on either side. Levels, scales and relinearization
//! are tracked by the handles themselves.
//!
//! ```no_run
//! use cipher_algebra::{HeResult, Session};
//!
//! fn main() -> HeResult<()> {
//!     let session = Session::with_depth(2, 20)?;
//!     let x = session.encrypt(2.0)?;
//!     let y = ((&x * 3.0)? + 1.0)?;
//!     println!("{:?}", session.decrypt(&y)?);
//!     Ok(())
//! }
//! ```

pub mod crypto;
pub mod encoding;
pub mod keys;
pub mod math;
pub mod params;
pub mod rings;

pub use crypto::{
    BinaryOp, Ciphertext, CiphertextData, Encryptor, HeError, HeResult, Operand,
    RelinearizationPolicy, SchemeContext, Session, SessionBuilder, evaluate,
};
pub use encoding::{Encoder, Plaintext, Value, ValueKind};
pub use keys::{EvaluationKeys, KeySet, PublicKey, SecretKey};
pub use params::{EncryptionParameters, ParameterSelector, SecurityLevel, select_parameters};
