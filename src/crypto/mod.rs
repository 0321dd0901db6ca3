//! Sessions, ciphertext handles and the operator engine.

pub mod builder;
pub mod ciphertext;
pub mod context;
pub mod engine;
pub mod errors;
pub mod operators;
pub mod session;

pub use builder::SessionBuilder;
pub use ciphertext::{Ciphertext, CiphertextData};
pub use context::{RelinearizationPolicy, SchemeContext};
pub use engine::{BinaryOp, Operand, evaluate};
pub use errors::{HeError, HeResult};
pub use session::{Encryptor, Session};
