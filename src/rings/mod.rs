//! RNS polynomial arithmetic over `Z_Q[X] / (X^N + 1)` with a runtime ring
//! degree.

pub mod basis;
pub mod errors;
pub mod ntt;
pub mod poly;

pub use basis::{NttTable, RnsBasis};
pub use errors::{RingError, RingResult};
pub use poly::RnsPoly;
