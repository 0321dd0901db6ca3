//! Native values, plaintexts and the encoder between them.

pub mod encoder;
pub mod plaintext;
pub mod special_fft;
pub mod value;

pub use encoder::Encoder;
pub use plaintext::Plaintext;
pub use special_fft::SlotTransform;
pub use value::{Value, ValueKind};
