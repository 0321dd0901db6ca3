use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RingError {
    #[error("ring degree must be a power of two of at least 2, got {degree}")]
    InvalidDegree { degree: usize },
    #[error("RNS basis must contain at least one modulus")]
    EmptyBasis,
    #[error("modulus {modulus} is not NTT-friendly for degree {degree}")]
    NonNttFriendlyModulus { modulus: u64, degree: usize },
    #[error("modulus {modulus} appears more than once in the basis")]
    DuplicateModulus { modulus: u64 },
    #[error("channel index {index} is out of range for {channel_count} channels")]
    ChannelOutOfRange { index: usize, channel_count: usize },
    #[error("expected {channel_count} residue channels of {degree} coefficients each")]
    MalformedChannels { channel_count: usize, degree: usize },
    #[error("residue is not reduced modulo {modulus}")]
    ResidueOutOfRange { modulus: u64 },
}

pub type RingResult<T> = Result<T, RingError>;
