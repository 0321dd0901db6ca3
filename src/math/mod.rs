pub mod modular;
pub mod primes;
pub mod sampling;

pub use primes::{
    alternating_primes, is_ntt_friendly_prime, is_prime, ntt_prime_above, ntt_prime_below,
};
pub use sampling::{gaussian_coefficients, ternary_coefficients, uniform_residues};
