use rand::{Rng, seq::SliceRandom};
use rand_distr::{Distribution, Normal, Uniform};

/// Samples `degree` residues uniformly from `[0, modulus)`.
///
/// # Panics
///
/// Panics if `modulus == 0`.
pub fn uniform_residues<R: Rng + ?Sized>(modulus: u64, degree: usize, rng: &mut R) -> Vec<u64> {
    let distribution = Uniform::new(0, modulus)
        .unwrap_or_else(|_| panic!("uniform_residues: modulus must be positive, got {modulus}"));
    (0..degree).map(|_| distribution.sample(rng)).collect()
}

/// Samples rounded Gaussian integers centered at zero.
///
/// # Panics
///
/// Panics if `std_dev` is not finite and positive.
pub fn gaussian_coefficients<R: Rng + ?Sized>(std_dev: f64, degree: usize, rng: &mut R) -> Vec<i64> {
    assert!(
        std_dev.is_finite() && std_dev > 0.0,
        "gaussian_coefficients: std_dev must be finite and positive"
    );
    let normal = Normal::new(0.0, std_dev)
        .unwrap_or_else(|_| panic!("gaussian_coefficients: invalid std_dev {std_dev}"));
    (0..degree).map(|_| normal.sample(rng).round() as i64).collect()
}

/// Samples a ternary vector over `{-1, 0, 1}` with exactly `hamming_weight`
/// non-zero entries.
///
/// # Panics
///
/// Panics if `hamming_weight > degree`.
pub fn ternary_coefficients<R: Rng + ?Sized>(
    hamming_weight: usize,
    degree: usize,
    rng: &mut R,
) -> Vec<i64> {
    assert!(
        hamming_weight <= degree,
        "ternary_coefficients: hamming_weight must be <= degree"
    );
    let mut out = vec![0i64; degree];
    let mut indices: Vec<usize> = (0..degree).collect();
    indices.shuffle(rng);
    for &idx in indices.iter().take(hamming_weight) {
        out[idx] = if rng.random_bool(0.5) { 1 } else { -1 };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{gaussian_coefficients, ternary_coefficients, uniform_residues};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn uniform_residues_stay_in_range_and_spread() {
        const DEGREE: usize = 8192;
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let residues = uniform_residues(8, DEGREE, &mut rng);
        assert_eq!(residues.len(), DEGREE);

        let mut buckets = [0usize; 8];
        for &r in &residues {
            buckets[r as usize] += 1;
        }
        let expected = DEGREE as f64 / 8.0;
        for &count in &buckets {
            assert!((count as f64 - expected).abs() <= expected * 0.30);
        }
    }

    #[test]
    #[should_panic(expected = "uniform_residues: modulus must be positive")]
    fn uniform_residues_panics_on_zero_modulus() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let _ = uniform_residues(0, 8, &mut rng);
    }

    #[test]
    fn gaussian_coefficients_have_reasonable_moments() {
        const DEGREE: usize = 16_384;
        let std_dev = 3.2;
        let mut rng = ChaCha20Rng::seed_from_u64(99);
        let samples = gaussian_coefficients(std_dev, DEGREE, &mut rng);

        let mean = samples.iter().sum::<i64>() as f64 / DEGREE as f64;
        let variance = samples
            .iter()
            .map(|&x| (x as f64 - mean).powi(2))
            .sum::<f64>()
            / DEGREE as f64;

        assert!(mean.abs() <= 0.25, "mean too far from 0: {mean}");
        assert!((variance - std_dev * std_dev).abs() <= std_dev * std_dev * 0.35);
    }

    #[test]
    #[should_panic(expected = "gaussian_coefficients: std_dev must be finite and positive")]
    fn gaussian_coefficients_reject_nan() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let _ = gaussian_coefficients(f64::NAN, 8, &mut rng);
    }

    #[test]
    fn ternary_coefficients_have_exact_weight() {
        let mut rng = ChaCha20Rng::seed_from_u64(123);
        let coeffs = ternary_coefficients(31, 256, &mut rng);
        assert_eq!(coeffs.iter().filter(|&&x| x != 0).count(), 31);
        assert!(coeffs.iter().all(|&x| (-1..=1).contains(&x)));

        let full = ternary_coefficients(64, 64, &mut rng);
        assert!(full.iter().all(|&x| x == -1 || x == 1));
    }

    #[test]
    #[should_panic(expected = "ternary_coefficients: hamming_weight must be <= degree")]
    fn ternary_coefficients_reject_oversized_weight() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let _ = ternary_coefficients(9, 8, &mut rng);
    }
}
