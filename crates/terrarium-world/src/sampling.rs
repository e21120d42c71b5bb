//! Small random-sampling helpers shared by every phase.
//!
//! All helpers take the caller's generator by reference so a single seeded
//! source drives the whole simulation. None of them panic on degenerate
//! ranges.

use glam::DVec2;
use rand::Rng;

/// Uniform sample in `[lo, hi)`. Returns `lo` when the range is empty.
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    let u: f64 = rng.random();
    if hi > lo { lo + (hi - lo) * u } else { lo }
}

/// Bernoulli trial with probability `p`, clamped to `[0, 1]`.
pub fn chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    let u: f64 = rng.random();
    u < p.clamp(0.0, 1.0)
}

/// Normal sample via the Box-Muller transform.
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    // 1 - u keeps the log argument in (0, 1].
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
    mean + std_dev * z
}

/// Unit vector pointing in a uniformly random direction.
pub fn unit_direction<R: Rng + ?Sized>(rng: &mut R) -> DVec2 {
    let angle = uniform(rng, 0.0, std::f64::consts::TAU);
    DVec2::new(angle.cos(), angle.sin())
}

/// Vector with both components uniform in `[-1, 1)`.
pub fn jitter<R: Rng + ?Sized>(rng: &mut R) -> DVec2 {
    DVec2::new(uniform(rng, -1.0, 1.0), uniform(rng, -1.0, 1.0))
}

/// Uniform index in `0..len`, or `None` for an empty range.
pub fn index<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Option<usize> {
    (len > 0).then(|| rng.random_range(0..len))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn uniform_stays_in_range() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1000 {
            let v = uniform(&mut rng, -0.05, 0.1);
            assert!((-0.05..0.1).contains(&v));
        }
    }

    #[test]
    fn uniform_handles_empty_range() {
        let mut rng = SmallRng::seed_from_u64(7);
        assert!((uniform(&mut rng, 3.0, 3.0) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn chance_extremes_are_certain() {
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..100 {
            assert!(!chance(&mut rng, 0.0));
            assert!(chance(&mut rng, 1.0));
            assert!(chance(&mut rng, 4.0));
        }
    }

    #[test]
    fn gaussian_mean_is_close() {
        let mut rng = SmallRng::seed_from_u64(11);
        let n = 20_000_u32;
        let sum: f64 = (0..n).map(|_| gaussian(&mut rng, 0.2, 0.05)).sum();
        let mean = sum / f64::from(n);
        assert!((mean - 0.2).abs() < 0.01, "mean {mean}");
    }

    #[test]
    fn unit_direction_has_unit_length() {
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..100 {
            assert!((unit_direction(&mut rng).length() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn index_of_empty_range_is_none() {
        let mut rng = SmallRng::seed_from_u64(3);
        assert!(index(&mut rng, 0).is_none());
        assert!(index(&mut rng, 4).unwrap() < 4);
    }
}
