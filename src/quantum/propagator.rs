//! One-step propagator `U = exp(-i * H * dt)` and a memo keyed by `(H, dt)`

use std::collections::HashMap;

use nalgebra::Matrix3;
use num_complex::Complex64;
use tracing::debug;

use super::{Generator, StateVector};
use crate::error::{EngineError, EngineResult};

/// Validate a propagation time step
pub fn validate_dt(dt: f64) -> EngineResult<f64> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(EngineError::InvalidTimeStep(dt));
    }
    Ok(dt)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Propagator {
    matrix: Matrix3<Complex64>,
    dt: f64,
}

impl Propagator {
    /// Compute `exp(-i * H * dt)`.
    ///
    /// The exponential uses nalgebra's scaling-and-squaring Padé algorithm,
    /// accurate for arbitrary complex 3x3 arguments.
    pub fn new(generator: &Generator, dt: f64) -> EngineResult<Self> {
        let dt = validate_dt(dt)?;
        let factor = Complex64::new(0.0, -dt);
        let argument = generator.matrix().map(|h| h * factor);
        let matrix = argument.exp();

        debug!(dt, "computed propagator");
        Ok(Self { matrix, dt })
    }

    pub fn matrix(&self) -> &Matrix3<Complex64> {
        &self.matrix
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Plain matrix-vector product, no renormalization
    pub fn apply(&self, state: &StateVector) -> StateVector {
        StateVector::from_vector(self.matrix * *state.amplitudes())
    }

    /// Advance one step and renormalize; `step` is the index of the produced state
    pub fn step(&self, state: &StateVector, step: usize) -> EngineResult<StateVector> {
        self.apply(state).normalized(step)
    }

    /// Largest entry magnitude of `U * U^H - I`
    pub fn unitarity_error(&self) -> f64 {
        let product = self.matrix * self.matrix.adjoint();
        (product - Matrix3::identity())
            .iter()
            .map(|z| z.norm())
            .fold(0.0, f64::max)
    }
}

/// Exact bit pattern of the generator entries followed by dt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PropagatorKey([u64; 19]);

impl PropagatorKey {
    fn new(generator: &Generator, dt: f64) -> Self {
        let mut bits = [0u64; 19];
        for (i, z) in generator.matrix().iter().enumerate() {
            bits[2 * i] = z.re.to_bits();
            bits[2 * i + 1] = z.im.to_bits();
        }
        bits[18] = dt.to_bits();
        Self(bits)
    }
}

/// Memoized propagators for repeated runs over the same `(H, dt)` pair
#[derive(Debug, Default)]
pub struct PropagatorCache {
    entries: HashMap<PropagatorKey, Propagator>,
    hits: usize,
    misses: usize,
}

impl PropagatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached propagator, computing it on first use
    pub fn get_or_compute(&mut self, generator: &Generator, dt: f64) -> EngineResult<&Propagator> {
        let key = PropagatorKey::new(generator, dt);
        if self.entries.contains_key(&key) {
            self.hits += 1;
        } else {
            let propagator = Propagator::new(generator, dt)?;
            self.entries.insert(key, propagator);
            self.misses += 1;
        }
        Ok(&self.entries[&key])
    }

    /// Read-only lookup, for sharing a pre-filled cache across workers
    pub fn get(&self, generator: &Generator, dt: f64) -> Option<&Propagator> {
        self.entries.get(&PropagatorKey::new(generator, dt))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rejects_bad_dt() {
        let h = Generator::default();
        assert_eq!(Propagator::new(&h, 0.0), Err(EngineError::InvalidTimeStep(0.0)));
        assert_eq!(
            Propagator::new(&h, -0.5),
            Err(EngineError::InvalidTimeStep(-0.5))
        );
        assert!(Propagator::new(&h, f64::INFINITY).is_err());
        assert!(Propagator::new(&h, f64::NAN).is_err());
    }

    #[test]
    fn test_diagonal_generator_gives_phases() {
        let h = Generator::from_real([[1.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 0.0]]);
        let dt: f64 = 0.3;
        let u = Propagator::new(&h, dt).unwrap();

        for (i, energy) in [1.0f64, 2.0, 0.0].iter().enumerate() {
            let expected = Complex64::new((energy * dt).cos(), -(energy * dt).sin());
            assert_abs_diff_eq!(u.matrix()[(i, i)].re, expected.re, epsilon = 1e-13);
            assert_abs_diff_eq!(u.matrix()[(i, i)].im, expected.im, epsilon = 1e-13);
        }
        assert_abs_diff_eq!(u.matrix()[(0, 1)].norm(), 0.0, epsilon = 1e-13);
    }

    #[test]
    fn test_default_propagator_is_unitary() {
        for dt in [0.01, 0.5, 3.0] {
            let u = Propagator::new(&Generator::default(), dt).unwrap();
            assert!(u.unitarity_error() < 1e-12, "dt = {}", dt);
        }
    }

    #[test]
    fn test_large_norm_argument_stays_accurate() {
        // exp(-i * sigma_x * t) on the first two regimes: cos(t) I - i sin(t) sigma_x
        let h = Generator::from_real([[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 0.0]]);
        let t: f64 = 25.0;
        let u = Propagator::new(&h, t).unwrap();
        assert_abs_diff_eq!(u.matrix()[(0, 0)].re, t.cos(), epsilon = 1e-10);
        assert_abs_diff_eq!(u.matrix()[(0, 1)].im, -t.sin(), epsilon = 1e-10);
        assert_abs_diff_eq!(u.matrix()[(2, 2)].re, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_cache_memoizes_by_generator_and_dt() {
        let mut cache = PropagatorCache::new();
        let h = Generator::default();

        let first = *cache.get_or_compute(&h, 0.01).unwrap();
        let second = *cache.get_or_compute(&h, 0.01).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);

        cache.get_or_compute(&h, 0.02).unwrap();
        cache.get_or_compute(&h.scaled(2.0), 0.01).unwrap();
        assert_eq!(cache.len(), 3);
        assert!(cache.get(&h, 0.02).is_some());
        assert!(cache.get(&h, 0.03).is_none());

        assert!(cache.get_or_compute(&h, 0.0).is_err());
        assert_eq!(cache.len(), 3);

        cache.clear();
        assert!(cache.is_empty());
    }
}
