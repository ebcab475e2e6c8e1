//! Propagation engine
//!
//! Evolves a state vector under a fixed generator:
//! `psi[k+1] = U * psi[k] / |U * psi[k]|` with `U = exp(-i * H * dt)`.
//! The renormalization after every step guards against floating-point drift
//! and is applied even though `U` is unitary for a Hermitian generator.

use tracing::{debug, warn};

use super::{validate_dt, Generator, Propagator, StateVector, Trajectory};
use crate::error::{EngineError, EngineResult};

/// Initial states further than this from unit norm are normalized before use
pub const NORM_TOLERANCE: f64 = 1e-12;

/// Validated step count and time step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    pub num_steps: usize,
    pub dt: f64,
}

impl SimulationParams {
    pub fn new(num_steps: i64, dt: f64) -> EngineResult<Self> {
        let num_steps =
            usize::try_from(num_steps).map_err(|_| EngineError::InvalidStepCount(num_steps))?;
        let dt = validate_dt(dt)?;
        Ok(Self { num_steps, dt })
    }

    /// `t[k] = k * dt` for `k` in `0..=num_steps`
    pub fn time_axis(&self) -> Vec<f64> {
        (0..=self.num_steps).map(|k| k as f64 * self.dt).collect()
    }
}

/// Generator and initial state of a simulation, passed explicitly to every run
#[derive(Debug, Clone, Default)]
pub struct PropagationEngine {
    generator: Generator,
    initial_state: StateVector,
}

impl PropagationEngine {
    pub fn new(generator: Generator, initial_state: StateVector) -> Self {
        if !generator.is_hermitian(1e-12) {
            debug!("generator is not Hermitian; probabilities rely on renormalization");
        }
        Self {
            generator,
            initial_state,
        }
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn initial_state(&self) -> &StateVector {
        &self.initial_state
    }

    /// Run a fresh simulation of `num_steps` steps of size `dt`
    pub fn run(&self, num_steps: i64, dt: f64) -> EngineResult<Trajectory> {
        let params = SimulationParams::new(num_steps, dt)?;
        let propagator = Propagator::new(&self.generator, params.dt)?;
        evolve(&propagator, &self.initial_state, params.num_steps)
    }
}

/// Propagate with optional generator and initial state (defaults otherwise)
pub fn propagate(
    num_steps: i64,
    dt: f64,
    generator: Option<Generator>,
    initial_state: Option<StateVector>,
) -> EngineResult<Trajectory> {
    PropagationEngine::new(
        generator.unwrap_or_default(),
        initial_state.unwrap_or_default(),
    )
    .run(num_steps, dt)
}

/// Evolve `initial` for `num_steps` steps with a precomputed propagator.
///
/// The trajectory has `num_steps + 1` states. An initial state within
/// `NORM_TOLERANCE` of unit norm is stored unmodified; otherwise it is
/// normalized first. A zero-norm initial state fails with `ZeroNorm { step: 0 }`.
pub fn evolve(
    propagator: &Propagator,
    initial: &StateVector,
    num_steps: usize,
) -> EngineResult<Trajectory> {
    let start = prepare_initial(initial)?;

    let mut states = Vec::with_capacity(num_steps + 1);
    states.push(start);

    let mut current = start;
    for k in 1..=num_steps {
        current = propagator.step(&current, k)?;
        states.push(current);
    }

    debug!(
        num_steps,
        dt = propagator.dt(),
        "propagation finished"
    );
    Ok(Trajectory::new(states, propagator.dt()))
}

fn prepare_initial(initial: &StateVector) -> EngineResult<StateVector> {
    let norm = initial.norm();
    if norm.is_finite() && (norm - 1.0).abs() <= NORM_TOLERANCE {
        return Ok(*initial);
    }

    let normalized = initial.normalized(0)?;
    warn!(norm, "initial state is not unit norm, normalizing");
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::RegimeLabel;
    use approx::assert_abs_diff_eq;
    use num_complex::Complex64;

    #[test]
    fn test_zero_steps_returns_initial_state() {
        let traj = propagate(0, 0.01, None, None).unwrap();
        assert_eq!(traj.len(), 1);
        assert_eq!(traj.initial(), Some(&StateVector::equal_superposition()));

        let probs = traj.probabilities().at(0).unwrap();
        for p in probs {
            assert_abs_diff_eq!(p, 1.0 / 3.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_length_invariant() {
        for n in [0i64, 1, 2, 17, 250] {
            let traj = propagate(n, 0.05, None, None).unwrap();
            assert_eq!(traj.len(), n as usize + 1);
            assert_eq!(traj.probabilities().len(), n as usize + 1);
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let err = propagate(-1, 0.01, None, None).unwrap_err();
        assert_eq!(err, EngineError::InvalidStepCount(-1));
        assert_eq!(err.kind(), ErrorKind::InputShape);

        let err = propagate(10, 0.0, None, None).unwrap_err();
        assert_eq!(err, EngineError::InvalidTimeStep(0.0));
        assert_eq!(err.kind(), ErrorKind::InputShape);

        assert!(propagate(10, -0.01, None, None).is_err());
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let traj = propagate(500, 0.1, None, Some(StateVector::basis(RegimeLabel::Rising))).unwrap();
        let probs = traj.probabilities();
        assert!(probs.max_sum_deviation() < 1e-9);
        for regime in RegimeLabel::ALL {
            for &p in probs.series(regime) {
                assert!((0.0..=1.0).contains(&p), "p = {}", p);
            }
        }
    }

    #[test]
    fn test_rabi_oscillation() {
        // sigma_x coupling between Rising and Falling
        let h = Generator::from_real([[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 0.0]]);
        let dt = 0.1;
        let traj = propagate(40, dt, Some(h), Some(StateVector::basis(RegimeLabel::Rising))).unwrap();
        let probs = traj.probabilities();

        for (k, t) in probs.time_axis().into_iter().enumerate() {
            let p = probs.at(k).unwrap();
            assert_abs_diff_eq!(p[0], t.cos().powi(2), epsilon = 1e-10);
            assert_abs_diff_eq!(p[1], t.sin().powi(2), epsilon = 1e-10);
            assert_abs_diff_eq!(p[2], 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_diagonal_generator_keeps_probabilities() {
        let h = Generator::from_real([[1.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 3.0]]);
        let probs = propagate(100, 0.2, Some(h), None).unwrap().probabilities();
        for k in 0..probs.len() {
            for p in probs.at(k).unwrap() {
                assert_abs_diff_eq!(p, 1.0 / 3.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_unnormalized_initial_state_is_normalized() {
        let psi0 = StateVector::new([Complex64::new(2.0, 0.0); 3]);
        let traj = propagate(0, 0.01, None, Some(psi0)).unwrap();
        assert_abs_diff_eq!(traj.initial().unwrap().norm(), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_zero_initial_state_is_degenerate() {
        let psi0 = StateVector::new([Complex64::new(0.0, 0.0); 3]);
        let err = propagate(5, 0.01, None, Some(psi0)).unwrap_err();
        assert_eq!(err, EngineError::ZeroNorm { step: 0 });
        assert_eq!(err.kind(), ErrorKind::NumericalDegeneracy);
    }

    #[test]
    fn test_collapsing_generator_is_degenerate() {
        // exp(-i * H * dt) with H = i * 800 * I scales amplitudes by exp(-800 * dt),
        // which underflows to zero after a single step
        let h = Generator::from_matrix(nalgebra::Matrix3::from_diagonal_element(Complex64::new(
            0.0, -800.0,
        )));
        let err = propagate(3, 1.0, Some(h), None).unwrap_err();
        assert_eq!(err, EngineError::ZeroNorm { step: 1 });
    }

    #[test]
    fn test_runs_are_independent() {
        let engine = PropagationEngine::default();
        let a = engine.run(30, 0.05).unwrap();
        let b = engine.run(30, 0.05).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_params_time_axis() {
        let params = SimulationParams::new(3, 0.5).unwrap();
        assert_eq!(params.time_axis(), vec![0.0, 0.5, 1.0, 1.5]);
    }
}
