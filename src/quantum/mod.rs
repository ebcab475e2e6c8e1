//! Quantum-style regime probability propagation
//!
//! A complex amplitude vector over (Rising, Falling, Stagnating) is evolved
//! under a 3x3 generator matrix. Squared amplitude magnitudes are read as
//! regime occupation probabilities. No physical validity is implied; the
//! formalism is a convenient norm-preserving linear map.

pub mod engine;
pub mod generator;
pub mod propagator;
pub mod state;
pub mod trajectory;

pub use engine::{evolve, propagate, PropagationEngine, SimulationParams, NORM_TOLERANCE};
pub use generator::{Generator, DEFAULT_GENERATOR};
pub use propagator::{validate_dt, Propagator, PropagatorCache};
pub use state::{InitialPreset, StateVector};
pub use trajectory::{ProbabilityRow, ProbabilityTrajectory, Trajectory};
