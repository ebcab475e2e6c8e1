//! Propagation engine error types

use thiserror::Error;

/// Broad category of an engine failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong dimensionality, negative step count or non-positive time step
    InputShape,
    /// A state vector collapsed to zero (or non-finite) norm during renormalization
    NumericalDegeneracy,
}

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("step count must be >= 0, got {0}")]
    InvalidStepCount(i64),

    #[error("time step must be positive and finite, got {0}")]
    InvalidTimeStep(f64),

    #[error("generator must be 3x3, got {rows}x{cols}")]
    GeneratorShape { rows: usize, cols: usize },

    #[error("state vector must have 3 components, got {0}")]
    StateShape(usize),

    #[error("state vector has zero norm at step {step}")]
    ZeroNorm { step: usize },

    #[error("state vector norm is not finite at step {step}")]
    NonFiniteNorm { step: usize },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ZeroNorm { .. } | Self::NonFiniteNorm { .. } => ErrorKind::NumericalDegeneracy,
            _ => ErrorKind::InputShape,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
