//! Complex amplitude vector over the three regimes

use std::fmt;
use std::str::FromStr;

use nalgebra::Vector3;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::RegimeLabel;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector {
    amplitudes: Vector3<Complex64>,
}

impl StateVector {
    pub fn new(amplitudes: [Complex64; 3]) -> Self {
        Self {
            amplitudes: Vector3::from(amplitudes),
        }
    }

    pub fn from_vector(amplitudes: Vector3<Complex64>) -> Self {
        Self { amplitudes }
    }

    /// Build from a dynamically sized slice, rejecting anything but 3 components
    pub fn from_slice(amplitudes: &[Complex64]) -> EngineResult<Self> {
        if amplitudes.len() != 3 {
            return Err(EngineError::StateShape(amplitudes.len()));
        }
        Ok(Self {
            amplitudes: Vector3::from_column_slice(amplitudes),
        })
    }

    /// Equal-amplitude superposition, every component 1/sqrt(3) with zero phase
    pub fn equal_superposition() -> Self {
        let a = Complex64::new(1.0 / 3f64.sqrt(), 0.0);
        Self::new([a, a, a])
    }

    /// State fully concentrated in one regime
    pub fn basis(regime: RegimeLabel) -> Self {
        let mut amplitudes = Vector3::zeros();
        amplitudes[regime.index()] = Complex64::new(1.0, 0.0);
        Self { amplitudes }
    }

    pub fn amplitudes(&self) -> &Vector3<Complex64> {
        &self.amplitudes
    }

    pub fn amplitude(&self, regime: RegimeLabel) -> Complex64 {
        self.amplitudes[regime.index()]
    }

    /// Euclidean norm over the complex components
    pub fn norm(&self) -> f64 {
        self.amplitudes.norm()
    }

    /// Divide by the current norm.
    ///
    /// `step` identifies the propagation step in the error when the norm is
    /// zero or not finite.
    pub fn normalized(&self, step: usize) -> EngineResult<Self> {
        let norm = self.norm();
        if norm == 0.0 {
            return Err(EngineError::ZeroNorm { step });
        }
        if !norm.is_finite() {
            return Err(EngineError::NonFiniteNorm { step });
        }
        Ok(Self {
            amplitudes: self.amplitudes.unscale(norm),
        })
    }

    /// Squared magnitude of each component, in regime order
    pub fn probabilities(&self) -> [f64; 3] {
        [
            self.amplitudes[0].norm_sqr(),
            self.amplitudes[1].norm_sqr(),
            self.amplitudes[2].norm_sqr(),
        ]
    }
}

impl Default for StateVector {
    fn default() -> Self {
        Self::equal_superposition()
    }
}

/// Named initial states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialPreset {
    #[default]
    Equal,
    Rising,
    Falling,
    Stagnating,
}

impl InitialPreset {
    pub fn state(self) -> StateVector {
        match self {
            InitialPreset::Equal => StateVector::equal_superposition(),
            InitialPreset::Rising => StateVector::basis(RegimeLabel::Rising),
            InitialPreset::Falling => StateVector::basis(RegimeLabel::Falling),
            InitialPreset::Stagnating => StateVector::basis(RegimeLabel::Stagnating),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InitialPreset::Equal => "equal",
            InitialPreset::Rising => "rising",
            InitialPreset::Falling => "falling",
            InitialPreset::Stagnating => "stagnating",
        }
    }
}

impl fmt::Display for InitialPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InitialPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equal" => Ok(InitialPreset::Equal),
            "rising" => Ok(InitialPreset::Rising),
            "falling" => Ok(InitialPreset::Falling),
            "stagnating" => Ok(InitialPreset::Stagnating),
            other => Err(format!(
                "unknown initial state preset: {} (expected equal, rising, falling or stagnating)",
                other
            )),
        }
    }
}
