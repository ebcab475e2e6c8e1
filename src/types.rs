//! Core data types shared by the classifier, the propagation engine and the adapters

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for a single price observation
#[derive(Debug, Error, PartialEq)]
pub enum PriceValidationError {
    #[error("price must be positive and finite, got {0}")]
    NonPositivePrice(f64),

    #[error("timestamp {current} is not after previous timestamp {previous}")]
    NotChronological {
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },
}

/// A single timestamped price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub datetime: DateTime<Utc>,
    pub price: f64,
}

impl PriceObservation {
    /// Create an observation with validation
    pub fn new(datetime: DateTime<Utc>, price: f64) -> Result<Self, PriceValidationError> {
        let obs = Self { datetime, price };
        obs.validate()?;
        Ok(obs)
    }

    /// Create an observation without validation (for trusted sources)
    pub fn new_unchecked(datetime: DateTime<Utc>, price: f64) -> Self {
        Self { datetime, price }
    }

    pub fn validate(&self) -> Result<(), PriceValidationError> {
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(PriceValidationError::NonPositivePrice(self.price));
        }
        Ok(())
    }
}

/// Market regime label
///
/// The declaration order is the row/column order of the generator matrix and
/// the component order of every state vector.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum RegimeLabel {
    Rising,
    Falling,
    /// Unmatched steps (and the first step of a series)
    #[default]
    Stagnating,
}

impl RegimeLabel {
    /// All regimes in matrix order
    pub const ALL: [RegimeLabel; 3] = [
        RegimeLabel::Rising,
        RegimeLabel::Falling,
        RegimeLabel::Stagnating,
    ];

    /// Component index in state vectors and generator rows
    pub fn index(self) -> usize {
        match self {
            RegimeLabel::Rising => 0,
            RegimeLabel::Falling => 1,
            RegimeLabel::Stagnating => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RegimeLabel::Rising => "Rising",
            RegimeLabel::Falling => "Falling",
            RegimeLabel::Stagnating => "Stagnating",
        }
    }
}

impl fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegimeLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rising" | "up" => Ok(RegimeLabel::Rising),
            "falling" | "down" => Ok(RegimeLabel::Falling),
            "stagnating" | "flat" => Ok(RegimeLabel::Stagnating),
            other => Err(format!("unknown regime: {}", other)),
        }
    }
}

/// A classified time step: fractional price change and its regime label
///
/// `change` is `None` only for the first observation of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedStep {
    pub datetime: DateTime<Utc>,
    pub price: f64,
    pub change: Option<f64>,
    pub label: RegimeLabel,
}
