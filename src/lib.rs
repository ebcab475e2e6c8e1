//! Regime Quantum
//!
//! Classifies a price series into Rising / Falling / Stagnating regimes and
//! propagates a quantum-style amplitude vector over the same three regimes,
//! producing per-regime probability trajectories.

pub mod config;
pub mod data;
pub mod error;
pub mod quantum;
pub mod regime;
pub mod report;
pub mod sweep;
pub mod types;

pub use config::Config;
pub use error::{EngineError, EngineResult, ErrorKind};
pub use types::*;
