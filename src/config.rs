//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files. Every section is
//! optional and falls back to its defaults.

use anyhow::{Context, Result};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::error::EngineResult;
use crate::quantum::{Generator, InitialPreset, SimulationParams, StateVector};
use crate::regime::RegimeClassifierConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub classifier: RegimeClassifierConfig,
    pub simulation: SimulationConfig,
    pub sweep: SweepConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        Ok(config)
    }

    /// Load from file when a path is given, defaults otherwise
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Log and return warnings for suspicious settings. Nothing is rejected
    /// here; shape errors surface when the generator and initial state are
    /// built. Call once, after command-line overrides are applied.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.classifier.up <= self.classifier.down {
            warnings.push(format!(
                "classifier up threshold ({}) is not above down threshold ({}); overlapping changes are labeled Rising",
                self.classifier.up, self.classifier.down
            ));
        }
        for w in &warnings {
            warn!("{}", w);
        }
        warnings
    }
}

/// Price data source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Timestamp column header; detected from common names when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_column: Option<String>,
    /// Price column header; detected from common names when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_column: Option<String>,
}

/// A complex matrix/vector entry: either a plain real number or `[re, im]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComplexEntry {
    Real(f64),
    Pair([f64; 2]),
}

impl From<ComplexEntry> for Complex64 {
    fn from(entry: ComplexEntry) -> Self {
        match entry {
            ComplexEntry::Real(re) => Complex64::new(re, 0.0),
            ComplexEntry::Pair([re, im]) => Complex64::new(re, im),
        }
    }
}

/// Propagation engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub num_steps: i64,
    pub dt: f64,
    /// Generator rows; the default generator is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<Vec<Vec<ComplexEntry>>>,
    /// Explicit initial amplitudes; takes precedence over `initial_preset`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<Vec<ComplexEntry>>,
    pub initial_preset: InitialPreset,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            num_steps: 1000,
            dt: 0.01,
            generator: None,
            initial_state: None,
            initial_preset: InitialPreset::Equal,
        }
    }
}

impl SimulationConfig {
    pub fn params(&self) -> EngineResult<SimulationParams> {
        SimulationParams::new(self.num_steps, self.dt)
    }

    pub fn generator(&self) -> EngineResult<Generator> {
        match &self.generator {
            Some(rows) => {
                let rows: Vec<Vec<Complex64>> = rows
                    .iter()
                    .map(|row| row.iter().map(|&e| e.into()).collect())
                    .collect();
                Generator::from_rows(&rows)
            }
            None => Ok(Generator::default()),
        }
    }

    pub fn initial_state(&self) -> EngineResult<StateVector> {
        match &self.initial_state {
            Some(entries) => {
                let amplitudes: Vec<Complex64> = entries.iter().map(|&e| e.into()).collect();
                StateVector::from_slice(&amplitudes)
            }
            None => Ok(self.initial_preset.state()),
        }
    }
}

/// Parameter sweep grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub dts: Vec<f64>,
    pub step_counts: Vec<i64>,
    pub presets: Vec<InitialPreset>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            dts: vec![0.01, 0.05, 0.1, 0.5],
            step_counts: vec![100, 500, 1000],
            presets: vec![
                InitialPreset::Equal,
                InitialPreset::Rising,
                InitialPreset::Falling,
                InitialPreset::Stagnating,
            ],
        }
    }
}

/// Report output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub results_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            results_dir: "results".to_string(),
        }
    }
}
