//! Parallel parameter sweeps over independent propagation runs
//!
//! Every combination of time step, step count and initial preset is an
//! independent simulation. Propagators are computed once per distinct time
//! step and shared read-only with the rayon workers.

use indicatif::ProgressBar;
use itertools::iproduct;
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::config::SweepConfig;
use crate::error::{EngineError, EngineResult};
use crate::quantum::{evolve, validate_dt, Generator, InitialPreset, Propagator, PropagatorCache};
use crate::RegimeLabel;

/// One point of the sweep grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint {
    pub dt: f64,
    pub num_steps: usize,
    pub preset: InitialPreset,
}

/// Sweep grid, expanded as a cartesian product
#[derive(Debug, Clone, PartialEq)]
pub struct SweepGrid {
    pub dts: Vec<f64>,
    pub step_counts: Vec<usize>,
    pub presets: Vec<InitialPreset>,
}

impl SweepGrid {
    /// Validate every time step and step count up front
    pub fn new(dts: Vec<f64>, step_counts: Vec<i64>, presets: Vec<InitialPreset>) -> EngineResult<Self> {
        for &dt in &dts {
            validate_dt(dt)?;
        }
        let step_counts = step_counts
            .into_iter()
            .map(|n| usize::try_from(n).map_err(|_| EngineError::InvalidStepCount(n)))
            .collect::<EngineResult<Vec<usize>>>()?;

        Ok(Self {
            dts,
            step_counts,
            presets,
        })
    }

    pub fn from_config(config: &SweepConfig) -> EngineResult<Self> {
        Self::new(
            config.dts.clone(),
            config.step_counts.clone(),
            config.presets.clone(),
        )
    }

    pub fn points(&self) -> Vec<SweepPoint> {
        iproduct!(&self.dts, &self.step_counts, &self.presets)
            .map(|(&dt, &num_steps, &preset)| SweepPoint {
                dt,
                num_steps,
                preset,
            })
            .collect()
    }

    pub fn total_combinations(&self) -> usize {
        self.dts.len() * self.step_counts.len() * self.presets.len()
    }
}

/// Outcome of one sweep run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepResult {
    pub dt: f64,
    pub num_steps: usize,
    pub preset: InitialPreset,
    pub final_rising: f64,
    pub final_falling: f64,
    pub final_stagnating: f64,
    pub mean_rising: f64,
    pub mean_falling: f64,
    pub mean_stagnating: f64,
    pub dominant: RegimeLabel,
    pub max_sum_deviation: f64,
}

impl SweepResult {
    pub fn final_probability(&self, regime: RegimeLabel) -> f64 {
        match regime {
            RegimeLabel::Rising => self.final_rising,
            RegimeLabel::Falling => self.final_falling,
            RegimeLabel::Stagnating => self.final_stagnating,
        }
    }
}

/// Runs sweeps for a fixed generator
pub struct Sweeper {
    generator: Generator,
    cache: PropagatorCache,
}

impl Sweeper {
    pub fn new(generator: Generator) -> Self {
        Self {
            generator,
            cache: PropagatorCache::new(),
        }
    }

    /// Compute the propagator of every grid time step
    fn prepare(&mut self, grid: &SweepGrid) -> EngineResult<()> {
        for &dt in &grid.dts {
            self.cache.get_or_compute(&self.generator, dt)?;
        }
        info!(
            "Prepared {} propagators for {} combinations",
            self.cache.len(),
            grid.total_combinations()
        );
        Ok(())
    }

    fn run_point(&self, point: &SweepPoint) -> EngineResult<SweepResult> {
        let propagator = match self.cache.get(&self.generator, point.dt) {
            Some(p) => *p,
            None => Propagator::new(&self.generator, point.dt)?,
        };

        let probs = evolve(&propagator, &point.preset.state(), point.num_steps)?.probabilities();
        let final_probs = probs.final_probabilities().unwrap_or([0.0; 3]);
        let mean = probs.mean_probabilities();

        Ok(SweepResult {
            dt: point.dt,
            num_steps: point.num_steps,
            preset: point.preset,
            final_rising: final_probs[0],
            final_falling: final_probs[1],
            final_stagnating: final_probs[2],
            mean_rising: mean[0],
            mean_falling: mean[1],
            mean_stagnating: mean[2],
            dominant: probs.dominant_regime(point.num_steps).unwrap_or_default(),
            max_sum_deviation: probs.max_sum_deviation(),
        })
    }

    /// Run every grid point in parallel
    pub fn run(&mut self, grid: &SweepGrid, progress: Option<&ProgressBar>) -> EngineResult<Vec<SweepResult>> {
        self.prepare(grid)?;
        let points = grid.points();
        info!("Testing {} sweep combinations", points.len());

        let this = &*self;
        points
            .par_iter()
            .map(|point| {
                let result = this.run_point(point);
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                result
            })
            .collect()
    }

    /// Run every grid point on the current thread
    pub fn run_sequential(
        &mut self,
        grid: &SweepGrid,
        progress: Option<&ProgressBar>,
    ) -> EngineResult<Vec<SweepResult>> {
        self.prepare(grid)?;
        let points = grid.points();
        info!("Testing {} sweep combinations sequentially", points.len());

        points
            .iter()
            .map(|point| {
                let result = self.run_point(point);
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                result
            })
            .collect()
    }

    pub fn cache(&self) -> &PropagatorCache {
        &self.cache
    }
}

/// Sort results by a named metric, descending.
///
/// `rising`, `falling` and `stagnating` sort by final probability;
/// `deviation` sorts by probability-sum deviation.
pub fn sort_results(results: &mut [SweepResult], sort_by: &str) {
    results.sort_by(|a, b| {
        let (va, vb) = match sort_by {
            "falling" => (a.final_falling, b.final_falling),
            "stagnating" => (a.final_stagnating, b.final_stagnating),
            "deviation" => (a.max_sum_deviation, b.max_sum_deviation),
            _ => (a.final_rising, b.final_rising),
        };
        vb.partial_cmp(&va).unwrap_or(std::cmp::Ordering::Equal)
    });
}
