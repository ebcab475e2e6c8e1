//! Result reporting
//!
//! Writes classification and probability trajectories as CSV (the hand-off
//! format for plotting tools) and prints console summaries.

use anyhow::{Context, Result};
use serde::Serialize;
use statrs::statistics::Statistics;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::quantum::ProbabilityTrajectory;
use crate::regime::RegimeSummary;
use crate::{ClassifiedStep, RegimeLabel};

pub const CLASSIFICATION_FILE: &str = "classification.csv";
pub const PROBABILITIES_FILE: &str = "probabilities.csv";
pub const COMBINED_FILE: &str = "regimes.csv";

#[derive(Debug, Serialize)]
struct ClassificationRow<'a> {
    datetime: String,
    price: f64,
    change: Option<f64>,
    label: &'a str,
}

/// Write one row per classified step
pub fn write_classification(path: impl AsRef<Path>, steps: &[ClassifiedStep]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    for step in steps {
        writer.serialize(ClassificationRow {
            datetime: step.datetime.to_rfc3339(),
            price: step.price,
            change: step.change,
            label: step.label.as_str(),
        })?;
    }
    writer.flush()?;

    info!("Saved {} classified steps to {}", steps.len(), path.display());
    Ok(())
}

/// Write one row per propagation step: step, t, p_rising, p_falling, p_stagnating
pub fn write_probabilities(path: impl AsRef<Path>, probs: &ProbabilityTrajectory) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    for row in probs.rows() {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!("Saved {} probability rows to {}", probs.len(), path.display());
    Ok(())
}

#[derive(Debug, Serialize)]
struct CombinedRow<'a> {
    step: usize,
    datetime: String,
    price: f64,
    change: Option<f64>,
    label: &'a str,
    t: f64,
    p_rising: f64,
    p_falling: f64,
    p_stagnating: f64,
}

/// Write classification and probabilities side by side, keyed by step index
pub fn write_combined(
    path: impl AsRef<Path>,
    steps: &[ClassifiedStep],
    probs: &ProbabilityTrajectory,
) -> Result<()> {
    let path = path.as_ref();
    if steps.len() != probs.len() {
        anyhow::bail!(
            "Cannot combine {} classified steps with {} probability rows",
            steps.len(),
            probs.len()
        );
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    for (step, row) in steps.iter().zip(probs.rows()) {
        writer.serialize(CombinedRow {
            step: row.step,
            datetime: step.datetime.to_rfc3339(),
            price: step.price,
            change: step.change,
            label: step.label.as_str(),
            t: row.t,
            p_rising: row.p_rising,
            p_falling: row.p_falling,
            p_stagnating: row.p_stagnating,
        })?;
    }
    writer.flush()?;

    info!("Saved {} combined rows to {}", steps.len(), path.display());
    Ok(())
}

/// Create the results directory and return the path of `file` inside it
pub fn output_path(results_dir: &str, file: &str) -> Result<PathBuf> {
    fs::create_dir_all(results_dir)
        .with_context(|| format!("Failed to create results directory {}", results_dir))?;
    Ok(Path::new(results_dir).join(file))
}

/// Mean and standard deviation of one probability series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl SeriesStats {
    pub fn from_series(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }
        let std_dev = if values.len() > 1 {
            values.iter().std_dev()
        } else {
            0.0
        };
        Self {
            mean: values.iter().mean(),
            std_dev,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

pub fn print_classification_summary(summary: &RegimeSummary) {
    println!("\n{}", "=".repeat(60));
    println!("REGIME CLASSIFICATION");
    println!("{}", "=".repeat(60));
    println!("Total Steps:        {}", summary.total_steps);
    println!("{:<12} {:>8} {:>10} {:>14}", "Regime", "Steps", "Share%", "Avg Change%");
    println!("{}", "-".repeat(60));
    for stats in summary.stats.values() {
        println!(
            "{:<12} {:>8} {:>10.2} {:>14.4}",
            stats.regime.as_str(),
            stats.steps,
            stats.pct_of_total,
            stats.avg_change * 100.0
        );
    }

    println!("\nTransition frequencies (row = from, column = to)");
    print_matrix(&summary.transition_frequencies());
    println!("{}", "=".repeat(60));
}

pub fn print_simulation_summary(probs: &ProbabilityTrajectory, dt: f64) {
    println!("\n{}", "=".repeat(60));
    println!("REGIME PROBABILITY PROPAGATION");
    println!("{}", "=".repeat(60));
    println!("Steps:              {}", probs.len().saturating_sub(1));
    println!("Time Step (dt):     {}", dt);
    println!(
        "Horizon:            {:.4}",
        probs.time_axis().last().copied().unwrap_or(0.0)
    );
    println!(
        "{:<12} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Regime", "Final", "Mean", "Std", "Min", "Max"
    );
    println!("{}", "-".repeat(60));

    let final_probs = probs.final_probabilities().unwrap_or([0.0; 3]);
    for regime in RegimeLabel::ALL {
        let stats = SeriesStats::from_series(probs.series(regime));
        println!(
            "{:<12} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
            regime.as_str(),
            final_probs[regime.index()],
            stats.mean,
            stats.std_dev,
            stats.min,
            stats.max
        );
    }
    println!("Max |sum - 1|:      {:.3e}", probs.max_sum_deviation());
    println!("{}", "=".repeat(60));
}

fn print_matrix(matrix: &[[f64; 3]; 3]) {
    println!(
        "{:<12} {:>10} {:>10} {:>10}",
        "", "Rising", "Falling", "Stagnating"
    );
    for regime in RegimeLabel::ALL {
        let row = matrix[regime.index()];
        println!(
            "{:<12} {:>10.3} {:>10.3} {:>10.3}",
            regime.as_str(),
            row[0],
            row[1],
            row[2]
        );
    }
}
