//! Run command: classify a price series and simulate over the same time axis
//!
//! The two analyses are independent; the simulation only borrows the number
//! of observations so that step `k` of both outputs refers to observation `k`.

use anyhow::{Context, Result};
use regime_quantum::quantum::PropagationEngine;
use regime_quantum::regime::{RegimeClassifier, RegimeSummary};
use regime_quantum::{data, report, Config};
use tracing::info;

pub fn run(
    config_path: Option<String>,
    data_override: Option<String>,
    dt_override: Option<f64>,
    output_override: Option<String>,
) -> Result<()> {
    info!("Starting classify + simulate run");

    let mut config = Config::load_or_default(config_path.as_deref())?;

    if let Some(path) = data_override {
        info!("Overriding data path to: {}", path);
        config.data.path = Some(path);
    }
    if let Some(dt) = dt_override {
        info!("Overriding time step to: {}", dt);
        config.simulation.dt = dt;
    }
    if let Some(output) = output_override {
        info!("Overriding results directory to: {}", output);
        config.output.results_dir = output;
    }
    config.validate();

    // Component 1: classification
    let observations = data::load_from_config(&config.data)?;
    let classifier = RegimeClassifier::new(config.classifier.clone());
    let steps = classifier.classify(&observations);
    report::print_classification_summary(&RegimeSummary::from_steps(&steps));

    // Component 2: propagation, one step per observation after the first
    let num_steps = i64::try_from(steps.len().saturating_sub(1))
        .context("Too many observations for a simulation run")?;
    let engine = PropagationEngine::new(
        config
            .simulation
            .generator()
            .context("Invalid generator in configuration")?,
        config
            .simulation
            .initial_state()
            .context("Invalid initial state in configuration")?,
    );
    let probs = engine.run(num_steps, config.simulation.dt)?.probabilities();
    report::print_simulation_summary(&probs, config.simulation.dt);

    let results_dir = &config.output.results_dir;
    report::write_classification(
        report::output_path(results_dir, report::CLASSIFICATION_FILE)?,
        &steps,
    )?;
    report::write_probabilities(
        report::output_path(results_dir, report::PROBABILITIES_FILE)?,
        &probs,
    )?;
    let combined = report::output_path(results_dir, report::COMBINED_FILE)?;
    report::write_combined(&combined, &steps, &probs)?;
    println!("Results written to {}", results_dir);

    info!("Run completed successfully");
    Ok(())
}
