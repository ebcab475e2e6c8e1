//! Simulate command implementation

use anyhow::{Context, Result};
use regime_quantum::quantum::{InitialPreset, PropagationEngine};
use regime_quantum::{report, Config};
use tracing::{debug, info};

pub fn run(
    config_path: Option<String>,
    steps_override: Option<i64>,
    dt_override: Option<f64>,
    initial_override: Option<String>,
    save: bool,
) -> Result<()> {
    info!("Starting simulation");

    let mut config = Config::load_or_default(config_path.as_deref())?;

    if let Some(steps) = steps_override {
        info!("Overriding step count to: {}", steps);
        config.simulation.num_steps = steps;
    }
    if let Some(dt) = dt_override {
        info!("Overriding time step to: {}", dt);
        config.simulation.dt = dt;
    }
    if let Some(initial) = initial_override {
        let preset: InitialPreset = initial.parse().map_err(anyhow::Error::msg)?;
        info!("Overriding initial state to preset: {}", preset);
        config.simulation.initial_state = None;
        config.simulation.initial_preset = preset;
    }

    let generator = config
        .simulation
        .generator()
        .context("Invalid generator in configuration")?;
    let initial = config
        .simulation
        .initial_state()
        .context("Invalid initial state in configuration")?;
    debug!("Generator: {:?}", generator.matrix());

    let engine = PropagationEngine::new(generator, initial);
    let trajectory = engine.run(config.simulation.num_steps, config.simulation.dt)?;
    let probs = trajectory.probabilities();

    report::print_simulation_summary(&probs, trajectory.dt());

    if save {
        let path = report::output_path(&config.output.results_dir, report::PROBABILITIES_FILE)?;
        report::write_probabilities(&path, &probs)?;
        println!("Saved probabilities to {}", path.display());
    }

    info!("Simulation completed successfully");
    Ok(())
}
