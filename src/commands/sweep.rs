//! Sweep command implementation with progress tracking

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use regime_quantum::quantum::InitialPreset;
use regime_quantum::sweep::{sort_results, SweepGrid, Sweeper};
use regime_quantum::Config;
use tracing::info;

/// Parse comma-separated floats
fn parse_float_list(s: &str) -> Result<Vec<f64>> {
    s.split(',')
        .map(|x| {
            x.trim()
                .parse()
                .with_context(|| format!("invalid time step '{}'", x.trim()))
        })
        .collect()
}

/// Parse comma-separated integers
fn parse_int_list(s: &str) -> Result<Vec<i64>> {
    s.split(',')
        .map(|x| {
            x.trim()
                .parse()
                .with_context(|| format!("invalid step count '{}'", x.trim()))
        })
        .collect()
}

/// Parse comma-separated presets
fn parse_preset_list(s: &str) -> Result<Vec<InitialPreset>> {
    s.split(',')
        .map(|x| x.trim())
        .filter(|x| !x.is_empty())
        .map(|x| x.parse::<InitialPreset>().map_err(anyhow::Error::msg))
        .collect()
}

pub fn run(
    config_path: Option<String>,
    dts: Option<String>,
    steps: Option<String>,
    presets: Option<String>,
    sort_by: String,
    top: usize,
    sequential: bool,
) -> Result<()> {
    info!("Starting sweep");

    let mut config = Config::load_or_default(config_path.as_deref())?;

    if let Some(dts) = dts {
        config.sweep.dts = parse_float_list(&dts)?;
    }
    if let Some(steps) = steps {
        config.sweep.step_counts = parse_int_list(&steps)?;
    }
    if let Some(presets) = presets {
        config.sweep.presets = parse_preset_list(&presets)?;
    }

    let grid = SweepGrid::from_config(&config.sweep).context("Invalid sweep grid")?;
    let total_runs = grid.total_combinations();
    if total_runs == 0 {
        anyhow::bail!("Sweep grid is empty");
    }

    println!("\n{}", "=".repeat(70));
    println!("SWEEP SUMMARY");
    println!("{}", "=".repeat(70));
    println!("  Time steps:    {:?}", grid.dts);
    println!("  Step counts:   {:?}", grid.step_counts);
    println!(
        "  Presets:       {:?}",
        grid.presets.iter().map(|p| p.as_str()).collect::<Vec<_>>()
    );
    println!("  Total runs:    {}", total_runs);
    println!("  Mode:          {}", if sequential { "sequential" } else { "parallel" });
    println!("{}\n", "=".repeat(70));

    let pb = ProgressBar::new(total_runs as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("⚡ {percent:>3}%|{bar:40}| {pos}/{len} [{elapsed}<{eta}, {per_sec:.2}]")
            .context("Invalid progress bar template")?
            .progress_chars("█░ "),
    );

    let generator = config
        .simulation
        .generator()
        .context("Invalid generator in configuration")?;
    let mut sweeper = Sweeper::new(generator);

    let mut results = if sequential {
        sweeper.run_sequential(&grid, Some(&pb))?
    } else {
        sweeper.run(&grid, Some(&pb))?
    };
    pb.finish();
    println!();

    sort_results(&mut results, &sort_by);
    info!("Total results: {}, sorted by: {}", results.len(), sort_by);

    let display_count = top.min(results.len());
    println!("\n{}", "=".repeat(100));
    println!("TOP {} SWEEP RESULTS (sorted by {})", display_count, sort_by);
    println!("{}", "=".repeat(100));
    println!(
        "{:<4} {:>8} {:>7} {:<11} | {:>8} {:>8} {:>8} | {:>8} {:>8} {:>8} | {:<10}",
        "Rank", "dt", "Steps", "Initial", "Rise", "Fall", "Stag", "mRise", "mFall", "mStag", "Dominant"
    );
    println!("{}", "-".repeat(100));

    for (i, r) in results.iter().take(top).enumerate() {
        println!(
            "{:<4} {:>8} {:>7} {:<11} | {:>8.4} {:>8.4} {:>8.4} | {:>8.4} {:>8.4} {:>8.4} | {:<10}",
            i + 1,
            r.dt,
            r.num_steps,
            r.preset.as_str(),
            r.final_rising,
            r.final_falling,
            r.final_stagnating,
            r.mean_rising,
            r.mean_falling,
            r.mean_stagnating,
            r.dominant.as_str()
        );
    }
    println!("{}", "=".repeat(100));

    let worst = results
        .iter()
        .map(|r| r.max_sum_deviation)
        .fold(0.0, f64::max);
    println!("Max probability-sum deviation across runs: {:.3e}", worst);

    info!("Sweep completed successfully");
    Ok(())
}
