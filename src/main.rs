//! Regime quantum - main entry point
//!
//! This binary provides four subcommands:
//! - classify: Label a price series with Rising / Falling / Stagnating regimes
//! - simulate: Propagate regime probabilities under a generator matrix
//! - run: Classify a price series and simulate over the same time axis
//! - sweep: Run a parallel parameter sweep of simulations

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "regime-quantum")]
#[command(about = "Price regime classification with quantum-style probability propagation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a price series into regimes
    Classify {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Price CSV file (overrides config file)
        #[arg(short, long)]
        data: Option<String>,

        /// Price column name (overrides config file)
        #[arg(long)]
        price_column: Option<String>,

        /// Rising threshold (overrides config file)
        #[arg(long, allow_hyphen_values = true)]
        up: Option<f64>,

        /// Falling threshold (overrides config file)
        #[arg(long, allow_hyphen_values = true)]
        down: Option<f64>,

        /// Write classification.csv into the results directory
        #[arg(long)]
        save: bool,
    },

    /// Simulate regime probabilities
    Simulate {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Number of propagation steps (overrides config file)
        #[arg(short = 'n', long, allow_hyphen_values = true)]
        steps: Option<i64>,

        /// Time step (overrides config file)
        #[arg(long, allow_hyphen_values = true)]
        dt: Option<f64>,

        /// Initial state preset: equal, rising, falling, stagnating
        #[arg(long)]
        initial: Option<String>,

        /// Write probabilities.csv into the results directory
        #[arg(long)]
        save: bool,
    },

    /// Classify a price series and simulate over the same number of steps
    Run {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Price CSV file (overrides config file)
        #[arg(short, long)]
        data: Option<String>,

        /// Time step (overrides config file)
        #[arg(long, allow_hyphen_values = true)]
        dt: Option<f64>,

        /// Results directory (overrides config file)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Run a parameter sweep of simulations
    Sweep {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,

        /// Time steps to test (comma-separated). E.g., "0.01,0.05,0.1"
        #[arg(long)]
        dts: Option<String>,

        /// Step counts to test (comma-separated). E.g., "100,500"
        #[arg(long)]
        steps: Option<String>,

        /// Initial presets to test (comma-separated). E.g., "equal,rising"
        #[arg(long)]
        presets: Option<String>,

        /// Sort results by final probability of a regime (rising, falling, stagnating) or deviation
        #[arg(long, default_value = "rising")]
        sort_by: String,

        /// Number of top results to show
        #[arg(short, long, default_value = "10")]
        top: usize,

        /// Run sequentially instead of parallel
        #[arg(long)]
        sequential: bool,
    },
}

fn setup_logging(verbose: bool, command_name: &str, file_only: bool) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    // Log file naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    if file_only {
        // Sweep: only log to file, keep console clean for progress bar
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    } else {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(true);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_appender)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        info!("Logging initialized");
        info!("Log file: {}", log_path.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (command_name, file_only) = match &cli.command {
        Commands::Classify { .. } => ("classify", false),
        Commands::Simulate { .. } => ("simulate", false),
        Commands::Run { .. } => ("run", false),
        Commands::Sweep { .. } => ("sweep", true), // File-only for clean progress bar
    };

    setup_logging(cli.verbose, command_name, file_only)?;

    match cli.command {
        Commands::Classify {
            config,
            data,
            price_column,
            up,
            down,
            save,
        } => commands::classify::run(config, data, price_column, up, down, save),

        Commands::Simulate {
            config,
            steps,
            dt,
            initial,
            save,
        } => commands::simulate::run(config, steps, dt, initial, save),

        Commands::Run {
            config,
            data,
            dt,
            output,
        } => commands::pipeline::run(config, data, dt, output),

        Commands::Sweep {
            config,
            dts,
            steps,
            presets,
            sort_by,
            top,
            sequential,
        } => commands::sweep::run(config, dts, steps, presets, sort_by, top, sequential),
    }
}
