//! Classify command implementation

use anyhow::Result;
use regime_quantum::regime::{RegimeClassifier, RegimeSummary};
use regime_quantum::{data, report, Config};
use tracing::info;

pub fn run(
    config_path: Option<String>,
    data_override: Option<String>,
    price_column_override: Option<String>,
    up_override: Option<f64>,
    down_override: Option<f64>,
    save: bool,
) -> Result<()> {
    info!("Starting classification");

    let mut config = Config::load_or_default(config_path.as_deref())?;

    if let Some(path) = data_override {
        info!("Overriding data path to: {}", path);
        config.data.path = Some(path);
    }
    if let Some(column) = price_column_override {
        info!("Overriding price column to: {}", column);
        config.data.price_column = Some(column);
    }
    if let Some(up) = up_override {
        info!("Overriding up threshold to: {}", up);
        config.classifier.up = up;
    }
    if let Some(down) = down_override {
        info!("Overriding down threshold to: {}", down);
        config.classifier.down = down;
    }
    config.validate();

    let observations = data::load_from_config(&config.data)?;

    let classifier = RegimeClassifier::new(config.classifier.clone());
    let steps = classifier.classify(&observations);
    let summary = RegimeSummary::from_steps(&steps);

    report::print_classification_summary(&summary);

    if save {
        let path = report::output_path(&config.output.results_dir, report::CLASSIFICATION_FILE)?;
        report::write_classification(&path, &steps)?;
        println!("Saved classification to {}", path.display());
    }

    info!("Classification completed successfully");
    Ok(())
}
