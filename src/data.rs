//! Data loading and validation
//!
//! Loads a timestamped price series from a CSV file. The loader guarantees
//! what the classifier assumes: strictly increasing timestamps, no missing
//! values and only positive prices.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::DataConfig;
use crate::types::{PriceObservation, PriceValidationError};

// =============================================================================
// Column Detection
// =============================================================================

/// Header names tried, in order, when no timestamp column is configured
pub const TIMESTAMP_COLUMNS: &[&str] = &["datetime", "timestamp", "date", "time"];

/// Header names tried, in order, when no price column is configured
pub const PRICE_COLUMNS: &[&str] = &["close", "adj close", "adj_close", "price"];

/// Which columns of the CSV hold timestamps and prices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnSpec {
    pub timestamp: Option<String>,
    pub price: Option<String>,
}

impl From<&DataConfig> for ColumnSpec {
    fn from(config: &DataConfig) -> Self {
        ColumnSpec {
            timestamp: config.timestamp_column.clone(),
            price: config.price_column.clone(),
        }
    }
}

fn normalize_header(header: &str) -> String {
    header.trim().to_ascii_lowercase()
}

fn find_column(
    headers: &csv::StringRecord,
    wanted: Option<&str>,
    candidates: &[&str],
    what: &str,
) -> Result<usize> {
    let normalized: Vec<String> = headers.iter().map(normalize_header).collect();

    if let Some(name) = wanted {
        let name = normalize_header(name);
        return normalized
            .iter()
            .position(|h| *h == name)
            .with_context(|| format!("{} column '{}' not found in CSV header", what, name));
    }

    candidates
        .iter()
        .find_map(|c| normalized.iter().position(|h| h == c))
        .with_context(|| {
            format!(
                "No {} column found (looked for {:?}, header is {:?})",
                what, candidates, normalized
            )
        })
}

/// Parse a timestamp in RFC 3339, `%Y-%m-%d %H:%M:%S` or `%Y-%m-%d` form (UTC assumed)
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = value.parse::<DateTime<Utc>>() {
        return Some(dt);
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
}

// =============================================================================
// CSV Data Loading
// =============================================================================

/// Load a price series from a CSV file.
///
/// Rows with a missing or unparseable timestamp or price are dropped. The
/// result is sorted by timestamp with duplicate timestamps removed (first row
/// kept). Fails when a non-positive price remains or no rows survive.
pub fn load_prices(path: impl AsRef<Path>, columns: &ColumnSpec) -> Result<Vec<PriceObservation>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    let ts_idx = find_column(&headers, columns.timestamp.as_deref(), TIMESTAMP_COLUMNS, "timestamp")?;
    let price_idx = find_column(&headers, columns.price.as_deref(), PRICE_COLUMNS, "price")?;
    debug!(ts_idx, price_idx, "resolved CSV columns");

    let mut observations = Vec::new();
    let mut dropped = 0usize;

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        let datetime = record.get(ts_idx).and_then(parse_timestamp);
        let price = record
            .get(price_idx)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|p| !p.is_nan());

        match (datetime, price) {
            (Some(datetime), Some(price)) => {
                observations.push(PriceObservation::new_unchecked(datetime, price))
            }
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!("Dropped {} rows with missing or unparseable values", dropped);
    }

    let observations = normalize_series(observations);

    let result = validate_observations(&observations);
    if !result.is_valid() {
        anyhow::bail!(
            "Invalid price data in {}: {}",
            path.display(),
            result.errors.join("; ")
        );
    }
    if observations.is_empty() {
        anyhow::bail!("No usable price rows in {}", path.display());
    }

    info!("Loaded {} observations from {}", observations.len(), path.display());
    Ok(observations)
}

/// Load using the data section of a configuration
pub fn load_from_config(config: &DataConfig) -> Result<Vec<PriceObservation>> {
    let path = config
        .path
        .as_deref()
        .context("No data path configured (set data.path or pass --data)")?;
    load_prices(path, &ColumnSpec::from(config))
}

/// Sort by timestamp and drop duplicate timestamps, keeping the first
pub fn normalize_series(mut observations: Vec<PriceObservation>) -> Vec<PriceObservation> {
    let before = observations.len();
    observations.sort_by_key(|o| o.datetime);
    observations.dedup_by_key(|o| o.datetime);

    let duplicates = before - observations.len();
    if duplicates > 0 {
        warn!("Removed {} duplicate timestamps", duplicates);
    }
    observations
}

// =============================================================================
// Data Validation
// =============================================================================

/// Validate observations against the classifier's preconditions
pub fn validate_observations(observations: &[PriceObservation]) -> ValidationResult {
    let mut errors = Vec::new();

    for (i, obs) in observations.iter().enumerate() {
        if let Err(e) = obs.validate() {
            errors.push(format!("Observation {}: {}", i, e));
        }
        if i > 0 && obs.datetime <= observations[i - 1].datetime {
            let e = PriceValidationError::NotChronological {
                previous: observations[i - 1].datetime,
                current: obs.datetime,
            };
            errors.push(format!("Observation {}: {}", i, e));
        }
    }

    ValidationResult { errors }
}

/// Result of data validation
#[derive(Debug)]
pub struct ValidationResult {
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn write_temp_csv(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "regime_quantum_{}_{}.csv",
            name,
            std::process::id()
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-01-02T03:04:05Z").is_some());
        assert!(parse_timestamp("2024-01-02 03:04:05").is_some());
        assert!(parse_timestamp("2024-01-02").is_some());
        assert!(parse_timestamp("02/01/2024").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_load_detects_columns_and_cleans_rows() {
        let path = write_temp_csv(
            "clean",
            "Date,Open,Close\n\
             2024-01-03,1,102.0\n\
             2024-01-01,1,100.0\n\
             2024-01-02,1,\n\
             2024-01-02,1,101.0\n\
             not-a-date,1,99.0\n\
             2024-01-03,1,555.0\n",
        );

        let obs = load_prices(&path, &ColumnSpec::default()).unwrap();
        fs::remove_file(&path).ok();

        let prices: Vec<f64> = obs.iter().map(|o| o.price).collect();
        assert_eq!(prices, vec![100.0, 101.0, 102.0]);
        assert!(validate_observations(&obs).is_valid());
    }

    #[test]
    fn test_load_with_named_columns() {
        let path = write_temp_csv(
            "named",
            "when,last\n2024-01-01 00:00:00,10.5\n2024-01-01 01:00:00,10.7\n",
        );
        let columns = ColumnSpec {
            timestamp: Some("When".to_string()),
            price: Some("LAST".to_string()),
        };
        let obs = load_prices(&path, &columns).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(obs.len(), 2);
        assert_eq!(obs[1].price, 10.7);
    }

    #[test]
    fn test_load_rejects_non_positive_prices() {
        let path = write_temp_csv("nonpos", "date,close\n2024-01-01,10.0\n2024-01-02,0.0\n");
        let err = load_prices(&path, &ColumnSpec::default()).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(err.to_string().contains("Invalid price data"));
    }

    #[test]
    fn test_load_requires_columns_and_rows() {
        let path = write_temp_csv("nocol", "date,volume\n2024-01-01,10.0\n");
        assert!(load_prices(&path, &ColumnSpec::default()).is_err());
        fs::remove_file(&path).ok();

        let path = write_temp_csv("empty", "date,close\n");
        assert!(load_prices(&path, &ColumnSpec::default()).is_err());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_validate_flags_ordering() {
        let t = Utc::now();
        let obs = vec![
            PriceObservation::new_unchecked(t, 1.0),
            PriceObservation::new_unchecked(t, 2.0),
        ];
        let result = validate_observations(&obs);
        assert!(!result.is_valid());
        assert!(result.errors[0].contains("not after"));
    }
}
