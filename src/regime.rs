//! Price regime classification
//!
//! Labels every observation by its fractional change against the previous
//! observation:
//! - Rising: change > `up`
//! - Falling: change < `down`
//! - Stagnating: everything else, including the first observation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ClassifiedStep, PriceObservation, RegimeLabel};

/// Classifier thresholds
///
/// `up` should be strictly greater than `down`. This is not checked here; with
/// inverted thresholds Rising wins the overlap and Stagnating is never produced
/// after the first step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeClassifierConfig {
    /// Rising cutoff (fractional change)
    pub up: f64,
    /// Falling cutoff (fractional change)
    pub down: f64,
    /// Stagnation band. Carried in configuration, not consulted by the rule.
    pub neutral: f64,
}

impl Default for RegimeClassifierConfig {
    fn default() -> Self {
        Self {
            up: 0.005,
            down: -0.005,
            neutral: 0.002,
        }
    }
}

/// Threshold-based regime classifier
#[derive(Debug, Clone, Default)]
pub struct RegimeClassifier {
    config: RegimeClassifierConfig,
}

impl RegimeClassifier {
    pub fn new(config: RegimeClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegimeClassifierConfig {
        &self.config
    }

    /// Label a single fractional change. First match wins.
    pub fn label_for_change(&self, change: f64) -> RegimeLabel {
        if change > self.config.up {
            RegimeLabel::Rising
        } else if change < self.config.down {
            RegimeLabel::Falling
        } else {
            RegimeLabel::Stagnating
        }
    }

    /// Classify a bare price series.
    ///
    /// Returns one `(change, label)` pair per price. Prices must be positive.
    pub fn classify_prices(&self, prices: &[f64]) -> Vec<(Option<f64>, RegimeLabel)> {
        let mut out = Vec::with_capacity(prices.len());
        if prices.is_empty() {
            return out;
        }

        out.push((None, RegimeLabel::Stagnating));
        for pair in prices.windows(2) {
            let change = (pair[1] - pair[0]) / pair[0];
            out.push((Some(change), self.label_for_change(change)));
        }
        out
    }

    /// Classify a timestamped series
    pub fn classify(&self, observations: &[PriceObservation]) -> Vec<ClassifiedStep> {
        let prices: Vec<f64> = observations.iter().map(|o| o.price).collect();

        observations
            .iter()
            .zip(self.classify_prices(&prices))
            .map(|(obs, (change, label))| ClassifiedStep {
                datetime: obs.datetime,
                price: obs.price,
                change,
                label,
            })
            .collect()
    }
}

/// Statistics for one regime over a classified series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegimeStats {
    pub regime: RegimeLabel,
    pub steps: usize,
    pub pct_of_total: f64,
    /// Mean change over steps that have a defined change
    pub avg_change: f64,
}

/// Summary of a classified series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegimeSummary {
    pub total_steps: usize,
    pub stats: BTreeMap<RegimeLabel, RegimeStats>,
    /// `transitions[from][to]` counts consecutive label pairs
    pub transitions: [[usize; 3]; 3],
}

impl RegimeSummary {
    pub fn from_steps(steps: &[ClassifiedStep]) -> Self {
        let total = steps.len();
        let mut stats = BTreeMap::new();

        for regime in RegimeLabel::ALL {
            let in_regime: Vec<&ClassifiedStep> =
                steps.iter().filter(|s| s.label == regime).collect();
            let changes: Vec<f64> = in_regime.iter().filter_map(|s| s.change).collect();

            let avg_change = if changes.is_empty() {
                0.0
            } else {
                changes.iter().sum::<f64>() / changes.len() as f64
            };
            let pct_of_total = if total == 0 {
                0.0
            } else {
                in_regime.len() as f64 / total as f64 * 100.0
            };

            stats.insert(
                regime,
                RegimeStats {
                    regime,
                    steps: in_regime.len(),
                    pct_of_total,
                    avg_change,
                },
            );
        }

        let mut transitions = [[0usize; 3]; 3];
        for pair in steps.windows(2) {
            transitions[pair[0].label.index()][pair[1].label.index()] += 1;
        }

        Self {
            total_steps: total,
            stats,
            transitions,
        }
    }

    /// Row-normalized transition frequencies. Rows without outgoing steps are zero.
    pub fn transition_frequencies(&self) -> [[f64; 3]; 3] {
        let mut freq = [[0.0; 3]; 3];
        for (from, row) in self.transitions.iter().enumerate() {
            let total: usize = row.iter().sum();
            if total == 0 {
                continue;
            }
            for (to, &count) in row.iter().enumerate() {
                freq[from][to] = count as f64 / total as f64;
            }
        }
        freq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::{Duration, Utc};

    fn observations(prices: &[f64]) -> Vec<PriceObservation> {
        let start = Utc::now() - Duration::days(prices.len() as i64);
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| PriceObservation::new_unchecked(start + Duration::days(i as i64), p))
            .collect()
    }

    #[test]
    fn test_reference_series() {
        let classifier = RegimeClassifier::default();
        let result = classifier.classify_prices(&[100.0, 100.6, 100.6, 99.9]);

        let labels: Vec<RegimeLabel> = result.iter().map(|(_, l)| *l).collect();
        assert_eq!(
            labels,
            vec![
                RegimeLabel::Stagnating,
                RegimeLabel::Rising,
                RegimeLabel::Stagnating,
                RegimeLabel::Falling,
            ]
        );

        assert!(result[0].0.is_none());
        assert_abs_diff_eq!(result[1].0.unwrap(), 0.006, epsilon = 1e-12);
        assert_abs_diff_eq!(result[2].0.unwrap(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result[3].0.unwrap(), -0.00696, epsilon = 1e-5);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let classifier = RegimeClassifier::default();
        assert_eq!(classifier.label_for_change(0.005), RegimeLabel::Stagnating);
        assert_eq!(classifier.label_for_change(-0.005), RegimeLabel::Stagnating);
        assert_eq!(classifier.label_for_change(0.0051), RegimeLabel::Rising);
        assert_eq!(classifier.label_for_change(-0.0051), RegimeLabel::Falling);
    }

    #[test]
    fn test_inverted_thresholds_rising_wins_overlap() {
        let classifier = RegimeClassifier::new(RegimeClassifierConfig {
            up: -0.01,
            down: 0.01,
            ..Default::default()
        });

        // Inside the overlap both rules match; Rising is checked first
        assert_eq!(classifier.label_for_change(0.0), RegimeLabel::Rising);
        assert_eq!(classifier.label_for_change(-0.005), RegimeLabel::Rising);
        assert_eq!(classifier.label_for_change(0.02), RegimeLabel::Rising);
        // At or below `up`, only the Falling rule matches
        assert_eq!(classifier.label_for_change(-0.01), RegimeLabel::Falling);

        let prices = [100.0, 100.0, 100.5, 99.8, 101.0, 100.9];
        let result = classifier.classify_prices(&prices);
        assert_eq!(result.len(), prices.len());
        assert_eq!(result[0], (None, RegimeLabel::Stagnating));
        assert!(result[1..].iter().all(|(_, l)| *l == RegimeLabel::Rising));

        let dropping = classifier.classify_prices(&[100.0, 95.0, 90.0]);
        assert_eq!(dropping.len(), 3);
        assert!(dropping[1..].iter().all(|(_, l)| *l == RegimeLabel::Falling));
    }

    #[test]
    fn test_neutral_band_does_not_affect_labels() {
        let wide = RegimeClassifier::new(RegimeClassifierConfig {
            neutral: 0.5,
            ..Default::default()
        });
        let default = RegimeClassifier::default();
        let prices = [100.0, 101.0, 100.0, 100.1, 98.0];
        assert_eq!(wide.classify_prices(&prices), default.classify_prices(&prices));
    }

    #[test]
    fn test_empty_and_single() {
        let classifier = RegimeClassifier::default();
        assert!(classifier.classify_prices(&[]).is_empty());
        assert_eq!(
            classifier.classify_prices(&[42.0]),
            vec![(None, RegimeLabel::Stagnating)]
        );
    }

    #[test]
    fn test_classify_keeps_timestamps() {
        let obs = observations(&[10.0, 11.0, 9.0]);
        let steps = RegimeClassifier::default().classify(&obs);
        assert_eq!(steps.len(), 3);
        for (step, o) in steps.iter().zip(&obs) {
            assert_eq!(step.datetime, o.datetime);
            assert_eq!(step.price, o.price);
        }
        assert_eq!(steps[1].label, RegimeLabel::Rising);
        assert_eq!(steps[2].label, RegimeLabel::Falling);
    }

    #[test]
    fn test_summary_counts_and_transitions() {
        let obs = observations(&[100.0, 102.0, 104.0, 101.0, 101.0]);
        let steps = RegimeClassifier::default().classify(&obs);
        let summary = RegimeSummary::from_steps(&steps);

        assert_eq!(summary.total_steps, 5);
        assert_eq!(summary.stats[&RegimeLabel::Rising].steps, 2);
        assert_eq!(summary.stats[&RegimeLabel::Falling].steps, 1);
        assert_eq!(summary.stats[&RegimeLabel::Stagnating].steps, 2);
        assert_abs_diff_eq!(summary.stats[&RegimeLabel::Rising].pct_of_total, 40.0, epsilon = 1e-9);

        // Stagnating -> Rising -> Rising -> Falling -> Stagnating
        assert_eq!(summary.transitions[2][0], 1);
        assert_eq!(summary.transitions[0][0], 1);
        assert_eq!(summary.transitions[0][1], 1);
        assert_eq!(summary.transitions[1][2], 1);

        let freq = summary.transition_frequencies();
        assert_abs_diff_eq!(freq[0][0], 0.5);
        assert_abs_diff_eq!(freq[0][1], 0.5);
        assert_abs_diff_eq!(freq[2][0], 1.0);
    }
}
