//! Propagation output: state trajectory and its per-regime probability view

use serde::Serialize;

use super::StateVector;
use crate::RegimeLabel;

/// States produced by one simulation run. Index 0 is the initial state.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    states: Vec<StateVector>,
    dt: f64,
}

impl Trajectory {
    pub(crate) fn new(states: Vec<StateVector>, dt: f64) -> Self {
        Self { states, dt }
    }

    pub fn states(&self) -> &[StateVector] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn num_steps(&self) -> usize {
        self.states.len().saturating_sub(1)
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn get(&self, step: usize) -> Option<&StateVector> {
        self.states.get(step)
    }

    pub fn initial(&self) -> Option<&StateVector> {
        self.states.first()
    }

    pub fn last(&self) -> Option<&StateVector> {
        self.states.last()
    }

    pub fn probabilities(&self) -> ProbabilityTrajectory {
        let mut rising = Vec::with_capacity(self.states.len());
        let mut falling = Vec::with_capacity(self.states.len());
        let mut stagnating = Vec::with_capacity(self.states.len());

        for state in &self.states {
            let [r, f, s] = state.probabilities();
            rising.push(r);
            falling.push(f);
            stagnating.push(s);
        }

        ProbabilityTrajectory {
            rising,
            falling,
            stagnating,
            dt: self.dt,
        }
    }
}

/// One row of a probability trajectory, as handed to reports and plots
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilityRow {
    pub step: usize,
    pub t: f64,
    pub p_rising: f64,
    pub p_falling: f64,
    pub p_stagnating: f64,
}

/// Per-regime probability sequences, all of equal length
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityTrajectory {
    rising: Vec<f64>,
    falling: Vec<f64>,
    stagnating: Vec<f64>,
    dt: f64,
}

impl ProbabilityTrajectory {
    pub fn len(&self) -> usize {
        self.rising.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rising.is_empty()
    }

    pub fn series(&self, regime: RegimeLabel) -> &[f64] {
        match regime {
            RegimeLabel::Rising => &self.rising,
            RegimeLabel::Falling => &self.falling,
            RegimeLabel::Stagnating => &self.stagnating,
        }
    }

    /// Probabilities at one step, in regime order
    pub fn at(&self, step: usize) -> Option<[f64; 3]> {
        Some([
            *self.rising.get(step)?,
            *self.falling.get(step)?,
            *self.stagnating.get(step)?,
        ])
    }

    /// `t[k] = k * dt`
    pub fn time_axis(&self) -> Vec<f64> {
        (0..self.len()).map(|k| k as f64 * self.dt).collect()
    }

    pub fn final_probabilities(&self) -> Option<[f64; 3]> {
        self.len().checked_sub(1).and_then(|k| self.at(k))
    }

    /// Time-averaged probability of each regime
    pub fn mean_probabilities(&self) -> [f64; 3] {
        if self.is_empty() {
            return [0.0; 3];
        }
        let n = self.len() as f64;
        RegimeLabel::ALL.map(|regime| self.series(regime).iter().sum::<f64>() / n)
    }

    /// Regime with the largest probability at `step`; ties go to the earlier regime
    pub fn dominant_regime(&self, step: usize) -> Option<RegimeLabel> {
        let probs = self.at(step)?;
        let mut best = 0;
        for i in 1..3 {
            if probs[i] > probs[best] {
                best = i;
            }
        }
        RegimeLabel::from_index(best)
    }

    /// Largest `|p_rising + p_falling + p_stagnating - 1|` over all steps
    pub fn max_sum_deviation(&self) -> f64 {
        (0..self.len())
            .filter_map(|k| self.at(k))
            .map(|p| (p.iter().sum::<f64>() - 1.0).abs())
            .fold(0.0, f64::max)
    }

    pub fn rows(&self) -> impl Iterator<Item = ProbabilityRow> + '_ {
        (0..self.len()).map(move |k| ProbabilityRow {
            step: k,
            t: k as f64 * self.dt,
            p_rising: self.rising[k],
            p_falling: self.falling[k],
            p_stagnating: self.stagnating[k],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use num_complex::Complex64;

    fn state(amplitudes: [f64; 3]) -> StateVector {
        StateVector::new(amplitudes.map(|a| Complex64::new(a, 0.0)))
    }

    fn sample() -> Trajectory {
        let half = 0.5f64.sqrt();
        Trajectory::new(
            vec![
                state([1.0, 0.0, 0.0]),
                state([half, half, 0.0]),
                state([0.0, 0.0, 1.0]),
            ],
            0.25,
        )
    }

    #[test]
    fn test_lengths_and_axis() {
        let traj = sample();
        assert_eq!(traj.len(), 3);
        assert_eq!(traj.num_steps(), 2);

        let probs = traj.probabilities();
        assert_eq!(probs.len(), 3);
        for regime in RegimeLabel::ALL {
            assert_eq!(probs.series(regime).len(), 3);
        }
        assert_eq!(probs.time_axis(), vec![0.0, 0.25, 0.5]);
    }

    #[test]
    fn test_summaries() {
        let probs = sample().probabilities();

        assert_eq!(probs.final_probabilities(), Some([0.0, 0.0, 1.0]));
        assert_eq!(probs.dominant_regime(0), Some(RegimeLabel::Rising));
        assert_eq!(probs.dominant_regime(2), Some(RegimeLabel::Stagnating));
        // 0.5 / 0.5 tie resolves to Rising
        assert_eq!(probs.dominant_regime(1), Some(RegimeLabel::Rising));
        assert_eq!(probs.dominant_regime(3), None);

        let mean = probs.mean_probabilities();
        assert_abs_diff_eq!(mean[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(mean[1], 0.5 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mean[2], 1.0 / 3.0, epsilon = 1e-12);

        assert!(probs.max_sum_deviation() < 1e-12);
    }

    #[test]
    fn test_rows() {
        let rows: Vec<ProbabilityRow> = sample().probabilities().rows().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].step, 2);
        assert_abs_diff_eq!(rows[2].t, 0.5);
        assert_abs_diff_eq!(rows[2].p_stagnating, 1.0);
    }
}
