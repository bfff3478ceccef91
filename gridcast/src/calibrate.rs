//! Logistic mapping of the raw differential to a win probability, and Platt scaling on top of it.
//!
//! The shipped Platt constants are the identity (`A = 1`, `B = 0`), under which the calibrator
//! returns its input untouched. [`fit_platt`] derives constants from historical outcomes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::opt::{coordinate_descent, CoordinateDescentConfig};

pub const MIN_PROBABILITY: f64 = 0.01;
pub const MAX_PROBABILITY: f64 = 0.99;

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

pub fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

pub fn clamp_probability(p: f64) -> f64 {
    p.clamp(MIN_PROBABILITY, MAX_PROBABILITY)
}

/// Whether `p` lies strictly inside the clamping bounds.
pub fn is_interior(p: f64) -> bool {
    p > MIN_PROBABILITY && p < MAX_PROBABILITY
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Platt {
    pub a: f64,
    pub b: f64,
}
impl Default for Platt {
    fn default() -> Self {
        Self::identity()
    }
}
impl Platt {
    pub fn identity() -> Self {
        Self { a: 1.0, b: 0.0 }
    }

    pub fn is_identity(&self) -> bool {
        self.a == 1.0 && self.b == 0.0
    }

    /// `sigmoid(A·logit(p) + B)`, with `p` clamped into `[0.01, 0.99]` before the logit.
    pub fn calibrate(&self, p: f64) -> f64 {
        if self.is_identity() {
            return p;
        }
        sigmoid(self.a * logit(clamp_probability(p)) + self.b)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Points of differential per unit of log-odds.
    pub logistic_scale: f64,
    pub platt: Platt,
}
impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            logistic_scale: 18.0,
            platt: Platt::identity(),
        }
    }
}

/// Home win probability implied by a raw differential, before calibration.
pub fn raw_probability(differential: f64, config: &CalibrationConfig) -> f64 {
    sigmoid(differential / config.logistic_scale)
}

pub fn calibrated_probability(differential: f64, config: &CalibrationConfig) -> f64 {
    config.platt.calibrate(raw_probability(differential, config))
}

/// A historical prediction and whether it came true.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub probability: f64,
    pub won: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Metrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    pub accuracy: f64,
}

pub fn evaluate(samples: &[Sample], platt: &Platt) -> Metrics {
    if samples.is_empty() {
        return Metrics::default();
    }

    let (mut brier_sum, mut log_loss_sum, mut correct) = (0.0, 0.0, 0usize);
    for sample in samples {
        let p = platt.calibrate(sample.probability);
        let y = if sample.won { 1.0 } else { 0.0 };
        brier_sum += (p - y).powi(2);
        let actual_prob = (if sample.won { p } else { 1.0 - p }).clamp(1e-12, 1.0);
        log_loss_sum += -actual_prob.ln();
        if (p >= 0.5) == sample.won {
            correct += 1;
        }
    }

    let n = samples.len() as f64;
    Metrics {
        samples: samples.len(),
        brier: brier_sum / n,
        log_loss: log_loss_sum / n,
        accuracy: correct as f64 / n,
    }
}

#[derive(Debug)]
pub struct PlattFit {
    pub platt: Platt,
    pub log_loss: f64,
    pub rounds: u64,
    pub steps: u64,
}

/// Fits `A` and `B` by minimising the log loss over `samples`, starting from the identity.
pub fn fit_platt(samples: &[Sample]) -> Result<PlattFit, anyhow::Error> {
    if samples.is_empty() {
        anyhow::bail!("at least one sample is required to fit calibration constants");
    }
    let config = CoordinateDescentConfig {
        init_values: vec![1.0, 0.0],
        init_step: 0.1,
        min_step: 1e-5,
        max_steps_per_axis: 1_000,
        max_rounds: 50,
        min_improvement: 1e-10,
    };
    let outcome = coordinate_descent(&config, |values| {
        // the identity short-circuit would skip clamping and distort the loss surface
        let platt = Platt {
            a: values[0],
            b: values[1],
        };
        let mut loss = 0.0;
        for sample in samples {
            let p = sigmoid(platt.a * logit(clamp_probability(sample.probability)) + platt.b);
            let actual_prob = (if sample.won { p } else { 1.0 - p }).clamp(1e-12, 1.0);
            loss -= actual_prob.ln();
        }
        loss / samples.len() as f64
    })?;
    debug!("platt fit outcome: {outcome:?}");
    Ok(PlattFit {
        platt: Platt {
            a: outcome.optimal_values[0],
            b: outcome.optimal_values[1],
        },
        log_loss: outcome.optimal_residual,
        rounds: outcome.rounds,
        steps: outcome.steps,
    })
}
