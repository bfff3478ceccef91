//! Tunable constants of every pipeline component, plus the data-driven situational rules.
//!
//! Each section defaults to the model's shipped constants and is `#[serde(default)]`, so a JSON
//! file only needs to name what it overrides.

use std::path::Path;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateConfig;
use crate::calibrate::CalibrationConfig;
use crate::confidence::ConfidenceConfig;
use crate::context::ContextConfig;
use crate::convert::ConversionConfig;
use crate::file::ReadJsonFile;
use crate::form::FormConfig;
use crate::market::MarketConfig;
use crate::metrics::MetricWeights;
use crate::player::PlayerImpactConfig;
use crate::rules::Rule;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub metric_weights: MetricWeights,
    pub form: FormConfig,
    pub aggregate: AggregateConfig,
    pub player: PlayerImpactConfig,
    pub context: ContextConfig,
    pub calibration: CalibrationConfig,
    pub conversion: ConversionConfig,
    pub market: MarketConfig,
    pub confidence: ConfidenceConfig,
    pub rules: Vec<Rule>,
}
impl ModelConfig {
    pub fn read(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let config = Self::read_json_file(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.form.half_life_days <= 0.0 {
            bail!("form half-life must be positive")
        }
        if self.calibration.logistic_scale <= 0.0 {
            bail!("logistic scale must be positive")
        }
        let platt = &self.calibration.platt;
        if platt.a == 0.0 || !platt.a.is_finite() || !platt.b.is_finite() {
            bail!("calibration constants must be finite with a non-zero slope")
        }

        let weights = &self.aggregate.weights;
        if [
            weights.opponent_adjusted,
            weights.market,
            weights.ratings,
            weights.player,
            weights.contextual,
        ]
        .iter()
        .any(|weight| *weight < 0.0)
        {
            bail!("signal weights must be non-negative")
        }
        if self.aggregate.talent_divisor <= 0.0 {
            bail!("talent divisor must be positive")
        }
        if self.aggregate.max_market_signal <= 0.0 {
            bail!("market signal bound must be positive")
        }

        let max_poll_momentum = self.context.max_poll_momentum;
        if max_poll_momentum < 0.0 || max_poll_momentum.is_nan() {
            bail!("poll momentum bound must be non-negative")
        }

        let conversion = &self.conversion;
        if conversion.interior_slope <= 0.0 || conversion.boundary_slope <= 0.0 {
            bail!("spread slopes must be positive")
        }
        if conversion.max_spread <= 0.0 {
            bail!("spread bound must be positive")
        }
        if conversion.min_total >= conversion.max_total {
            bail!(
                "total bounds are inverted: {} >= {}",
                conversion.min_total,
                conversion.max_total
            )
        }

        let market = &self.market;
        if market.spread_threshold < 0.0 || market.total_threshold < 0.0 {
            bail!("edge thresholds must be non-negative")
        }
        if market.outlier_sigmas <= 0.0 {
            bail!("outlier cutoff must be positive")
        }
        if market.max_spread_range < 0.0
            || market.spread_discrepancy < 0.0
            || market.total_discrepancy < 0.0
        {
            bail!("warning thresholds must be non-negative")
        }

        let confidence = &self.confidence;
        if !(0.0..=1.0).contains(&confidence.floor)
            || !(0.0..=1.0).contains(&confidence.ceiling)
            || confidence.floor > confidence.ceiling
        {
            bail!(
                "confidence bounds must lie in [0, 1] with floor <= ceiling, got [{}, {}]",
                confidence.floor,
                confidence.ceiling
            )
        }

        for rule in &self.rules {
            if rule.name.trim().is_empty() {
                bail!("rules must be named")
            }
            if !rule.threshold.is_finite() || !rule.adjustment.is_finite() {
                bail!("rule '{}' has a non-finite threshold or adjustment", rule.name)
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::calibrate::Platt;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        ModelConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_overrides() {
        let config: ModelConfig = serde_json::from_str(
            r#"{
                "calibration": {"platt": {"a": 0.9}},
                "market": {"spread_threshold": 2.5},
                "rules": [
                    {"name": "talent mismatch", "subject": "differential", "field": "talent",
                     "comparison": "above", "threshold": 250.0, "adjustment": 1.0}
                ]
            }"#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(Platt { a: 0.9, b: 0.0 }, config.calibration.platt);
        assert_eq!(18.0, config.calibration.logistic_scale);
        assert_eq!(2.5, config.market.spread_threshold);
        assert_eq!(3.0, config.market.total_threshold);
        assert_eq!(1, config.rules.len());
        assert_eq!(MetricWeights::default(), config.metric_weights);
    }

    #[test]
    fn rejects_inverted_totals() {
        let mut config = ModelConfig::default();
        config.conversion.min_total = 90.0;
        assert_eq!(
            "total bounds are inverted: 90 >= 85",
            config.validate().unwrap_err().to_string()
        );
    }

    #[test]
    fn rejects_degenerate_calibration() {
        let mut config = ModelConfig::default();
        config.calibration.platt.a = 0.0;
        assert!(config.validate().is_err());

        let mut config = ModelConfig::default();
        config.form.half_life_days = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_confidence_bounds() {
        let mut config = ModelConfig::default();
        config.confidence.floor = 0.96;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_negative_poll_bound() {
        let mut config = ModelConfig::default();
        config.context.max_poll_momentum = -1.0;
        assert!(config.validate().is_err());
    }
}
