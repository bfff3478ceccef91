//! Bounded confidence in a forecast, with a named breakdown of how it was reached.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub base: f64,
    pub team_metrics_bonus: f64,
    pub recent_games_bonus: f64,
    pub season_history_bonus: f64,
    pub ratings_bonus: f64,
    pub weather_bonus: f64,
    pub polls_bonus: f64,
    pub calendar_bonus: f64,
    /// Bonus per unit of the teams' average consistency.
    pub consistency_weight: f64,
    /// Bonus per point of raw differential.
    pub magnitude_per_point: f64,
    pub magnitude_cap: f64,
    pub trend_bonus: f64,
    /// Model/market spread gaps (in points) separating the agreement bands.
    pub close_agreement: f64,
    pub moderate_agreement: f64,
    pub sharp_divergence: f64,
    pub close_factor: f64,
    pub moderate_factor: f64,
    pub divergence_factor: f64,
    pub sharp_divergence_factor: f64,
    pub floor: f64,
    pub ceiling: f64,
}
impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            base: 0.40,
            team_metrics_bonus: 0.15,
            recent_games_bonus: 0.08,
            season_history_bonus: 0.05,
            ratings_bonus: 0.10,
            weather_bonus: 0.02,
            polls_bonus: 0.03,
            calendar_bonus: 0.02,
            consistency_weight: 0.10,
            magnitude_per_point: 0.005,
            magnitude_cap: 0.10,
            trend_bonus: 0.02,
            close_agreement: 3.0,
            moderate_agreement: 7.0,
            sharp_divergence: 14.0,
            close_factor: 1.10,
            moderate_factor: 1.0,
            divergence_factor: 0.90,
            sharp_divergence_factor: 0.80,
            floor: 0.05,
            ceiling: 0.95,
        }
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[strum(serialize_all = "title_case")]
pub enum ConfidenceComponent {
    Base,
    TeamMetrics,
    RecentGames,
    SeasonHistory,
    Ratings,
    Weather,
    Polls,
    Calendar,
    Consistency,
    Magnitude,
    TrendAgreement,
    /// Multiplicative, unlike the others.
    MarketAgreement,
}

/// Which input categories were available to the forecast.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Availability {
    pub team_metrics: bool,
    pub recent_games: bool,
    pub season_history: bool,
    pub ratings: bool,
    pub weather: bool,
    pub polls: bool,
    pub calendar: bool,
}
impl Availability {
    pub fn all() -> Self {
        Self {
            team_metrics: true,
            recent_games: true,
            season_history: true,
            ratings: true,
            weather: true,
            polls: true,
            calendar: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfidenceInputs {
    pub availability: Availability,
    pub home_consistency: Option<f64>,
    pub away_consistency: Option<f64>,
    /// Raw differential, home-favoured.
    pub differential: f64,
    pub home_trend: Option<f64>,
    pub away_trend: Option<f64>,
    /// Absolute gap between the model spread and the market consensus spread, if a market exists.
    pub market_gap: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ConfidenceBreakdown {
    pub components: BTreeMap<ConfidenceComponent, f64>,
    pub unclamped: f64,
    pub confidence: f64,
}

fn market_factor(gap: f64, config: &ConfidenceConfig) -> f64 {
    if gap <= config.close_agreement {
        config.close_factor
    } else if gap <= config.moderate_agreement {
        config.moderate_factor
    } else if gap <= config.sharp_divergence {
        config.divergence_factor
    } else {
        config.sharp_divergence_factor
    }
}

/// `+trend_bonus` when the trends point the same way as the differential (the favourite is
/// improving relative to the underdog), `-trend_bonus` when they oppose it, zero otherwise.
fn trend_agreement(inputs: &ConfidenceInputs, config: &ConfidenceConfig) -> f64 {
    let (Some(home), Some(away)) = (inputs.home_trend, inputs.away_trend) else {
        return 0.0;
    };
    let gap = home - away;
    if gap == 0.0 || inputs.differential == 0.0 || !gap.is_finite() {
        0.0
    } else if gap.signum() == inputs.differential.signum() {
        config.trend_bonus
    } else {
        -config.trend_bonus
    }
}

pub fn score(inputs: &ConfidenceInputs, config: &ConfidenceConfig) -> ConfidenceBreakdown {
    let availability = &inputs.availability;
    let bonus = |available: bool, amount: f64| if available { amount } else { 0.0 };

    let mut components = BTreeMap::new();
    components.insert(ConfidenceComponent::Base, config.base);
    components.insert(
        ConfidenceComponent::TeamMetrics,
        bonus(availability.team_metrics, config.team_metrics_bonus),
    );
    components.insert(
        ConfidenceComponent::RecentGames,
        bonus(availability.recent_games, config.recent_games_bonus),
    );
    components.insert(
        ConfidenceComponent::SeasonHistory,
        bonus(availability.season_history, config.season_history_bonus),
    );
    components.insert(
        ConfidenceComponent::Ratings,
        bonus(availability.ratings, config.ratings_bonus),
    );
    components.insert(
        ConfidenceComponent::Weather,
        bonus(availability.weather, config.weather_bonus),
    );
    components.insert(
        ConfidenceComponent::Polls,
        bonus(availability.polls, config.polls_bonus),
    );
    components.insert(
        ConfidenceComponent::Calendar,
        bonus(availability.calendar, config.calendar_bonus),
    );

    let consistency = |value: Option<f64>| {
        value
            .filter(|value| (0.0..=1.0).contains(value))
            .unwrap_or(0.0)
    };
    let average_consistency =
        (consistency(inputs.home_consistency) + consistency(inputs.away_consistency)) / 2.0;
    components.insert(
        ConfidenceComponent::Consistency,
        config.consistency_weight * average_consistency,
    );

    let magnitude = if inputs.differential.is_finite() {
        (inputs.differential.abs() * config.magnitude_per_point).min(config.magnitude_cap)
    } else {
        0.0
    };
    components.insert(ConfidenceComponent::Magnitude, magnitude);
    components.insert(ConfidenceComponent::TrendAgreement, trend_agreement(inputs, config));

    let additive: f64 = components.values().sum();
    let factor = inputs
        .market_gap
        .filter(|gap| gap.is_finite())
        .map(|gap| market_factor(gap.abs(), config))
        .unwrap_or(1.0);
    components.insert(ConfidenceComponent::MarketAgreement, factor);

    let unclamped = additive * factor;
    ConfidenceBreakdown {
        components,
        unclamped,
        confidence: unclamped.clamp(config.floor, config.ceiling),
    }
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;
    use gridcast_testing::assert_slice_f64_absolute;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn all_missing_floor() {
        let breakdown = score(&ConfidenceInputs::default(), &ConfidenceConfig::default());
        assert_float_absolute_eq!(0.40, breakdown.confidence, 1e-12);
        assert!(breakdown.confidence >= 0.05);
    }

    #[test]
    fn floor_holds_under_extreme_config() {
        let config = ConfidenceConfig {
            base: 0.0,
            ..ConfidenceConfig::default()
        };
        let inputs = ConfidenceInputs {
            market_gap: Some(30.0),
            ..ConfidenceInputs::default()
        };
        let breakdown = score(&inputs, &config);
        assert_eq!(0.0, breakdown.unclamped);
        assert_eq!(0.05, breakdown.confidence);
    }

    #[test]
    fn everything_present_ceiling() {
        let inputs = ConfidenceInputs {
            availability: Availability::all(),
            home_consistency: Some(0.9),
            away_consistency: Some(0.8),
            differential: 30.0,
            home_trend: Some(0.2),
            away_trend: Some(-0.1),
            market_gap: Some(1.0),
        };
        let breakdown = score(&inputs, &ConfidenceConfig::default());
        assert!(breakdown.unclamped > 0.95);
        assert_eq!(0.95, breakdown.confidence);
        let components: Vec<_> = breakdown.components.values().copied().collect();
        assert_slice_f64_absolute(
            &[0.40, 0.15, 0.08, 0.05, 0.10, 0.02, 0.03, 0.02, 0.085, 0.10, 0.02, 1.10],
            &components,
            1e-12,
        );
    }

    #[test]
    fn breakdown_names_every_component() {
        let breakdown = score(&ConfidenceInputs::default(), &ConfidenceConfig::default());
        for component in ConfidenceComponent::iter() {
            assert!(breakdown.components.contains_key(&component), "missing {component}");
        }
        assert_eq!("Team Metrics", ConfidenceComponent::TeamMetrics.to_string());
    }

    #[test]
    fn opposing_trends_penalise() {
        let inputs = ConfidenceInputs {
            differential: -10.0,
            home_trend: Some(0.2),
            away_trend: Some(-0.1),
            ..ConfidenceInputs::default()
        };
        let breakdown = score(&inputs, &ConfidenceConfig::default());
        assert_eq!(-0.02, breakdown.components[&ConfidenceComponent::TrendAgreement]);
        assert_float_absolute_eq!(0.40 + 0.05 - 0.02, breakdown.confidence, 1e-12);
    }

    #[test]
    fn market_divergence_bands() {
        let config = ConfidenceConfig::default();
        assert_eq!(1.10, market_factor(3.0, &config));
        assert_eq!(1.0, market_factor(5.0, &config));
        assert_eq!(0.90, market_factor(10.0, &config));
        assert_eq!(0.80, market_factor(20.0, &config));
    }

    #[test]
    fn out_of_range_consistency_is_ignored() {
        let inputs = ConfidenceInputs {
            home_consistency: Some(4.0),
            away_consistency: Some(0.6),
            ..ConfidenceInputs::default()
        };
        let breakdown = score(&inputs, &ConfidenceConfig::default());
        assert_float_absolute_eq!(
            0.03,
            breakdown.components[&ConfidenceComponent::Consistency],
            1e-12
        );
    }
}
