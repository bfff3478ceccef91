//! Converts a calibrated win probability into a point spread, derives the total from offensive
//! and defensive ratings, and splits the two into implied team scores.

use serde::{Deserialize, Serialize};

use crate::calibrate::{clamp_probability, is_interior, logit};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Points per unit of log-odds for probabilities strictly inside the clamping bounds.
    pub interior_slope: f64,
    /// Points per unit of log-odds at the clamping bounds.
    pub boundary_slope: f64,
    pub max_spread: f64,
    pub base_total: f64,
    pub min_total: f64,
    pub max_total: f64,
    /// Share of the ratings-implied deviation from the base total that is kept.
    pub rating_blend: f64,
    pub home_total_bonus: f64,
    /// Points removed from the total at full weather severity.
    pub weather_total_penalty: f64,
}
impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            interior_slope: 4.5,
            boundary_slope: 6.0,
            max_spread: 35.0,
            base_total: 50.0,
            min_total: 40.0,
            max_total: 85.0,
            rating_blend: 0.8,
            home_total_bonus: 1.0,
            weather_total_penalty: 6.0,
        }
    }
}

/// Home-favoured spread implied by the calibrated home win probability.
pub fn spread_from_probability(p: f64, config: &ConversionConfig) -> f64 {
    let slope = if is_interior(p) {
        config.interior_slope
    } else {
        config.boundary_slope
    };
    (logit(clamp_probability(p)) * slope).clamp(-config.max_spread, config.max_spread)
}

/// Points-per-game ratings of both teams. A missing rating reads as half the base total, i.e. an
/// average unit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TotalInputs {
    pub home_offense: Option<f64>,
    pub home_defense: Option<f64>,
    pub away_offense: Option<f64>,
    pub away_defense: Option<f64>,
    pub neutral_site: bool,
    pub weather_severity: f64,
}

pub fn total_points(inputs: &TotalInputs, config: &ConversionConfig) -> f64 {
    let average = config.base_total / 2.0;
    let rating = |value: Option<f64>| value.filter(|value| value.is_finite()).unwrap_or(average);
    let home_expected = (rating(inputs.home_offense) + rating(inputs.away_defense)) / 2.0;
    let away_expected = (rating(inputs.away_offense) + rating(inputs.home_defense)) / 2.0;
    let adjustment = config.rating_blend * (home_expected + away_expected - config.base_total);
    let home_bonus = if inputs.neutral_site {
        0.0
    } else {
        config.home_total_bonus
    };
    let weather = inputs.weather_severity.clamp(0.0, 1.0) * config.weather_total_penalty;
    (config.base_total + adjustment + home_bonus - weather)
        .clamp(config.min_total, config.max_total)
}

/// Team scores implied by a total and a home-favoured spread.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImpliedScores {
    pub home: f64,
    pub away: f64,
    pub home_rounded: i64,
    pub away_rounded: i64,
}
impl ImpliedScores {
    /// `home = (total + spread) / 2`, `away = (total − spread) / 2`. A negative side is zeroed
    /// and its deficit taken from the other side, so that the scores always sum to the total.
    /// The rounded away score is the (half-to-even) rounded total less the rounded home score.
    pub fn new(total: f64, spread: f64) -> Self {
        let (mut home, mut away) = ((total + spread) / 2.0, (total - spread) / 2.0);
        if away < 0.0 {
            home += away;
            away = 0.0;
        }
        if home < 0.0 {
            away += home;
            home = 0.0;
        }
        let home_rounded = home.round() as i64;
        let away_rounded = (total.round_ties_even() as i64 - home_rounded).max(0);
        Self {
            home,
            away,
            home_rounded,
            away_rounded,
        }
    }

    /// From a market line, where a home favourite carries a negative spread.
    pub fn from_market(total: f64, home_spread: f64) -> Self {
        Self::new(total, -home_spread)
    }
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;
    use gridcast_testing::{
        assert_monotonic_non_decreasing, assert_slice_f64_absolute, assert_within,
    };

    use crate::calibrate::sigmoid;

    use super::*;

    #[test]
    fn even_game_has_no_spread() {
        assert_eq!(0.0, spread_from_probability(0.5, &ConversionConfig::default()));
    }

    #[test]
    fn interior_slope() {
        let config = ConversionConfig::default();
        let spreads: Vec<_> = [-2.0, -1.0, 0.0, 1.0, 2.0]
            .into_iter()
            .map(|log_odds| spread_from_probability(sigmoid(log_odds), &config))
            .collect();
        assert_slice_f64_absolute(&[-9.0, -4.5, 0.0, 4.5, 9.0], &spreads, 1e-9);
    }

    #[test]
    fn boundary_slope() {
        let config = ConversionConfig::default();
        let at_ceiling = logit(0.99) * 6.0;
        assert_float_absolute_eq!(at_ceiling, spread_from_probability(0.99, &config), 1e-9);
        assert_float_absolute_eq!(at_ceiling, spread_from_probability(1.0, &config), 1e-9);
        assert_float_absolute_eq!(-at_ceiling, spread_from_probability(0.0, &config), 1e-9);
    }

    #[test]
    fn spread_is_bounded() {
        let config = ConversionConfig {
            boundary_slope: 20.0,
            ..ConversionConfig::default()
        };
        assert_eq!(35.0, spread_from_probability(0.999, &config));
        assert_eq!(-35.0, spread_from_probability(0.001, &config));
    }

    #[test]
    fn spread_is_monotonic() {
        let config = ConversionConfig::default();
        let spreads: Vec<_> = (0..=1_000)
            .map(|i| spread_from_probability(i as f64 / 1_000.0, &config))
            .collect();
        assert_monotonic_non_decreasing(&spreads);
        for spread in spreads {
            assert_within(-35.0, 35.0, spread);
        }
    }

    #[test]
    fn total_from_ratings() {
        let config = ConversionConfig::default();
        let inputs = TotalInputs {
            home_offense: Some(40.0),
            home_defense: Some(20.0),
            away_offense: Some(35.0),
            away_defense: Some(30.0),
            neutral_site: false,
            weather_severity: 0.0,
        };
        // expected: (40 + 30) / 2 + (35 + 20) / 2 = 62.5; 50 + 0.8 × 12.5 + 1
        assert_float_absolute_eq!(61.0, total_points(&inputs, &config), 1e-9);

        let neutral = TotalInputs {
            neutral_site: true,
            weather_severity: 0.5,
            ..inputs
        };
        assert_float_absolute_eq!(57.0, total_points(&neutral, &config), 1e-9);
    }

    #[test]
    fn total_without_ratings_is_base() {
        assert_eq!(51.0, total_points(&TotalInputs::default(), &ConversionConfig::default()));
    }

    #[test]
    fn total_is_bounded() {
        let config = ConversionConfig::default();
        let shootout = TotalInputs {
            home_offense: Some(70.0),
            home_defense: Some(60.0),
            away_offense: Some(70.0),
            away_defense: Some(60.0),
            ..TotalInputs::default()
        };
        assert_eq!(85.0, total_points(&shootout, &config));
        let slugfest = TotalInputs {
            home_offense: Some(5.0),
            home_defense: Some(5.0),
            away_offense: Some(5.0),
            away_defense: Some(5.0),
            weather_severity: 1.0,
            ..TotalInputs::default()
        };
        assert_eq!(40.0, total_points(&slugfest, &config));
    }

    #[test]
    fn implied_scores_from_market_line() {
        let scores = ImpliedScores::from_market(58.5, -7.5);
        assert_float_absolute_eq!(33.0, scores.home, 1e-12);
        assert_float_absolute_eq!(25.5, scores.away, 1e-12);
        assert_eq!(33, scores.home_rounded);
        assert_eq!(25, scores.away_rounded);
    }

    #[test]
    fn implied_scores_are_consistent() {
        for total in [40.0, 47.5, 58.5, 61.3, 85.0] {
            for spread in [-35.0, -14.5, -3.0, 0.0, 2.5, 7.25, 35.0] {
                let scores = ImpliedScores::new(total, spread);
                assert_float_absolute_eq!(spread, scores.home - scores.away, 0.5);
                let rounded_sum = scores.home_rounded + scores.away_rounded;
                assert!((rounded_sum - total.round() as i64).abs() <= 1);
                assert!(scores.home >= 0.0 && scores.away >= 0.0);
            }
        }
    }

    #[test]
    fn negative_side_transfers_excess() {
        let scores = ImpliedScores::new(10.0, 14.0);
        assert_eq!(10.0, scores.home);
        assert_eq!(0.0, scores.away);
        assert_eq!(0, scores.away_rounded);
    }
}
