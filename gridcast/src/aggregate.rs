//! Combines the five sub-signals into a single raw differential, then applies the situational
//! modifiers, the configured rules and the secondary enhancement pass, in that fixed order.
//!
//! Every quantity is in points, positive favouring the home team.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{EnumIter, IntoStaticStr};
use tracing::debug;

use crate::domain::{GameContext, SnapshotField, TeamMetricsSnapshot};
use crate::metrics::{MetricComponent, MetricDifferential};
use crate::reference::SeasonAggregates;
use crate::rules::FiredRule;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, EnumIter, IntoStaticStr)]
pub enum Signal {
    #[strum(serialize = "Opponent-adjusted")]
    OpponentAdjusted,
    #[strum(serialize = "Market consensus")]
    Market,
    #[strum(serialize = "Ratings")]
    Ratings,
    #[strum(serialize = "Player impact")]
    Player,
    #[strum(serialize = "Contextual")]
    Contextual,
}

impl Display for Signal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name: &'static str = self.into();
        write!(f, "{name}")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    pub opponent_adjusted: f64,
    pub market: f64,
    pub ratings: f64,
    pub player: f64,
    pub contextual: f64,
}
impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            opponent_adjusted: 0.50,
            market: 0.20,
            ratings: 0.15,
            player: 0.10,
            contextual: 0.05,
        }
    }
}
impl SignalWeights {
    pub fn weight(&self, signal: Signal) -> f64 {
        match signal {
            Signal::OpponentAdjusted => self.opponent_adjusted,
            Signal::Market => self.market,
            Signal::Ratings => self.ratings,
            Signal::Player => self.player,
            Signal::Contextual => self.contextual,
        }
    }

    pub fn sum(&self) -> f64 {
        Signal::iter().map(|signal| self.weight(signal)).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SituationalConfig {
    pub home_field_advantage: f64,
    pub conference_bonus: f64,
    pub rivalry_factor: f64,
    pub prime_time_factor: f64,
    /// Kickoffs at or after this local hour count as prime time unless flagged otherwise.
    pub prime_time_hour: u32,
    pub high_stakes_bonus: f64,
}
impl Default for SituationalConfig {
    fn default() -> Self {
        Self {
            home_field_advantage: 2.5,
            conference_bonus: 0.5,
            rivalry_factor: 0.85,
            prime_time_factor: 0.90,
            prime_time_hour: 19,
            high_stakes_bonus: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementConfig {
    pub overall_epa: f64,
    pub success_rate: f64,
    pub explosiveness: f64,
    pub rating: f64,
}
impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            overall_epa: 0.10,
            success_rate: 0.05,
            explosiveness: 0.03,
            rating: 0.05,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    pub weights: SignalWeights,
    pub metric_weight: f64,
    pub form_weight: f64,
    /// Points per unit of form difference.
    pub form_scale: f64,
    pub schedule_weight: f64,
    pub rating_weight: f64,
    pub talent_weight: f64,
    /// Talent index units per point.
    pub talent_divisor: f64,
    pub max_market_signal: f64,
    pub situational: SituationalConfig,
    pub enhancement: EnhancementConfig,
}
impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            weights: SignalWeights::default(),
            metric_weight: 0.70,
            form_weight: 0.20,
            form_scale: 10.0,
            schedule_weight: 0.10,
            rating_weight: 0.70,
            talent_weight: 0.30,
            talent_divisor: 20.0,
            max_market_signal: 35.0,
            situational: SituationalConfig::default(),
            enhancement: EnhancementConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubSignals {
    pub opponent_adjusted: f64,
    pub market: f64,
    pub ratings: f64,
    pub player: f64,
    pub contextual: f64,
}
impl SubSignals {
    pub fn get(&self, signal: Signal) -> f64 {
        match signal {
            Signal::OpponentAdjusted => self.opponent_adjusted,
            Signal::Market => self.market,
            Signal::Ratings => self.ratings,
            Signal::Player => self.player,
            Signal::Contextual => self.contextual,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Signal, f64)> + '_ {
        Signal::iter().map(|signal| (signal, self.get(signal)))
    }

    pub fn weighted(&self, weights: &SignalWeights) -> f64 {
        self.iter().map(|(signal, value)| value * weights.weight(signal)).sum()
    }
}

/// Each team's recent form and strength of schedule.
#[derive(Clone, Debug, PartialEq)]
pub struct Adjustment {
    pub home_form: f64,
    pub away_form: f64,
    pub home_schedule: f64,
    pub away_schedule: f64,
}

pub fn opponent_adjusted(
    metrics: &MetricDifferential,
    adjustment: &Adjustment,
    config: &AggregateConfig,
) -> f64 {
    config.metric_weight * metrics.composite
        + config.form_weight * (adjustment.home_form - adjustment.away_form) * config.form_scale
        + config.schedule_weight * (adjustment.home_schedule - adjustment.away_schedule)
}

/// Points the home team is favoured by in the market, bounded. Zero with no market.
pub fn market_signal(home_spread: Option<f64>, config: &AggregateConfig) -> f64 {
    home_spread
        .filter(|spread| spread.is_finite())
        .map(|spread| (-spread).clamp(-config.max_market_signal, config.max_market_signal))
        .unwrap_or(0.0)
}

fn field_difference(
    home: &TeamMetricsSnapshot,
    away: &TeamMetricsSnapshot,
    field: SnapshotField,
    season: &SeasonAggregates,
) -> f64 {
    let neutral = season.neutral(field);
    home.get(field).unwrap_or(neutral) - away.get(field).unwrap_or(neutral)
}

pub fn ratings_signal(
    home: &TeamMetricsSnapshot,
    away: &TeamMetricsSnapshot,
    season: &SeasonAggregates,
    config: &AggregateConfig,
) -> f64 {
    let rating = field_difference(home, away, SnapshotField::Rating, season);
    let talent =
        field_difference(home, away, SnapshotField::Talent, season) / config.talent_divisor;
    config.rating_weight * rating + config.talent_weight * talent
}

/// The secondary pass: a subset of the metric components and the rating difference, re-weighted
/// and added on top of the modified differential.
pub fn enhancement(
    metrics: &MetricDifferential,
    home: &TeamMetricsSnapshot,
    away: &TeamMetricsSnapshot,
    season: &SeasonAggregates,
    config: &EnhancementConfig,
) -> f64 {
    let scaled = |component: MetricComponent| metrics.breakdown[component] * component.scale();
    config.overall_epa * scaled(MetricComponent::OverallEpa)
        + config.success_rate * scaled(MetricComponent::SuccessRate)
        + config.explosiveness * scaled(MetricComponent::Explosiveness)
        + config.rating * field_difference(home, away, SnapshotField::Rating, season)
}

#[derive(Clone, Debug, PartialEq)]
pub enum Modifier {
    HomeField(f64),
    Conference(f64),
    Rivalry(f64),
    PrimeTime(f64),
    HighStakes(f64),
    Rule(FiredRule),
    Enhancement(f64),
}
impl Modifier {
    pub fn apply(&self, differential: f64) -> f64 {
        match self {
            Modifier::Rivalry(factor) | Modifier::PrimeTime(factor) => differential * factor,
            Modifier::HomeField(points)
            | Modifier::Conference(points)
            | Modifier::HighStakes(points)
            | Modifier::Enhancement(points) => differential + points,
            Modifier::Rule(rule) => differential + rule.adjustment,
        }
    }
}

impl Display for Modifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Modifier::HomeField(points) => write!(f, "Home field {points:+.1}"),
            Modifier::Conference(points) => write!(f, "Conference game {points:+.1}"),
            Modifier::Rivalry(factor) => write!(f, "Rivalry ×{factor:.2}"),
            Modifier::PrimeTime(factor) => write!(f, "Prime time ×{factor:.2}"),
            Modifier::HighStakes(points) => write!(f, "High stakes {points:+.1}"),
            Modifier::Rule(rule) => write!(f, "Rule: {rule}"),
            Modifier::Enhancement(points) => write!(f, "Enhancement {points:+.2}"),
        }
    }
}

fn is_prime_time(game: &GameContext, config: &SituationalConfig) -> bool {
    game.prime_time
        .unwrap_or_else(|| game.kickoff_hour.is_some_and(|hour| hour >= config.prime_time_hour))
}

/// Situational modifiers in application order. The high-stakes bonus takes the sign of the
/// differential it is applied to, so it is resolved against `differential`.
pub fn situational_modifiers(
    differential: f64,
    game: Option<&GameContext>,
    config: &SituationalConfig,
) -> Vec<Modifier> {
    let default_game = GameContext::default();
    let game = game.unwrap_or(&default_game);
    let mut modifiers = vec![];
    if !game.neutral_site {
        modifiers.push(Modifier::HomeField(config.home_field_advantage));
    }
    if game.conference_game {
        modifiers.push(Modifier::Conference(config.conference_bonus));
    }
    if game.rivalry {
        modifiers.push(Modifier::Rivalry(config.rivalry_factor));
    }
    if is_prime_time(game, config) {
        modifiers.push(Modifier::PrimeTime(config.prime_time_factor));
    }
    if game.high_stakes {
        let running = modifiers
            .iter()
            .fold(differential, |differential, modifier| modifier.apply(differential));
        if running != 0.0 {
            modifiers.push(Modifier::HighStakes(running.signum() * config.high_stakes_bonus));
        }
    }
    modifiers
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregatedSignal {
    pub signals: SubSignals,
    /// Weighted sum of the sub-signals, before any modifier.
    pub weighted: f64,
    pub modifiers: Vec<Modifier>,
    /// The final raw differential.
    pub differential: f64,
}

pub fn aggregate(
    signals: SubSignals,
    game: Option<&GameContext>,
    fired_rules: &[FiredRule],
    enhancement: f64,
    config: &AggregateConfig,
) -> AggregatedSignal {
    let weighted = signals.weighted(&config.weights);
    let mut modifiers = situational_modifiers(weighted, game, &config.situational);
    modifiers.extend(fired_rules.iter().cloned().map(Modifier::Rule));
    if enhancement != 0.0 && enhancement.is_finite() {
        modifiers.push(Modifier::Enhancement(enhancement));
    }
    let differential = modifiers
        .iter()
        .fold(weighted, |differential, modifier| modifier.apply(differential));
    debug!("signals: {signals:?}, weighted: {weighted:.3}, differential: {differential:.3}");
    AggregatedSignal {
        signals,
        weighted,
        modifiers,
        differential,
    }
}
