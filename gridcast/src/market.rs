//! Normalisation of sportsbook lines to a single team's perspective, outlier-trimmed consensus,
//! best-line selection, value edges and data-integrity warnings.
//!
//! Everything here is a pure function of its arguments. Missing market data never fails: it
//! degrades to the [`ConsensusMarket::none`] sentinel and an advisory
//! [`IntegrityWarning::NoMarket`]. A market quoting only one of spread and total gets
//! [`IntegrityWarning::NoSpread`] or [`IntegrityWarning::NoTotal`] instead.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{finite, Forecast, MarketLine, Side};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Minimum absolute spread edge, in points, that warrants a pick.
    pub spread_threshold: f64,
    /// Minimum absolute total edge, in points, that warrants a pick.
    pub total_threshold: f64,
    /// Values further than this many standard deviations from the mean are trimmed from the
    /// consensus.
    pub outlier_sigmas: f64,
    pub max_spread_range: f64,
    pub spread_discrepancy: f64,
    pub total_discrepancy: f64,
}
impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            spread_threshold: 2.0,
            total_threshold: 3.0,
            outlier_sigmas: 3.0,
            max_spread_range: 6.0,
            spread_discrepancy: 10.0,
            total_discrepancy: 12.0,
        }
    }
}

/// A [`MarketLine`] re-expressed from the perspective of the team on `side`: a positive spread
/// is the number of points that team receives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMarketLine {
    pub provider: String,
    pub side: Side,
    pub spread: Option<f64>,
    pub total: Option<f64>,
    pub moneyline_team: Option<i32>,
    pub moneyline_opponent: Option<i32>,
}
impl NormalizedMarketLine {
    /// The same quote from the perspective of the team on `side`.
    pub fn to_side(&self, side: Side) -> Self {
        if self.side == side {
            return self.clone();
        }
        Self {
            provider: self.provider.clone(),
            side,
            spread: self.spread.map(|spread| -spread),
            total: self.total,
            moneyline_team: self.moneyline_opponent,
            moneyline_opponent: self.moneyline_team,
        }
    }

    /// The line as a home/away quote with the team of interest in the home slot.
    pub fn to_line(&self) -> MarketLine {
        MarketLine {
            provider: self.provider.clone(),
            spread: self.spread,
            total: self.total,
            moneyline_home: self.moneyline_team,
            moneyline_away: self.moneyline_opponent,
        }
    }
}

pub fn normalize(line: &MarketLine, side: Side) -> NormalizedMarketLine {
    let (moneyline_team, moneyline_opponent) = match side {
        Side::Home => (line.moneyline_home, line.moneyline_away),
        Side::Away => (line.moneyline_away, line.moneyline_home),
    };
    NormalizedMarketLine {
        provider: line.provider.clone(),
        side,
        spread: finite(line.spread).map(|spread| side.sign() * spread),
        total: finite(line.total).filter(|total| *total > 0.0),
        moneyline_team,
        moneyline_opponent,
    }
}

pub fn normalize_all(lines: &[MarketLine], side: Side) -> Vec<NormalizedMarketLine> {
    lines.iter().map(|line| normalize(line, side)).collect()
}

/// Outlier-trimmed averages across providers. A quantity quoted by no provider reads as zero with
/// a book count of zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsensusMarket {
    pub side: Side,
    pub spread: f64,
    pub total: f64,
    pub spread_books: usize,
    pub total_books: usize,
}
impl ConsensusMarket {
    pub fn none(side: Side) -> Self {
        Self {
            side,
            spread: 0.0,
            total: 0.0,
            spread_books: 0,
            total_books: 0,
        }
    }

    pub fn has_spread(&self) -> bool {
        self.spread_books > 0
    }

    pub fn has_total(&self) -> bool {
        self.total_books > 0
    }

    pub fn is_none(&self) -> bool {
        !self.has_spread() && !self.has_total()
    }

    /// The consensus spread from the home team's perspective, if quoted.
    pub fn home_spread(&self) -> Option<f64> {
        if self.has_spread() {
            Some(self.side.sign() * self.spread)
        } else {
            None
        }
    }
}

/// Mean of the values lying within `sigmas` population standard deviations of the mean, together
/// with the number of survivors. Values are sorted first, so the result does not depend on the
/// order they were quoted in.
fn trimmed_mean(mut values: Vec<f64>, sigmas: f64) -> Option<(f64, usize)> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let stdev = (values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / n).sqrt();
    let survivors: Vec<_> = values
        .iter()
        .copied()
        .filter(|value| (value - mean).abs() <= sigmas * stdev)
        .collect();
    let survivors = if survivors.is_empty() { values } else { survivors };
    let mean = survivors.iter().sum::<f64>() / survivors.len() as f64;
    Some((mean, survivors.len()))
}

pub fn consensus(lines: &[MarketLine], side: Side, config: &MarketConfig) -> ConsensusMarket {
    consensus_of(&normalize_all(lines, side), side, config)
}

/// [`consensus`] over normalised lines. Lines normalised to the other side are re-expressed from
/// `side` first.
pub fn consensus_of(
    lines: &[NormalizedMarketLine],
    side: Side,
    config: &MarketConfig,
) -> ConsensusMarket {
    let lines: Vec<_> = lines.iter().map(|line| line.to_side(side)).collect();
    let mut market = ConsensusMarket::none(side);
    let spreads = lines.iter().filter_map(|line| line.spread).collect();
    if let Some((spread, books)) = trimmed_mean(spreads, config.outlier_sigmas) {
        market.spread = spread;
        market.spread_books = books;
    }
    let totals = lines.iter().filter_map(|line| line.total).collect();
    if let Some((total, books)) = trimmed_mean(totals, config.outlier_sigmas) {
        market.total = total;
        market.total_books = books;
    }
    debug!("consensus from {} lines: {market:?}", lines.len());
    market
}

/// The model's forecast expressed in the same terms as a [`NormalizedMarketLine`].
#[derive(Clone, Debug, PartialEq)]
pub struct ModelLine {
    pub side: Side,
    pub spread: f64,
    pub total: f64,
}
impl ModelLine {
    pub fn from_forecast(forecast: &Forecast, side: Side) -> Self {
        Self {
            side,
            spread: -side.sign() * forecast.predicted_spread,
            total: forecast.predicted_total,
        }
    }
}

/// Positive spread edge: value on the team of interest. Positive total edge: value on the over.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Edge {
    pub spread: Option<f64>,
    pub total: Option<f64>,
}

pub fn edge(model: &ModelLine, consensus: &ConsensusMarket) -> Edge {
    Edge {
        spread: consensus.has_spread().then(|| consensus.spread - model.spread),
        total: consensus.has_total().then(|| model.total - consensus.total),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    TeamOfInterest,
    Opponent,
    Over,
    Under,
}
impl Direction {
    pub fn of_spread(edge: f64) -> Self {
        if edge >= 0.0 {
            Direction::TeamOfInterest
        } else {
            Direction::Opponent
        }
    }

    pub fn of_total(edge: f64) -> Self {
        if edge >= 0.0 {
            Direction::Over
        } else {
            Direction::Under
        }
    }
}

/// The most favourable quote for a bet in `direction`: the most points for the team of interest,
/// the fewest for a bet on the opponent, the lowest total for an over and the highest for an under.
/// Equal quotes are resolved by provider name.
pub fn best_line(
    lines: &[NormalizedMarketLine],
    direction: Direction,
) -> Option<&NormalizedMarketLine> {
    let quantity = |line: &NormalizedMarketLine| match direction {
        Direction::TeamOfInterest | Direction::Opponent => line.spread,
        Direction::Over | Direction::Under => line.total,
    };
    let prefer_higher = matches!(direction, Direction::TeamOfInterest | Direction::Under);
    lines
        .iter()
        .filter_map(|line| quantity(line).map(|value| (value, line)))
        .min_by(|(a_value, a_line), (b_value, b_line)| {
            let by_value = if prefer_higher {
                b_value.total_cmp(a_value)
            } else {
                a_value.total_cmp(b_value)
            };
            by_value.then_with(|| a_line.provider.cmp(&b_line.provider))
        })
        .map(|(_, line)| line)
}

/// The direction worth betting, if the edge clears `threshold`.
pub fn recommend(edge: Option<f64>, threshold: f64, of: fn(f64) -> Direction) -> Option<Direction> {
    edge.filter(|edge| edge.abs() >= threshold).map(of)
}

/// Converts American odds into the implied (vigged) probability.
pub fn american_to_probability(odds: i32) -> Option<f64> {
    let odds = odds as f64;
    if odds >= 100.0 {
        Some(100.0 / (odds + 100.0))
    } else if odds <= -100.0 {
        Some(-odds / (-odds + 100.0))
    } else {
        None
    }
}

/// Removes the overround from a two-way market by multiplicative scaling.
pub fn devig(a: f64, b: f64) -> Option<(f64, f64)> {
    let booksum = a + b;
    if booksum > 0.0 && booksum.is_finite() {
        Some((a / booksum, b / booksum))
    } else {
        None
    }
}

/// Fair win probability of the team of interest implied by one line's moneylines.
pub fn moneyline_probability(line: &NormalizedMarketLine) -> Option<f64> {
    let team = american_to_probability(line.moneyline_team?)?;
    let opponent = american_to_probability(line.moneyline_opponent?)?;
    devig(team, opponent).map(|(team, _)| team)
}

/// Average fair win probability of the team of interest across the books quoting moneylines.
pub fn market_win_probability(lines: &[NormalizedMarketLine]) -> Option<f64> {
    let mut probs: Vec<_> = lines.iter().filter_map(moneyline_probability).collect();
    if probs.is_empty() {
        return None;
    }
    probs.sort_by(f64::total_cmp);
    Some(probs.iter().sum::<f64>() / probs.len() as f64)
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum IntegrityWarning {
    #[error("{provider}: spread {spread:+.1} and moneylines {team:+}/{opponent:+} disagree")]
    FavoriteMismatch {
        provider: String,
        spread: f64,
        /// Moneyline on the team of interest.
        team: i32,
        opponent: i32,
    },

    #[error("cross-book spreads range {range:.1} points, from {min:+.1} to {max:+.1}")]
    SpreadRange { min: f64, max: f64, range: f64 },

    #[error("model spread differs from the consensus by {edge:.1} points")]
    SpreadDiscrepancy { edge: f64 },

    #[error("model total differs from the consensus by {edge:.1} points")]
    TotalDiscrepancy { edge: f64 },

    #[error("no market lines available")]
    NoMarket,

    #[error("no book quotes a spread")]
    NoSpread,

    #[error("no book quotes a total")]
    NoTotal,
}

/// Sign of the favourite implied by a spread (`+1` team of interest, `-1` opponent, `0` pick'em).
fn spread_favourite(spread: f64) -> i8 {
    match spread.total_cmp(&0.0) {
        Ordering::Less => 1,
        Ordering::Greater => -1,
        Ordering::Equal => 0,
    }
}

fn moneyline_favourite(team: i32, opponent: i32) -> Option<i8> {
    let team = american_to_probability(team)?;
    let opponent = american_to_probability(opponent)?;
    Some(match team.total_cmp(&opponent) {
        Ordering::Greater => 1,
        Ordering::Less => -1,
        Ordering::Equal => 0,
    })
}

/// Flags providers whose spread and moneylines name different favourites, and an excessive range
/// of spreads across books. Pick'em quotes on either side are not flagged.
pub fn integrity_check(
    lines: &[NormalizedMarketLine],
    config: &MarketConfig,
) -> Vec<IntegrityWarning> {
    let mut warnings = vec![];
    for line in lines {
        let (Some(spread), Some(moneyline_team), Some(moneyline_opponent)) =
            (line.spread, line.moneyline_team, line.moneyline_opponent)
        else {
            continue;
        };
        let by_spread = spread_favourite(spread);
        let Some(by_moneyline) = moneyline_favourite(moneyline_team, moneyline_opponent) else {
            continue;
        };
        if by_spread != 0 && by_moneyline != 0 && by_spread != by_moneyline {
            warnings.push(IntegrityWarning::FavoriteMismatch {
                provider: line.provider.clone(),
                spread,
                team: moneyline_team,
                opponent: moneyline_opponent,
            });
        }
    }

    let spreads: Vec<_> = lines.iter().filter_map(|line| line.spread).collect();
    if let (Some(min), Some(max)) = (
        spreads.iter().copied().reduce(f64::min),
        spreads.iter().copied().reduce(f64::max),
    ) {
        let range = max - min;
        if range > config.max_spread_range {
            warnings.push(IntegrityWarning::SpreadRange { min, max, range });
        }
    }
    warnings
}

#[derive(Clone, Debug, PartialEq)]
pub struct Pick {
    pub direction: Direction,
    pub provider: String,
    pub line: f64,
    pub edge: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BettingEdgeReport {
    pub side: Side,
    pub team: String,
    pub opponent: String,
    /// Zero when no spread is quoted.
    pub spread_value_edge: f64,
    /// Zero when no total is quoted.
    pub total_value_edge: f64,
    pub best_spread_line: Option<NormalizedMarketLine>,
    pub best_total_line: Option<NormalizedMarketLine>,
    pub picks: Vec<Pick>,
    pub recommendation_text: String,
    pub market_win_probability: Option<f64>,
    pub warnings: Vec<IntegrityWarning>,
}

pub const NO_SIGNIFICANT_EDGE: &str = "No significant edge";

struct PickText<'a> {
    pick: &'a Pick,
    team: &'a str,
    opponent: &'a str,
}

impl Display for PickText<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let pick = self.pick;
        match pick.direction {
            Direction::TeamOfInterest => write!(f, "{} {:+.1}", self.team, pick.line)?,
            Direction::Opponent => write!(f, "{} {:+.1}", self.opponent, -pick.line)?,
            Direction::Over => write!(f, "OVER {:.1}", pick.line)?,
            Direction::Under => write!(f, "UNDER {:.1}", pick.line)?,
        }
        write!(f, " @ {} ({:.1} pts edge)", pick.provider, pick.edge.abs())
    }
}

/// Compares the forecast with the consensus from the perspective of `consensus.side`, picks the
/// best available lines and attaches every integrity warning. Lines normalised to the other side
/// are re-expressed from `consensus.side` first.
pub fn edge_report(
    forecast: &Forecast,
    consensus: &ConsensusMarket,
    lines: &[NormalizedMarketLine],
    config: &MarketConfig,
) -> BettingEdgeReport {
    let side = consensus.side;
    let (team, opponent) = match side {
        Side::Home => (&forecast.home_team, &forecast.away_team),
        Side::Away => (&forecast.away_team, &forecast.home_team),
    };
    let model = ModelLine::from_forecast(forecast, side);
    let edge = edge(&model, consensus);
    debug!("model {model:?} against consensus {consensus:?}: {edge:?}");

    let lines: Vec<_> = lines.iter().map(|line| line.to_side(side)).collect();
    let lines = lines.as_slice();

    let mut warnings = integrity_check(lines, config);
    if consensus.is_none() {
        warnings.push(IntegrityWarning::NoMarket);
    } else if !consensus.has_spread() {
        warnings.push(IntegrityWarning::NoSpread);
    } else if !consensus.has_total() {
        warnings.push(IntegrityWarning::NoTotal);
    }
    if let Some(spread_edge) = edge
        .spread
        .filter(|edge| edge.abs() > config.spread_discrepancy)
    {
        warnings.push(IntegrityWarning::SpreadDiscrepancy { edge: spread_edge });
    }
    if let Some(total_edge) = edge
        .total
        .filter(|edge| edge.abs() > config.total_discrepancy)
    {
        warnings.push(IntegrityWarning::TotalDiscrepancy { edge: total_edge });
    }

    let spread_value_edge = edge.spread.unwrap_or(0.0);
    let total_value_edge = edge.total.unwrap_or(0.0);
    let best_spread_line = best_line(lines, Direction::of_spread(spread_value_edge)).cloned();
    let best_total_line = best_line(lines, Direction::of_total(total_value_edge)).cloned();

    let mut picks = vec![];
    if let Some(direction) = recommend(edge.spread, config.spread_threshold, Direction::of_spread) {
        if let Some(line) = best_line(lines, direction) {
            picks.push(Pick {
                direction,
                provider: line.provider.clone(),
                line: line.spread.unwrap_or(consensus.spread),
                edge: spread_value_edge,
            });
        }
    }
    if let Some(direction) = recommend(edge.total, config.total_threshold, Direction::of_total) {
        if let Some(line) = best_line(lines, direction) {
            picks.push(Pick {
                direction,
                provider: line.provider.clone(),
                line: line.total.unwrap_or(consensus.total),
                edge: total_value_edge,
            });
        }
    }

    let recommendation_text = if picks.is_empty() {
        NO_SIGNIFICANT_EDGE.to_string()
    } else {
        picks
            .iter()
            .map(|pick| {
                PickText {
                    pick,
                    team,
                    opponent,
                }
                .to_string()
            })
            .collect::<Vec<_>>()
            .join("; ")
    };

    for warning in &warnings {
        warn!("{team} vs {opponent}: {warning}");
    }

    BettingEdgeReport {
        side,
        team: team.clone(),
        opponent: opponent.clone(),
        spread_value_edge,
        total_value_edge,
        best_spread_line,
        best_total_line,
        picks,
        recommendation_text,
        market_win_probability: market_win_probability(lines),
        warnings,
    }
}
