//! Recency-weighted form derived from a team's game history.
//!
//! The weighter does not synthesise probabilities of its own: it re-weights the post-game win
//! probabilities already carried by each [`GameHistoryRecord`], decaying each game by
//! `exp(-ξ·days)` where `ξ = ln 2 / half_life`.

use std::f64::consts::LN_2;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{GameHistoryRecord, Side};
use crate::reference::ReferenceData;

const NEUTRAL_FORM: f64 = 0.5;
const DAYS_PER_WEEK: f64 = 7.0;
const MIN_TREND_GAMES: usize = 4;
const MIN_CONSISTENCY_GAMES: usize = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub half_life_days: f64,
}
impl Default for FormConfig {
    fn default() -> Self {
        Self {
            half_life_days: 21.0,
        }
    }
}

/// The point in time a forecast is made at.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AsOf {
    pub week: u32,
    pub date: Option<NaiveDate>,
}
impl AsOf {
    /// Days elapsed since the game, from calendar dates when both are known, otherwise from the
    /// week indices. `None` for games that lie in the future.
    pub fn days_since(&self, game: &GameHistoryRecord) -> Option<f64> {
        let days = match (self.date, game.date) {
            (Some(now), Some(then)) => (now - then).num_days() as f64,
            _ => (self.week as f64 - game.week as f64) * DAYS_PER_WEEK,
        };
        if days < 0.0 {
            None
        } else {
            Some(days)
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FormWeighter {
    decay: f64,
}
impl FormWeighter {
    pub fn new(config: &FormConfig) -> Self {
        Self {
            decay: LN_2 / config.half_life_days,
        }
    }

    pub fn decay(&self) -> f64 {
        self.decay
    }

    pub fn weight(&self, days: f64) -> f64 {
        (-self.decay * days.max(0.0)).exp()
    }

    /// Weighted mean of the team's post-game win probabilities over completed games, or `None`
    /// if there are none. Games are matched to the team through the reference aliases.
    pub fn weighted_form(
        &self,
        team: &str,
        games: &[GameHistoryRecord],
        as_of: &AsOf,
        reference: &ReferenceData,
    ) -> Option<f64> {
        let (mut weighted_sum, mut weight_sum) = (0.0, 0.0);
        for game in games.iter().filter(|game| game.is_completed()) {
            let Some(side) = game.side_of(team, reference) else {
                continue;
            };
            let (Some(prob), Some(days)) = (game.postgame_win_prob(side), as_of.days_since(game))
            else {
                continue;
            };
            let weight = self.weight(days);
            weighted_sum += weight * prob;
            weight_sum += weight;
        }
        if weight_sum > 0.0 {
            Some(weighted_sum / weight_sum)
        } else {
            None
        }
    }

    /// [`weighted_form`](Self::weighted_form), defaulting to 0.5.
    pub fn score(
        &self,
        team: &str,
        games: &[GameHistoryRecord],
        as_of: &AsOf,
        reference: &ReferenceData,
    ) -> f64 {
        self.weighted_form(team, games, as_of, reference)
            .unwrap_or(NEUTRAL_FORM)
    }
}

fn completed_probs(team: &str, games: &[GameHistoryRecord], reference: &ReferenceData) -> Vec<f64> {
    games
        .iter()
        .filter(|game| game.is_completed())
        .filter_map(|game| {
            let side: Side = game.side_of(team, reference)?;
            game.postgame_win_prob(side)
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean post-game win probability of the later half of the season less that of the earlier half.
/// Games are taken in the order given.
pub fn season_trend(
    team: &str,
    games: &[GameHistoryRecord],
    reference: &ReferenceData,
) -> Option<f64> {
    let probs = completed_probs(team, games, reference);
    if probs.len() < MIN_TREND_GAMES {
        return None;
    }
    let (early, late) = probs.split_at(probs.len() / 2);
    Some(mean(late) - mean(early))
}

/// `1 − 2σ` of the post-game win probabilities, clamped to `[0, 1]`.
pub fn consistency(
    team: &str,
    games: &[GameHistoryRecord],
    reference: &ReferenceData,
) -> Option<f64> {
    let probs = completed_probs(team, games, reference);
    if probs.len() < MIN_CONSISTENCY_GAMES {
        return None;
    }
    let mean = mean(&probs);
    let variance =
        probs.iter().map(|prob| (prob - mean).powi(2)).sum::<f64>() / probs.len() as f64;
    Some((1.0 - 2.0 * variance.sqrt()).clamp(0.0, 1.0))
}

/// The date of the team's most recent completed game, if dated.
pub fn last_played(
    team: &str,
    games: &[GameHistoryRecord],
    as_of: &AsOf,
    reference: &ReferenceData,
) -> Option<NaiveDate> {
    games
        .iter()
        .filter(|game| game.is_completed() && game.side_of(team, reference).is_some())
        .filter(|game| as_of.days_since(game).is_some())
        .filter_map(|game| game.date)
        .max()
}
