//! Player-impact sub-score: quarterback, skill-position group and front-line defenders.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::domain::{PlayerEfficiency, Position};
use crate::reference::ReferenceData;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerImpactConfig {
    pub quarterback_weight: f64,
    pub skill_weight: f64,
    pub defender_weight: f64,
    /// Points per unit of per-play efficiency difference.
    pub points_per_unit: f64,
}
impl Default for PlayerImpactConfig {
    fn default() -> Self {
        Self {
            quarterback_weight: 0.40,
            skill_weight: 0.35,
            defender_weight: 0.25,
            points_per_unit: 10.0,
        }
    }
}

/// How many players of each position make up a unit.
const SKILL_SLOTS: [(Position, usize); 3] = [
    (Position::RunningBack, 2),
    (Position::WideReceiver, 3),
    (Position::TightEnd, 1),
];
const DEFENDER_SLOTS: usize = 5;

/// Average efficiency of each unit of a single team; `None` where the roster has no rated players.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UnitStrength {
    pub quarterback: Option<f64>,
    pub skill: Option<f64>,
    pub defenders: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerImpact {
    pub quarterback: f64,
    pub skill: f64,
    pub defenders: f64,
    pub score: f64,
}

/// Collapses duplicate listings of the same player (by normalised name), keeping the entry with
/// the highest usage.
fn dedupe<'a>(
    roster: &'a [PlayerEfficiency],
    reference: &ReferenceData,
) -> Vec<&'a PlayerEfficiency> {
    let mut by_name: FxHashMap<(String, Position), &PlayerEfficiency> = FxHashMap::default();
    for player in roster {
        let key = (reference.normalize_name(&player.name), player.position);
        by_name
            .entry(key)
            .and_modify(|existing| {
                if player.usage.unwrap_or(0.0) > existing.usage.unwrap_or(0.0) {
                    *existing = player;
                }
            })
            .or_insert(player);
    }
    let mut players: Vec<_> = by_name.into_values().collect();
    players.sort_by(|a, b| a.name.cmp(&b.name));
    players
}

/// The top `count` rated players of a position, by usage and then by efficiency.
fn top(players: &[&PlayerEfficiency], position: Position, count: usize) -> Vec<f64> {
    let mut rated: Vec<_> = players
        .iter()
        .filter(|player| player.position == position)
        .filter_map(|player| {
            let efficiency = player.efficiency.filter(|value| value.is_finite())?;
            Some((player.usage.unwrap_or(0.0), efficiency))
        })
        .collect();
    rated.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.total_cmp(&a.1)));
    rated.into_iter().take(count).map(|(_, efficiency)| efficiency).collect()
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn unit_strength(roster: &[PlayerEfficiency], reference: &ReferenceData) -> UnitStrength {
    let players = dedupe(roster, reference);
    let quarterback = top(&players, Position::Quarterback, 1).first().copied();
    let skill: Vec<_> = SKILL_SLOTS
        .iter()
        .flat_map(|&(position, count)| top(&players, position, count))
        .collect();
    let defenders = top(&players, Position::Defender, DEFENDER_SLOTS);
    UnitStrength {
        quarterback,
        skill: average(&skill),
        defenders: average(&defenders),
    }
}

fn unit_difference(home: Option<f64>, away: Option<f64>) -> f64 {
    match (home, away) {
        (Some(home), Some(away)) => home - away,
        _ => 0.0,
    }
}

/// Home-minus-away player impact in points. Units rated for only one of the teams contribute
/// nothing.
pub fn impact(
    home: &[PlayerEfficiency],
    away: &[PlayerEfficiency],
    reference: &ReferenceData,
    config: &PlayerImpactConfig,
) -> PlayerImpact {
    let home = unit_strength(home, reference);
    let away = unit_strength(away, reference);
    let quarterback = unit_difference(home.quarterback, away.quarterback) * config.points_per_unit;
    let skill = unit_difference(home.skill, away.skill) * config.points_per_unit;
    let defenders = unit_difference(home.defenders, away.defenders) * config.points_per_unit;
    let score = config.quarterback_weight * quarterback
        + config.skill_weight * skill
        + config.defender_weight * defenders;
    PlayerImpact {
        quarterback,
        skill,
        defenders,
        score,
    }
}
