//! Converts two teams' efficiency snapshots into a signed composite differential.
//!
//! EPA-style components compare each team's net efficiency (offense less defense); the remaining
//! components are direct home-minus-away differences. Each raw difference is taken into points
//! terms by a fixed per-component scale before the weighted sum, so that the composite is
//! commensurate with the other sub-signals of the aggregator. A positive composite favours the
//! home team.

use std::ops::Index;

use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{Display, EnumCount, EnumIter};

use crate::domain::{SnapshotField, TeamMetricsSnapshot};
use crate::reference::SeasonAggregates;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Display, EnumIter, EnumCount)]
#[strum(serialize_all = "title_case")]
pub enum MetricComponent {
    OverallEpa,
    PassingEpa,
    RushingEpa,
    SuccessRate,
    Explosiveness,
    PassingDowns,
    StandardDowns,
    LineYards,
    SecondLevelYards,
    OpenFieldYards,
    HighlightYards,
}
impl MetricComponent {
    pub fn field(&self) -> SnapshotField {
        match self {
            MetricComponent::OverallEpa => SnapshotField::OverallEpa,
            MetricComponent::PassingEpa => SnapshotField::PassingEpa,
            MetricComponent::RushingEpa => SnapshotField::RushingEpa,
            MetricComponent::SuccessRate => SnapshotField::SuccessRate,
            MetricComponent::Explosiveness => SnapshotField::Explosiveness,
            MetricComponent::PassingDowns => SnapshotField::PassingDownsSuccess,
            MetricComponent::StandardDowns => SnapshotField::StandardDownsSuccess,
            MetricComponent::LineYards => SnapshotField::LineYards,
            MetricComponent::SecondLevelYards => SnapshotField::SecondLevelYards,
            MetricComponent::OpenFieldYards => SnapshotField::OpenFieldYards,
            MetricComponent::HighlightYards => SnapshotField::HighlightYards,
        }
    }

    /// Points per unit of raw difference.
    pub fn scale(&self) -> f64 {
        match self {
            MetricComponent::OverallEpa
            | MetricComponent::PassingEpa
            | MetricComponent::RushingEpa => 30.0,
            MetricComponent::SuccessRate
            | MetricComponent::PassingDowns
            | MetricComponent::StandardDowns => 100.0,
            MetricComponent::Explosiveness => 20.0,
            MetricComponent::LineYards
            | MetricComponent::SecondLevelYards
            | MetricComponent::OpenFieldYards
            | MetricComponent::HighlightYards => 10.0,
        }
    }

    fn is_net_efficiency(&self) -> bool {
        matches!(
            self,
            MetricComponent::OverallEpa | MetricComponent::PassingEpa | MetricComponent::RushingEpa
        )
    }
}

/// Share of the composite held by each component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricWeights {
    pub overall_epa: f64,
    pub passing_epa: f64,
    pub rushing_epa: f64,
    pub success_rate: f64,
    pub explosiveness: f64,
    pub passing_downs: f64,
    pub standard_downs: f64,
    pub line_yards: f64,
    pub second_level_yards: f64,
    pub open_field_yards: f64,
    pub highlight_yards: f64,
}
impl Default for MetricWeights {
    fn default() -> Self {
        Self {
            overall_epa: 0.05,
            passing_epa: 0.15,
            rushing_epa: 0.10,
            success_rate: 0.025,
            explosiveness: 0.025,
            passing_downs: 0.10,
            standard_downs: 0.10,
            line_yards: 0.10,
            second_level_yards: 0.10,
            open_field_yards: 0.10,
            highlight_yards: 0.15,
        }
    }
}
impl MetricWeights {
    pub fn weight(&self, component: MetricComponent) -> f64 {
        match component {
            MetricComponent::OverallEpa => self.overall_epa,
            MetricComponent::PassingEpa => self.passing_epa,
            MetricComponent::RushingEpa => self.rushing_epa,
            MetricComponent::SuccessRate => self.success_rate,
            MetricComponent::Explosiveness => self.explosiveness,
            MetricComponent::PassingDowns => self.passing_downs,
            MetricComponent::StandardDowns => self.standard_downs,
            MetricComponent::LineYards => self.line_yards,
            MetricComponent::SecondLevelYards => self.second_level_yards,
            MetricComponent::OpenFieldYards => self.open_field_yards,
            MetricComponent::HighlightYards => self.highlight_yards,
        }
    }

    pub fn sum(&self) -> f64 {
        MetricComponent::iter().map(|component| self.weight(component)).sum()
    }
}

/// Raw home-minus-away difference of every component.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricBreakdown {
    values: [f64; MetricComponent::COUNT],
}
impl MetricBreakdown {
    pub fn iter(&self) -> impl Iterator<Item = (MetricComponent, f64)> + '_ {
        MetricComponent::iter().map(|component| (component, self[component]))
    }

    /// The component's contribution to the composite, in points.
    pub fn contribution(&self, component: MetricComponent, weights: &MetricWeights) -> f64 {
        self[component] * component.scale() * weights.weight(component)
    }
}

impl Index<MetricComponent> for MetricBreakdown {
    type Output = f64;

    fn index(&self, component: MetricComponent) -> &Self::Output {
        &self.values[component as usize]
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricDifferential {
    pub breakdown: MetricBreakdown,
    pub composite: f64,
}
impl MetricDifferential {
    /// Components ordered by descending absolute contribution.
    pub fn leading_components(&self, weights: &MetricWeights) -> Vec<(MetricComponent, f64)> {
        let mut contributions: Vec<_> = MetricComponent::iter()
            .map(|component| (component, self.breakdown.contribution(component, weights)))
            .collect();
        contributions.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        contributions
    }
}

/// Missing values are replaced by the league average, so a team with no data in a component
/// neither gains nor loses against an average opponent.
pub fn differential(
    home: &TeamMetricsSnapshot,
    away: &TeamMetricsSnapshot,
    season: &SeasonAggregates,
    weights: &MetricWeights,
) -> MetricDifferential {
    let mut breakdown = MetricBreakdown::default();
    for component in MetricComponent::iter() {
        let field = component.field();
        let neutral = if component.is_net_efficiency() {
            0.0
        } else {
            season.neutral(field)
        };
        let home_value = home.get(field).unwrap_or(neutral);
        let away_value = away.get(field).unwrap_or(neutral);
        breakdown.values[component as usize] = home_value - away_value;
    }
    let composite = MetricComponent::iter()
        .map(|component| breakdown.contribution(component, weights))
        .sum();
    MetricDifferential {
        breakdown,
        composite,
    }
}
