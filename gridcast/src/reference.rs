//! Read-only reference dataset shared by all forecasts of a process.
//!
//! The dataset is assembled once (typically from JSON at startup), wrapped in an `Arc` and handed
//! to the [`Forecaster`](crate::forecast::Forecaster) at construction. Nothing mutates it
//! afterwards.

use std::io;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::debug;

use crate::domain::{CoachingRecord, SnapshotField};
use crate::file::ReadJsonFile;

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
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Tier {
    Power,
    Group,
    Independent,
    Fcs,
}
impl Tier {
    /// Team rating assumed for a member of this tier when no rating is supplied.
    pub fn default_rating(&self) -> f64 {
        match self {
            Tier::Power => 8.0,
            Tier::Group => -4.0,
            Tier::Independent => 0.0,
            Tier::Fcs => -20.0,
        }
    }
}

/// League-wide aggregates of the current season.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonAggregates {
    pub season: Option<u16>,
    pub league_averages: FxHashMap<SnapshotField, f64>,
}
impl SeasonAggregates {
    /// The league average of `field`, or the field's built-in neutral value.
    pub fn neutral(&self, field: SnapshotField) -> f64 {
        self.league_averages
            .get(&field)
            .copied()
            .filter(|value| value.is_finite())
            .unwrap_or_else(|| field.neutral())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceData {
    pub season: SeasonAggregates,
    tiers: FxHashMap<String, Tier>,
    coaches: FxHashMap<String, CoachingRecord>,
    aliases: FxHashMap<String, String>,
}
impl ReferenceData {
    /// Loads the dataset from a JSON file, re-keying every table by normalised team name.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, io::Error> {
        let raw = Self::read_json_file(path)?;
        let data = raw.rekeyed();
        debug!(
            "loaded reference data: {} tiers, {} coaches, {} aliases",
            data.tiers.len(),
            data.coaches.len(),
            data.aliases.len()
        );
        Ok(data)
    }

    pub fn with_league_average(mut self, field: SnapshotField, value: f64) -> Self {
        self.season.league_averages.insert(field, value);
        self
    }

    pub fn with_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.aliases
            .insert(canonical_key(alias), canonical_key(canonical));
        self
    }

    pub fn with_tier(mut self, team: &str, tier: Tier) -> Self {
        let key = self.normalize_name(team);
        self.tiers.insert(key, tier);
        self
    }

    pub fn with_coach(mut self, team: &str, record: CoachingRecord) -> Self {
        let key = self.normalize_name(team);
        self.coaches.insert(key, record);
        self
    }

    /// Lower-cases, collapses punctuation and whitespace runs into single spaces and resolves
    /// aliases, so that `"Miami (FL)"` and `"miami-fl"` land on the same key.
    pub fn normalize_name(&self, name: &str) -> String {
        let key = canonical_key(name);
        match self.aliases.get(&key) {
            None => key,
            Some(canonical) => canonical.clone(),
        }
    }

    pub fn same_team(&self, a: &str, b: &str) -> bool {
        self.normalize_name(a) == self.normalize_name(b)
    }

    pub fn tier(&self, team: &str) -> Option<Tier> {
        self.tiers.get(&self.normalize_name(team)).copied()
    }

    pub fn coaching(&self, team: &str) -> Option<&CoachingRecord> {
        self.coaches.get(&self.normalize_name(team))
    }

    fn rekeyed(self) -> Self {
        let aliases: FxHashMap<_, _> = self
            .aliases
            .into_iter()
            .map(|(alias, canonical)| (canonical_key(&alias), canonical_key(&canonical)))
            .collect();
        let mut data = Self {
            season: self.season,
            tiers: FxHashMap::default(),
            coaches: FxHashMap::default(),
            aliases,
        };
        for (team, tier) in self.tiers {
            let key = data.normalize_name(&team);
            data.tiers.insert(key, tier);
        }
        for (team, record) in self.coaches {
            let key = data.normalize_name(&team);
            data.coaches.insert(key, record);
        }
        data
    }
}

fn canonical_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut pending_space = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_space && !key.is_empty() {
                key.push(' ');
            }
            pending_space = false;
            key.extend(c.to_lowercase());
        } else if c != '&' && c != '\'' && c != '.' {
            pending_space = true;
        }
    }
    key
}
