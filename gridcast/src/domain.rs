//! Value types consumed and produced by the forecasting pipeline.
//!
//! Every record is a plain, defaulted value type: optional inputs are `Option` fields rather than
//! keys that may or may not be present, and the typed accessors sanitise what they hand out.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::reference::ReferenceData;

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
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Side {
    Home,
    Away,
}
impl Side {
    pub fn flip(&self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }

    /// `+1` for the home side, `-1` for the away side.
    pub fn sign(&self) -> f64 {
        match self {
            Side::Home => 1.0,
            Side::Away => -1.0,
        }
    }
}

/// Returns the value if it is a valid rate in `[0, 1]`.
pub fn rate(value: Option<f64>) -> Option<f64> {
    value.filter(|value| (0.0..=1.0).contains(value))
}

/// Returns the value if it is finite.
pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|value| value.is_finite())
}

/// Per-play efficiency generated on offense and conceded on defense.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Efficiency {
    pub offense: Option<f64>,
    pub defense: Option<f64>,
}
impl Efficiency {
    pub fn new(offense: f64, defense: f64) -> Self {
        Self {
            offense: Some(offense),
            defense: Some(defense),
        }
    }

    /// Offense less defense, present only when both sides are.
    pub fn net(&self) -> Option<f64> {
        Some(finite(self.offense)? - finite(self.defense)?)
    }
}

/// Addressable fields of a [`TeamMetricsSnapshot`].
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
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SnapshotField {
    OverallEpa,
    PassingEpa,
    RushingEpa,
    SuccessRate,
    Explosiveness,
    PassingDownsSuccess,
    StandardDownsSuccess,
    LineYards,
    SecondLevelYards,
    OpenFieldYards,
    HighlightYards,
    Talent,
    RecentForm,
    Rating,
    OffenseRating,
    DefenseRating,
    SeasonTrend,
    StrengthOfSchedule,
    Consistency,
}
impl SnapshotField {
    pub fn is_rate(&self) -> bool {
        matches!(
            self,
            SnapshotField::SuccessRate
                | SnapshotField::PassingDownsSuccess
                | SnapshotField::StandardDownsSuccess
                | SnapshotField::RecentForm
                | SnapshotField::Consistency
        )
    }

    /// Built-in league-typical value, substituted when neither the team nor the season
    /// aggregates supply one.
    pub fn neutral(&self) -> f64 {
        match self {
            SnapshotField::OverallEpa
            | SnapshotField::PassingEpa
            | SnapshotField::RushingEpa => 0.0,
            SnapshotField::SuccessRate => 0.42,
            SnapshotField::Explosiveness => 1.25,
            SnapshotField::PassingDownsSuccess => 0.30,
            SnapshotField::StandardDownsSuccess => 0.47,
            SnapshotField::LineYards => 2.8,
            SnapshotField::SecondLevelYards => 1.0,
            SnapshotField::OpenFieldYards => 1.2,
            SnapshotField::HighlightYards => 1.0,
            SnapshotField::Talent => 700.0,
            SnapshotField::RecentForm => 0.5,
            SnapshotField::Rating => 0.0,
            SnapshotField::OffenseRating | SnapshotField::DefenseRating => 25.0,
            SnapshotField::SeasonTrend => 0.0,
            SnapshotField::StrengthOfSchedule => 0.0,
            SnapshotField::Consistency => 0.5,
        }
    }
}

/// Point-in-time advanced statistics of one team.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamMetricsSnapshot {
    pub team: String,
    pub overall_epa: Efficiency,
    pub passing_epa: Efficiency,
    pub rushing_epa: Efficiency,
    pub success_rate: Option<f64>,
    pub explosiveness: Option<f64>,
    pub passing_downs_success: Option<f64>,
    pub standard_downs_success: Option<f64>,
    pub line_yards: Option<f64>,
    pub second_level_yards: Option<f64>,
    pub open_field_yards: Option<f64>,
    pub highlight_yards: Option<f64>,
    pub talent: Option<f64>,
    pub recent_form: Option<f64>,
    pub rating: Option<f64>,
    pub offense_rating: Option<f64>,
    pub defense_rating: Option<f64>,
    pub season_trend: Option<f64>,
    pub strength_of_schedule: Option<f64>,
    pub consistency: Option<f64>,
}
impl TeamMetricsSnapshot {
    pub fn named(team: impl Into<String>) -> Self {
        Self {
            team: team.into(),
            ..Self::default()
        }
    }

    /// Typed accessor: rate fields outside `[0, 1]` and non-finite values read as missing.
    pub fn get(&self, field: SnapshotField) -> Option<f64> {
        let value = match field {
            SnapshotField::OverallEpa => return self.overall_epa.net(),
            SnapshotField::PassingEpa => return self.passing_epa.net(),
            SnapshotField::RushingEpa => return self.rushing_epa.net(),
            SnapshotField::SuccessRate => self.success_rate,
            SnapshotField::Explosiveness => self.explosiveness,
            SnapshotField::PassingDownsSuccess => self.passing_downs_success,
            SnapshotField::StandardDownsSuccess => self.standard_downs_success,
            SnapshotField::LineYards => self.line_yards,
            SnapshotField::SecondLevelYards => self.second_level_yards,
            SnapshotField::OpenFieldYards => self.open_field_yards,
            SnapshotField::HighlightYards => self.highlight_yards,
            SnapshotField::Talent => self.talent,
            SnapshotField::RecentForm => self.recent_form,
            SnapshotField::Rating => self.rating,
            SnapshotField::OffenseRating => self.offense_rating,
            SnapshotField::DefenseRating => self.defense_rating,
            SnapshotField::SeasonTrend => self.season_trend,
            SnapshotField::StrengthOfSchedule => self.strength_of_schedule,
            SnapshotField::Consistency => self.consistency,
        };
        if field.is_rate() {
            rate(value)
        } else {
            finite(value)
        }
    }

    /// Whether any per-play efficiency metric is present.
    pub fn has_efficiency(&self) -> bool {
        [
            SnapshotField::OverallEpa,
            SnapshotField::PassingEpa,
            SnapshotField::RushingEpa,
            SnapshotField::SuccessRate,
            SnapshotField::Explosiveness,
        ]
        .into_iter()
        .any(|field| self.get(field).is_some())
    }
}

/// One completed or scheduled game of a team's season.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameHistoryRecord {
    pub week: u32,
    pub date: Option<NaiveDate>,
    pub home_team: String,
    pub away_team: String,
    pub home_points: Option<u32>,
    pub away_points: Option<u32>,
    pub home_pregame_win_prob: Option<f64>,
    pub home_postgame_win_prob: Option<f64>,
    pub away_postgame_win_prob: Option<f64>,
    pub home_start_rating: Option<f64>,
    pub away_start_rating: Option<f64>,
    pub completed: bool,
}
impl GameHistoryRecord {
    /// The side `team` played on, matching names through the reference aliases.
    pub fn side_of(&self, team: &str, reference: &ReferenceData) -> Option<Side> {
        if reference.same_team(&self.home_team, team) {
            Some(Side::Home)
        } else if reference.same_team(&self.away_team, team) {
            Some(Side::Away)
        } else {
            None
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed || (self.home_points.is_some() && self.away_points.is_some())
    }

    /// Post-game win probability from the perspective of `side`. The away figure falls back to the
    /// complement of the home figure.
    pub fn postgame_win_prob(&self, side: Side) -> Option<f64> {
        match side {
            Side::Home => rate(self.home_postgame_win_prob),
            Side::Away => rate(self.away_postgame_win_prob)
                .or_else(|| rate(self.home_postgame_win_prob).map(|prob| 1.0 - prob)),
        }
    }

    /// Final margin from the perspective of `side`.
    pub fn margin(&self, side: Side) -> Option<f64> {
        let home = self.home_points? as f64;
        let away = self.away_points? as f64;
        Some(side.sign() * (home - away))
    }
}

/// One provider's quote, always oriented home/away. `spread` is the number of points the home team
/// receives, so a home favourite carries a negative spread.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketLine {
    pub provider: String,
    pub spread: Option<f64>,
    pub total: Option<f64>,
    pub moneyline_home: Option<i32>,
    pub moneyline_away: Option<i32>,
}
impl MarketLine {
    pub fn new(provider: impl Into<String>, spread: f64, total: f64) -> Self {
        Self {
            provider: provider.into(),
            spread: Some(spread),
            total: Some(total),
            ..Self::default()
        }
    }

    pub fn with_moneylines(self, home: i32, away: i32) -> Self {
        Self {
            moneyline_home: Some(home),
            moneyline_away: Some(away),
            ..self
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weather {
    /// Degrees Fahrenheit.
    pub temperature: Option<f64>,
    /// Miles per hour.
    pub wind_speed: Option<f64>,
    /// Inches.
    pub precipitation: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub indoors: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollEntry {
    pub poll: String,
    pub team: String,
    pub rank: u32,
    pub previous_rank: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachingRecord {
    pub coach: String,
    pub wins: u32,
    pub losses: u32,
    pub seasons: u32,
}
impl CoachingRecord {
    pub fn win_pct(&self) -> Option<f64> {
        let games = self.wins + self.losses;
        if games == 0 {
            None
        } else {
            Some(self.wins as f64 / games as f64)
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
    EnumString,
)]
pub enum Position {
    #[serde(rename = "QB")]
    #[strum(serialize = "QB")]
    Quarterback,
    #[serde(rename = "RB")]
    #[strum(serialize = "RB")]
    RunningBack,
    #[serde(rename = "WR")]
    #[strum(serialize = "WR")]
    WideReceiver,
    #[serde(rename = "TE")]
    #[strum(serialize = "TE")]
    TightEnd,
    #[serde(rename = "DEF")]
    #[strum(serialize = "DEF")]
    Defender,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerEfficiency {
    pub name: String,
    pub position: Position,
    #[serde(default)]
    pub usage: Option<f64>,
    #[serde(default)]
    pub efficiency: Option<f64>,
}

/// Calendar and situational attributes of the game being forecast.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameContext {
    pub week: u32,
    pub date: Option<NaiveDate>,
    /// Local kickoff hour, 24-hour clock.
    pub kickoff_hour: Option<u32>,
    pub neutral_site: bool,
    pub conference_game: bool,
    pub rivalry: bool,
    /// Explicit prime-time flag; when absent the kickoff hour decides.
    pub prime_time: Option<bool>,
    pub high_stakes: bool,
    pub home_rest_days: Option<u32>,
    pub away_rest_days: Option<u32>,
}

/// Datasets supplied by the data-fetch collaborator.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Display, EnumIter)]
#[strum(serialize_all = "title_case")]
pub enum Dataset {
    TeamMetrics,
    SeasonGames,
    RecentGames,
    Roster,
    Coaching,
    MarketLines,
    Weather,
    Polls,
    Context,
}

/// Everything known about one team for a single request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamInputs {
    pub snapshot: TeamMetricsSnapshot,
    pub season_games: Option<Vec<GameHistoryRecord>>,
    pub recent_games: Option<Vec<GameHistoryRecord>>,
    pub roster: Option<Vec<PlayerEfficiency>>,
    pub coaching: Option<CoachingRecord>,
}
impl TeamInputs {
    pub fn new(snapshot: TeamMetricsSnapshot) -> Self {
        Self {
            snapshot,
            ..Self::default()
        }
    }
}

/// The complete, immutable input set of one forecast.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchupInputs {
    pub home: TeamInputs,
    pub away: TeamInputs,
    pub market_lines: Option<Vec<MarketLine>>,
    pub weather: Option<Weather>,
    pub polls: Option<Vec<PollEntry>>,
    pub context: Option<GameContext>,
    #[serde(skip)]
    pub unavailable: Vec<Dataset>,
}
impl MatchupInputs {
    pub fn team(&self, side: Side) -> &TeamInputs {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }
}

/// The model's view of a single matchup.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub home_team: String,
    pub away_team: String,
    pub home_win_probability: f64,
    /// Positive when the home team is favoured.
    pub predicted_spread: f64,
    pub predicted_total: f64,
    pub confidence: f64,
    pub key_factors: Vec<String>,
}
