//! The data-fetch collaborator: one asynchronous method per dataset the forecaster consumes.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    CoachingRecord, Dataset, GameContext, GameHistoryRecord, MarketLine, PlayerEfficiency,
    PollEntry, TeamMetricsSnapshot, Weather,
};
use crate::file::ReadJsonFile;
use crate::reference::ReferenceData;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{dataset} unavailable for {team}")]
    Unavailable { dataset: Dataset, team: String },

    #[error("malformed data: {0}")]
    Malformed(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    pub fn unavailable(dataset: Dataset, team: impl Into<String>) -> Self {
        Self::Unavailable {
            dataset,
            team: team.into(),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait MatchupSource {
    async fn team_metrics(&self, team: &str) -> Result<TeamMetricsSnapshot, SourceError>;

    async fn season_games(&self, team: &str) -> Result<Vec<GameHistoryRecord>, SourceError>;

    /// The team's last few games, most recent last.
    async fn recent_games(&self, team: &str) -> Result<Vec<GameHistoryRecord>, SourceError>;

    async fn roster(&self, team: &str) -> Result<Vec<PlayerEfficiency>, SourceError>;

    async fn coaching(&self, team: &str) -> Result<CoachingRecord, SourceError>;

    async fn market_lines(&self, home: &str, away: &str) -> Result<Vec<MarketLine>, SourceError>;

    async fn weather(&self, home: &str, away: &str) -> Result<Weather, SourceError>;

    async fn polls(&self) -> Result<Vec<PollEntry>, SourceError>;

    async fn context(&self, home: &str, away: &str) -> Result<GameContext, SourceError>;
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamBundle {
    pub team: String,
    pub metrics: Option<TeamMetricsSnapshot>,
    pub season_games: Option<Vec<GameHistoryRecord>>,
    pub recent_games: Option<Vec<GameHistoryRecord>>,
    pub roster: Option<Vec<PlayerEfficiency>>,
    pub coaching: Option<CoachingRecord>,
}

/// A saved set of inputs for one or more teams and the matchup between them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchupBundle {
    pub teams: Vec<TeamBundle>,
    pub market_lines: Option<Vec<MarketLine>>,
    pub weather: Option<Weather>,
    pub polls: Option<Vec<PollEntry>>,
    pub context: Option<GameContext>,
}

/// Serves a [`MatchupBundle`] held in memory, matching team names through the reference data.
pub struct BundleSource {
    bundle: MatchupBundle,
    reference: Arc<ReferenceData>,
}
impl BundleSource {
    pub fn new(bundle: MatchupBundle, reference: Arc<ReferenceData>) -> Self {
        Self { bundle, reference }
    }

    pub fn read(
        path: impl AsRef<Path>,
        reference: Arc<ReferenceData>,
    ) -> Result<Self, SourceError> {
        let bundle = MatchupBundle::read_json_file(path)?;
        for team in &bundle.teams {
            if team.team.trim().is_empty() {
                return Err(SourceError::Malformed("bundle contains a team without a name".into()));
            }
        }
        Ok(Self::new(bundle, reference))
    }

    pub fn bundle(&self) -> &MatchupBundle {
        &self.bundle
    }

    fn team(&self, team: &str) -> Option<&TeamBundle> {
        self.bundle
            .teams
            .iter()
            .find(|candidate| self.reference.same_team(&candidate.team, team))
    }

    fn team_dataset<T: Clone>(
        &self,
        team: &str,
        dataset: Dataset,
        field: impl FnOnce(&TeamBundle) -> Option<&T>,
    ) -> Result<T, SourceError> {
        self.team(team)
            .and_then(field)
            .cloned()
            .ok_or_else(|| SourceError::unavailable(dataset, team))
    }

    fn matchup_dataset<T: Clone>(
        &self,
        home: &str,
        away: &str,
        dataset: Dataset,
        value: &Option<T>,
    ) -> Result<T, SourceError> {
        value
            .clone()
            .ok_or_else(|| SourceError::unavailable(dataset, format!("{home} vs {away}")))
    }
}

impl MatchupSource for BundleSource {
    async fn team_metrics(&self, team: &str) -> Result<TeamMetricsSnapshot, SourceError> {
        self.team_dataset(team, Dataset::TeamMetrics, |bundle| bundle.metrics.as_ref())
    }

    async fn season_games(&self, team: &str) -> Result<Vec<GameHistoryRecord>, SourceError> {
        self.team_dataset(team, Dataset::SeasonGames, |bundle| bundle.season_games.as_ref())
    }

    async fn recent_games(&self, team: &str) -> Result<Vec<GameHistoryRecord>, SourceError> {
        self.team_dataset(team, Dataset::RecentGames, |bundle| bundle.recent_games.as_ref())
    }

    async fn roster(&self, team: &str) -> Result<Vec<PlayerEfficiency>, SourceError> {
        self.team_dataset(team, Dataset::Roster, |bundle| bundle.roster.as_ref())
    }

    async fn coaching(&self, team: &str) -> Result<CoachingRecord, SourceError> {
        self.team_dataset(team, Dataset::Coaching, |bundle| bundle.coaching.as_ref())
    }

    async fn market_lines(&self, home: &str, away: &str) -> Result<Vec<MarketLine>, SourceError> {
        self.matchup_dataset(home, away, Dataset::MarketLines, &self.bundle.market_lines)
    }

    async fn weather(&self, home: &str, away: &str) -> Result<Weather, SourceError> {
        self.matchup_dataset(home, away, Dataset::Weather, &self.bundle.weather)
    }

    async fn polls(&self) -> Result<Vec<PollEntry>, SourceError> {
        self.bundle
            .polls
            .clone()
            .ok_or_else(|| SourceError::unavailable(Dataset::Polls, "all teams"))
    }

    async fn context(&self, home: &str, away: &str) -> Result<GameContext, SourceError> {
        self.matchup_dataset(home, away, Dataset::Context, &self.bundle.context)
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use crate::file::WriteJsonFile;

    use super::*;

    fn bundle() -> MatchupBundle {
        MatchupBundle {
            teams: vec![TeamBundle {
                team: "Miami (FL)".into(),
                metrics: Some(TeamMetricsSnapshot {
                    success_rate: Some(0.47),
                    ..TeamMetricsSnapshot::named("Miami (FL)")
                }),
                coaching: Some(CoachingRecord {
                    coach: "Mario Cristobal".into(),
                    wins: 60,
                    losses: 40,
                    seasons: 9,
                }),
                ..TeamBundle::default()
            }],
            weather: Some(Weather {
                temperature: Some(84.0),
                ..Weather::default()
            }),
            ..MatchupBundle::default()
        }
    }

    #[tokio::test]
    async fn serves_team_datasets_by_alias() {
        let reference = Arc::new(ReferenceData::default().with_alias("The U", "Miami (FL)"));
        let source = BundleSource::new(bundle(), reference);
        let metrics = source.team_metrics("the u").await.unwrap();
        assert_eq!(Some(0.47), metrics.success_rate);
        assert_eq!(60, source.coaching("Miami FL").await.unwrap().wins);
        assert_eq!(Some(84.0), source.weather("Miami (FL)", "Duke").await.unwrap().temperature);
    }

    #[tokio::test]
    async fn missing_datasets_are_unavailable() {
        let source = BundleSource::new(bundle(), Arc::new(ReferenceData::default()));
        match source.roster("Miami (FL)").await {
            Err(SourceError::Unavailable { dataset, team }) => {
                assert_eq!(Dataset::Roster, dataset);
                assert_eq!("Miami (FL)", team);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(source.team_metrics("Duke").await.is_err());
        let err = source.market_lines("Miami (FL)", "Duke").await.unwrap_err();
        assert_eq!("Market Lines unavailable for Miami (FL) vs Duke", err.to_string());
    }

    #[test]
    fn read_from_file() {
        let path = env::temp_dir().join(format!("gridcast-bundle-{}.json", std::process::id()));
        bundle().write_json_file(&path).unwrap();
        let source = BundleSource::read(&path, Arc::new(ReferenceData::default())).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(&bundle(), source.bundle());
    }

    #[test]
    fn read_rejects_nameless_teams() {
        let path = env::temp_dir().join(format!("gridcast-nameless-{}.json", std::process::id()));
        let bundle = MatchupBundle {
            teams: vec![TeamBundle::default()],
            ..MatchupBundle::default()
        };
        bundle.write_json_file(&path).unwrap();
        let result = BundleSource::read(&path, Arc::new(ReferenceData::default()));
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(SourceError::Malformed(_))));
    }
}
