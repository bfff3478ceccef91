//! The forecasting engine: gathers a matchup's inputs concurrently, derives missing snapshot
//! fields, runs the pipeline and explains the result.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregate::{
    aggregate, enhancement, market_signal, opponent_adjusted, ratings_signal, Adjustment,
    AggregatedSignal, SubSignals,
};
use crate::calibrate::raw_probability;
use crate::confidence::{score, Availability, ConfidenceBreakdown, ConfidenceInputs};
use crate::config::ModelConfig;
use crate::context::{contextual_score, ContextInputs, ContextualScore};
use crate::convert::{spread_from_probability, total_points, ImpliedScores, TotalInputs};
use crate::domain::{
    Dataset, Forecast, GameContext, GameHistoryRecord, MarketLine, MatchupInputs, Side,
    SnapshotField, TeamInputs, TeamMetricsSnapshot,
};
use crate::form::{consistency, last_played, season_trend, AsOf, FormWeighter};
use crate::market::{
    consensus, consensus_of, edge_report, normalize_all, BettingEdgeReport, ConsensusMarket,
    MarketConfig,
};
use crate::metrics::{differential, MetricDifferential};
use crate::player::{impact, PlayerImpact};
use crate::reference::ReferenceData;
use crate::rules::{self, FiredRule};
use crate::source::{MatchupSource, SourceError};

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("required metrics unavailable for {team}: {source}")]
    HardFetchFailure { team: String, source: SourceError },

    #[error("unknown team '{0}'")]
    UnknownTeam(String),

    #[error("{0} cannot play itself")]
    SameTeam(String),
}

/// Everything the pipeline computed on the way to a [`Forecast`].
#[derive(Clone, Debug)]
pub struct Assessment {
    pub forecast: Forecast,
    /// The snapshots after derived fields were filled in.
    pub home: TeamMetricsSnapshot,
    pub away: TeamMetricsSnapshot,
    pub metrics: MetricDifferential,
    pub player: PlayerImpact,
    pub context: ContextualScore,
    pub fired_rules: Vec<FiredRule>,
    pub aggregated: AggregatedSignal,
    pub raw_probability: f64,
    pub implied: ImpliedScores,
    pub confidence: ConfidenceBreakdown,
    /// Market consensus from the home team's perspective.
    pub consensus: ConsensusMarket,
    pub market_lines: Vec<MarketLine>,
    pub unavailable: Vec<Dataset>,
}
impl Assessment {
    /// The forecast's betting edges from the perspective of the team on `side`.
    pub fn edge_report(&self, side: Side, config: &MarketConfig) -> BettingEdgeReport {
        let lines = normalize_all(&self.market_lines, side);
        let consensus = consensus_of(&lines, side, config);
        edge_report(&self.forecast, &consensus, &lines, config)
    }
}

pub struct Forecaster {
    reference: Arc<ReferenceData>,
    config: ModelConfig,
    form: FormWeighter,
}
impl Forecaster {
    /// Fails if `config` does not pass [`ModelConfig::validate`].
    pub fn new(reference: Arc<ReferenceData>, config: ModelConfig) -> Result<Self, anyhow::Error> {
        config.validate()?;
        let form = FormWeighter::new(&config.form);
        Ok(Self {
            reference,
            config,
            form,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub async fn forecast(
        &self,
        source: &impl MatchupSource,
        home: &str,
        away: &str,
    ) -> Result<Forecast, ForecastError> {
        let inputs = self.gather(source, home, away).await?;
        Ok(self.assess(&inputs).forecast)
    }

    /// Fetches every dataset concurrently. Missing team metrics fail the request; any other
    /// failure is logged, recorded as unavailable and left to its neutral default.
    pub async fn gather(
        &self,
        source: &impl MatchupSource,
        home: &str,
        away: &str,
    ) -> Result<MatchupInputs, ForecastError> {
        for team in [home, away] {
            if self.reference.normalize_name(team).is_empty() {
                return Err(ForecastError::UnknownTeam(team.to_string()));
            }
        }
        if self.reference.same_team(home, away) {
            return Err(ForecastError::SameTeam(home.to_string()));
        }

        let (
            home_metrics,
            away_metrics,
            home_season,
            away_season,
            home_recent,
            away_recent,
            home_roster,
            away_roster,
            home_coaching,
            away_coaching,
            market_lines,
            weather,
            polls,
            context,
        ) = tokio::join!(
            source.team_metrics(home),
            source.team_metrics(away),
            source.season_games(home),
            source.season_games(away),
            source.recent_games(home),
            source.recent_games(away),
            source.roster(home),
            source.roster(away),
            source.coaching(home),
            source.coaching(away),
            source.market_lines(home, away),
            source.weather(home, away),
            source.polls(),
            source.context(home, away),
        );

        let required = |team: &str, result: Result<TeamMetricsSnapshot, SourceError>| {
            result
                .map(|mut snapshot| {
                    if snapshot.team.trim().is_empty() {
                        snapshot.team = team.to_string();
                    }
                    snapshot
                })
                .map_err(|source| ForecastError::HardFetchFailure {
                    team: team.to_string(),
                    source,
                })
        };
        let home_snapshot = required(home, home_metrics)?;
        let away_snapshot = required(away, away_metrics)?;

        let mut unavailable = vec![];
        let home_inputs = TeamInputs {
            snapshot: home_snapshot,
            season_games: optional(Dataset::SeasonGames, home, home_season, &mut unavailable),
            recent_games: optional(Dataset::RecentGames, home, home_recent, &mut unavailable),
            roster: optional(Dataset::Roster, home, home_roster, &mut unavailable),
            coaching: optional(Dataset::Coaching, home, home_coaching, &mut unavailable),
        };
        let away_inputs = TeamInputs {
            snapshot: away_snapshot,
            season_games: optional(Dataset::SeasonGames, away, away_season, &mut unavailable),
            recent_games: optional(Dataset::RecentGames, away, away_recent, &mut unavailable),
            roster: optional(Dataset::Roster, away, away_roster, &mut unavailable),
            coaching: optional(Dataset::Coaching, away, away_coaching, &mut unavailable),
        };
        let matchup = format!("{home} vs {away}");
        let market_lines = optional(Dataset::MarketLines, &matchup, market_lines, &mut unavailable);
        let weather = optional(Dataset::Weather, &matchup, weather, &mut unavailable);
        let polls = optional(Dataset::Polls, &matchup, polls, &mut unavailable);
        let context = optional(Dataset::Context, &matchup, context, &mut unavailable);
        let inputs = MatchupInputs {
            home: home_inputs,
            away: away_inputs,
            market_lines,
            weather,
            polls,
            context,
            unavailable,
        };
        Ok(inputs)
    }

    pub fn assess(&self, inputs: &MatchupInputs) -> Assessment {
        let config = &self.config;
        let reference = &*self.reference;
        let game = inputs.context.clone().unwrap_or_default();
        let as_of = AsOf {
            week: game.week,
            date: game.date,
        };

        let home = self.prepare(&inputs.home, &as_of);
        let away = self.prepare(&inputs.away, &as_of);

        let metrics = differential(&home, &away, &reference.season, &config.metric_weights);
        let adjustment = Adjustment {
            home_form: form_of(&home),
            away_form: form_of(&away),
            home_schedule: home.get(SnapshotField::StrengthOfSchedule).unwrap_or(0.0),
            away_schedule: away.get(SnapshotField::StrengthOfSchedule).unwrap_or(0.0),
        };

        let market_lines = inputs.market_lines.clone().unwrap_or_default();
        let consensus = consensus(&market_lines, Side::Home, &config.market);

        let player = impact(
            inputs.home.roster.as_deref().unwrap_or_default(),
            inputs.away.roster.as_deref().unwrap_or_default(),
            reference,
            &config.player,
        );

        let home_coach = inputs
            .home
            .coaching
            .as_ref()
            .or_else(|| reference.coaching(&home.team));
        let away_coach = inputs
            .away
            .coaching
            .as_ref()
            .or_else(|| reference.coaching(&away.team));
        let context = contextual_score(
            &ContextInputs {
                home: &home,
                away: &away,
                weather: inputs.weather.as_ref(),
                polls: inputs.polls.as_deref().unwrap_or_default(),
                home_rest_days: game
                    .home_rest_days
                    .or_else(|| rest_days(&home.team, &inputs.home, &as_of, reference)),
                away_rest_days: game
                    .away_rest_days
                    .or_else(|| rest_days(&away.team, &inputs.away, &as_of, reference)),
                home_coach,
                away_coach,
                reference,
            },
            &config.context,
        );

        let signals = SubSignals {
            opponent_adjusted: opponent_adjusted(&metrics, &adjustment, &config.aggregate),
            market: market_signal(consensus.home_spread(), &config.aggregate),
            ratings: ratings_signal(&home, &away, &reference.season, &config.aggregate),
            player: player.score,
            contextual: context.score,
        };
        let fired_rules = rules::apply(&config.rules, &home, &away);
        let enhancement = enhancement(
            &metrics,
            &home,
            &away,
            &reference.season,
            &config.aggregate.enhancement,
        );
        let aggregated = aggregate(
            signals,
            inputs.context.as_ref(),
            &fired_rules,
            enhancement,
            &config.aggregate,
        );

        let raw_probability = raw_probability(aggregated.differential, &config.calibration);
        let probability = config.calibration.platt.calibrate(raw_probability);
        let spread = spread_from_probability(probability, &config.conversion);
        let total = total_points(
            &TotalInputs {
                home_offense: home.get(SnapshotField::OffenseRating),
                home_defense: home.get(SnapshotField::DefenseRating),
                away_offense: away.get(SnapshotField::OffenseRating),
                away_defense: away.get(SnapshotField::DefenseRating),
                neutral_site: game.neutral_site,
                weather_severity: context.severity,
            },
            &config.conversion,
        );
        let implied = ImpliedScores::new(total, spread);

        let confidence = score(
            &ConfidenceInputs {
                availability: availability(inputs),
                home_consistency: home.get(SnapshotField::Consistency),
                away_consistency: away.get(SnapshotField::Consistency),
                differential: aggregated.differential,
                home_trend: home.get(SnapshotField::SeasonTrend),
                away_trend: away.get(SnapshotField::SeasonTrend),
                market_gap: consensus.home_spread().map(|home_spread| spread + home_spread),
            },
            &config.confidence,
        );

        let key_factors = self.key_factors(
            &home,
            &away,
            &metrics,
            &aggregated,
            &context,
            &consensus,
            inputs,
        );
        let forecast = Forecast {
            home_team: home.team.clone(),
            away_team: away.team.clone(),
            home_win_probability: probability,
            predicted_spread: spread,
            predicted_total: total,
            confidence: confidence.confidence,
            key_factors,
        };
        info!(
            "{} vs {}: p={:.3}, spread={:+.1}, total={:.1}, confidence={:.2}",
            forecast.home_team,
            forecast.away_team,
            forecast.home_win_probability,
            forecast.predicted_spread,
            forecast.predicted_total,
            forecast.confidence
        );

        Assessment {
            forecast,
            home,
            away,
            metrics,
            player,
            context,
            fired_rules,
            aggregated,
            raw_probability,
            implied,
            confidence,
            consensus,
            market_lines,
            unavailable: inputs.unavailable.clone(),
        }
    }

    /// Fills the snapshot fields the collaborator left missing: recent form, season trend and
    /// consistency from the game history, and the rating from the team's tier.
    fn prepare(&self, team: &TeamInputs, as_of: &AsOf) -> TeamMetricsSnapshot {
        let mut snapshot = team.snapshot.clone();
        let name = snapshot.team.clone();
        let season_games = team.season_games.as_deref().unwrap_or_default();
        if snapshot.get(SnapshotField::RecentForm).is_none() {
            let recent = team.recent_games.as_deref().unwrap_or(season_games);
            snapshot.recent_form = self.form.weighted_form(&name, recent, as_of, &self.reference);
        }
        if snapshot.get(SnapshotField::SeasonTrend).is_none() {
            snapshot.season_trend = season_trend(&name, season_games, &self.reference);
        }
        if snapshot.get(SnapshotField::Consistency).is_none() {
            snapshot.consistency = consistency(&name, season_games, &self.reference);
        }
        if snapshot.get(SnapshotField::Rating).is_none() {
            snapshot.rating = self.reference.tier(&name).map(|tier| tier.default_rating());
        }
        debug!("prepared snapshot: {snapshot:?}");
        snapshot
    }

    #[allow(clippy::too_many_arguments)]
    fn key_factors(
        &self,
        home: &TeamMetricsSnapshot,
        away: &TeamMetricsSnapshot,
        metrics: &MetricDifferential,
        aggregated: &AggregatedSignal,
        context: &ContextualScore,
        consensus: &ConsensusMarket,
        inputs: &MatchupInputs,
    ) -> Vec<String> {
        let favoured = |points: f64| if points >= 0.0 { &home.team } else { &away.team };
        let mut factors = vec![];

        for (component, contribution) in metrics
            .leading_components(&self.config.metric_weights)
            .into_iter()
            .filter(|(_, contribution)| contribution.abs() >= MIN_FACTOR_POINTS)
            .take(3)
        {
            factors.push(format!(
                "{component} edge: {} ({:+.1})",
                favoured(contribution),
                contribution.abs()
            ));
        }

        if let Some((signal, value)) = aggregated
            .signals
            .iter()
            .map(|(signal, value)| (signal, value * self.config.aggregate.weights.weight(signal)))
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .filter(|(_, value)| value.abs() >= MIN_FACTOR_POINTS)
        {
            factors.push(format!(
                "Strongest signal: {signal} favours {} ({:+.1})",
                favoured(value),
                value.abs()
            ));
        }

        factors.extend(aggregated.modifiers.iter().map(ToString::to_string));

        if context.severity > 0.0 {
            factors.push(format!("Weather severity {:.2}", context.severity));
        }
        if let Some(home_spread) = consensus.home_spread() {
            factors.push(format!(
                "Market consensus: {} {:+.1} ({} books)",
                home.team, home_spread, consensus.spread_books
            ));
        }
        if !inputs.unavailable.is_empty() {
            let names: Vec<_> = inputs.unavailable.iter().map(ToString::to_string).collect();
            factors.push(format!("Unavailable sources: {}", names.join(", ")));
        }
        factors
    }
}

const MIN_FACTOR_POINTS: f64 = 0.5;

fn optional<T>(
    dataset: Dataset,
    team: &str,
    result: Result<T, SourceError>,
    unavailable: &mut Vec<Dataset>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("{dataset} for {team} degraded to defaults: {err}");
            if !unavailable.contains(&dataset) {
                unavailable.push(dataset);
            }
            None
        }
    }
}

fn form_of(snapshot: &TeamMetricsSnapshot) -> f64 {
    snapshot
        .get(SnapshotField::RecentForm)
        .unwrap_or_else(|| SnapshotField::RecentForm.neutral())
}

fn rest_days(
    team: &str,
    inputs: &TeamInputs,
    as_of: &AsOf,
    reference: &ReferenceData,
) -> Option<u32> {
    let today = as_of.date?;
    let games = inputs
        .season_games
        .as_deref()
        .or(inputs.recent_games.as_deref())?;
    let last = last_played(team, games, as_of, reference)?;
    u32::try_from((today - last).num_days()).ok()
}

fn has_games(games: Option<&[GameHistoryRecord]>) -> bool {
    games.is_some_and(|games| !games.is_empty())
}

fn availability(inputs: &MatchupInputs) -> Availability {
    let both = |present: fn(&TeamInputs) -> bool| present(&inputs.home) && present(&inputs.away);
    Availability {
        team_metrics: both(|team| team.snapshot.has_efficiency()),
        recent_games: both(|team| has_games(team.recent_games.as_deref())),
        season_history: both(|team| has_games(team.season_games.as_deref())),
        ratings: both(|team| {
            team.snapshot.get(SnapshotField::Rating).is_some()
                || team.snapshot.get(SnapshotField::Talent).is_some()
        }),
        weather: inputs.weather.is_some(),
        polls: inputs.polls.as_ref().is_some_and(|polls| !polls.is_empty()),
        calendar: inputs.context.as_ref().is_some_and(has_calendar),
    }
}

fn has_calendar(game: &GameContext) -> bool {
    game.week > 0 || game.date.is_some()
}
