//! Contextual sub-score: weather, poll momentum and rest advantage.

use serde::{Deserialize, Serialize};

use crate::domain::{CoachingRecord, PollEntry, TeamMetricsSnapshot, Weather};
use crate::reference::ReferenceData;

/// Rank assumed for a team entering a poll it was absent from the previous week.
const UNRANKED: u32 = 26;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub weather_weight: f64,
    pub poll_weight: f64,
    pub bye_weight: f64,
    pub wind_threshold: f64,
    pub wind_span: f64,
    pub precipitation_span: f64,
    pub cold_threshold: f64,
    pub cold_span: f64,
    pub heat_threshold: f64,
    pub heat_span: f64,
    /// Points per unit of passing-reliance gap at full severity.
    pub weather_points: f64,
    pub points_per_rank: f64,
    pub max_poll_momentum: f64,
    pub bye_points: f64,
    pub bye_rest_days: u32,
}
impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            weather_weight: 0.40,
            poll_weight: 0.30,
            bye_weight: 0.30,
            wind_threshold: 10.0,
            wind_span: 20.0,
            precipitation_span: 0.5,
            cold_threshold: 32.0,
            cold_span: 30.0,
            heat_threshold: 90.0,
            heat_span: 20.0,
            weather_points: 10.0,
            points_per_rank: 0.5,
            max_poll_momentum: 5.0,
            bye_points: 3.0,
            bye_rest_days: 13,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContextualScore {
    /// Weather severity in `[0, 1]`.
    pub severity: f64,
    pub weather_penalty: f64,
    pub poll_momentum: f64,
    pub bye_advantage: f64,
    pub score: f64,
}

fn ramp(excess: f64, span: f64) -> f64 {
    (excess / span).clamp(0.0, 1.0)
}

/// Combines wind (50%), precipitation (30%) and temperature extremes (20%) into a severity in
/// `[0, 1]`. Indoor games have no weather.
pub fn weather_severity(weather: &Weather, config: &ContextConfig) -> f64 {
    if weather.indoors {
        return 0.0;
    }
    let wind = weather
        .wind_speed
        .map(|wind| ramp(wind - config.wind_threshold, config.wind_span))
        .unwrap_or(0.0);
    let precipitation = weather
        .precipitation
        .map(|precipitation| ramp(precipitation, config.precipitation_span))
        .unwrap_or(0.0);
    let temperature = weather
        .temperature
        .map(|temperature| {
            f64::max(
                ramp(config.cold_threshold - temperature, config.cold_span),
                ramp(temperature - config.heat_threshold, config.heat_span),
            )
        })
        .unwrap_or(0.0);
    (0.5 * wind + 0.3 * precipitation + 0.2 * temperature).clamp(0.0, 1.0)
}

/// How much better a team passes than it runs, in net EPA per play.
fn passing_reliance(snapshot: &TeamMetricsSnapshot) -> f64 {
    match (snapshot.passing_epa.offense, snapshot.rushing_epa.offense) {
        (Some(passing), Some(rushing)) if passing.is_finite() && rushing.is_finite() => {
            passing - rushing
        }
        _ => 0.0,
    }
}

/// Severe weather penalises the more pass-reliant team. Positive favours home.
pub fn weather_penalty(
    severity: f64,
    home: &TeamMetricsSnapshot,
    away: &TeamMetricsSnapshot,
    config: &ContextConfig,
) -> f64 {
    -severity * (passing_reliance(home) - passing_reliance(away)) * config.weather_points
}

/// Places climbed since the previous poll, averaged across the polls ranking the team.
fn momentum(team: &str, polls: &[PollEntry], reference: &ReferenceData) -> f64 {
    let moves: Vec<_> = polls
        .iter()
        .filter(|entry| reference.same_team(&entry.team, team))
        .map(|entry| entry.previous_rank.unwrap_or(UNRANKED) as f64 - entry.rank as f64)
        .collect();
    if moves.is_empty() {
        0.0
    } else {
        moves.iter().sum::<f64>() / moves.len() as f64
    }
}

/// Home-minus-away poll momentum in points.
pub fn poll_momentum(
    home: &str,
    away: &str,
    polls: &[PollEntry],
    reference: &ReferenceData,
    config: &ContextConfig,
) -> f64 {
    let gap = (momentum(home, polls, reference) - momentum(away, polls, reference))
        * config.points_per_rank;
    gap.clamp(-config.max_poll_momentum, config.max_poll_momentum)
}

/// Home-minus-away rest advantage in points. A team coming off a bye gains `bye_points`, scaled
/// by its coach's career win percentage (an unknown coach counts as .500).
pub fn bye_advantage(
    home_rest_days: Option<u32>,
    away_rest_days: Option<u32>,
    home_coach: Option<&CoachingRecord>,
    away_coach: Option<&CoachingRecord>,
    config: &ContextConfig,
) -> f64 {
    let advantage = |rest_days: Option<u32>, coach: Option<&CoachingRecord>| {
        if rest_days.is_some_and(|days| days >= config.bye_rest_days) {
            let win_pct = coach.and_then(CoachingRecord::win_pct).unwrap_or(0.5);
            config.bye_points * (0.5 + win_pct)
        } else {
            0.0
        }
    };
    advantage(home_rest_days, home_coach) - advantage(away_rest_days, away_coach)
}

/// Everything the contextual sub-score needs, resolved by the caller.
#[derive(Debug)]
pub struct ContextInputs<'a> {
    pub home: &'a TeamMetricsSnapshot,
    pub away: &'a TeamMetricsSnapshot,
    pub weather: Option<&'a Weather>,
    pub polls: &'a [PollEntry],
    pub home_rest_days: Option<u32>,
    pub away_rest_days: Option<u32>,
    pub home_coach: Option<&'a CoachingRecord>,
    pub away_coach: Option<&'a CoachingRecord>,
    pub reference: &'a ReferenceData,
}

pub fn contextual_score(inputs: &ContextInputs, config: &ContextConfig) -> ContextualScore {
    let severity = inputs
        .weather
        .map(|weather| weather_severity(weather, config))
        .unwrap_or(0.0);
    let weather_penalty = weather_penalty(severity, inputs.home, inputs.away, config);
    let poll_momentum = poll_momentum(
        &inputs.home.team,
        &inputs.away.team,
        inputs.polls,
        inputs.reference,
        config,
    );
    let bye_advantage = bye_advantage(
        inputs.home_rest_days,
        inputs.away_rest_days,
        inputs.home_coach,
        inputs.away_coach,
        config,
    );
    let score = config.weather_weight * weather_penalty
        + config.poll_weight * poll_momentum
        + config.bye_weight * bye_advantage;
    ContextualScore {
        severity,
        weather_penalty,
        poll_momentum,
        bye_advantage,
        score,
    }
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;

    use crate::domain::Efficiency;

    use super::*;

    #[test]
    fn calm_weather_has_no_severity() {
        let weather = Weather {
            temperature: Some(68.0),
            wind_speed: Some(5.0),
            precipitation: Some(0.0),
            ..Weather::default()
        };
        assert_eq!(0.0, weather_severity(&weather, &ContextConfig::default()));
        assert_eq!(0.0, weather_severity(&Weather::default(), &ContextConfig::default()));
    }

    #[test]
    fn severity_components() {
        let config = ContextConfig::default();
        let windy = Weather {
            wind_speed: Some(20.0),
            ..Weather::default()
        };
        assert_float_absolute_eq!(0.25, weather_severity(&windy, &config), 1e-12);

        let blizzard = Weather {
            temperature: Some(2.0),
            wind_speed: Some(40.0),
            precipitation: Some(1.2),
            ..Weather::default()
        };
        assert_float_absolute_eq!(1.0, weather_severity(&blizzard, &config), 1e-12);

        let indoors = Weather {
            indoors: true,
            ..blizzard
        };
        assert_eq!(0.0, weather_severity(&indoors, &config));
    }

    #[test]
    fn weather_penalises_passing_team() {
        let passing = TeamMetricsSnapshot {
            passing_epa: Efficiency::new(0.40, 0.1),
            rushing_epa: Efficiency::new(0.0, 0.1),
            ..TeamMetricsSnapshot::named("Air Raid")
        };
        let rushing = TeamMetricsSnapshot {
            passing_epa: Efficiency::new(0.0, 0.1),
            rushing_epa: Efficiency::new(0.20, 0.1),
            ..TeamMetricsSnapshot::named("Triple Option")
        };
        let penalty = weather_penalty(0.5, &passing, &rushing, &ContextConfig::default());
        // -0.5 × (0.40 - (-0.20)) × 10
        assert_float_absolute_eq!(-3.0, penalty, 1e-9);
        assert_eq!(0.0, weather_penalty(0.0, &passing, &rushing, &ContextConfig::default()));
    }

    #[test]
    fn poll_momentum_rewards_climbers() {
        let polls = [
            PollEntry {
                poll: "AP Top 25".into(),
                team: "Indiana".into(),
                rank: 8,
                previous_rank: Some(12),
            },
            PollEntry {
                poll: "Coaches Poll".into(),
                team: "Indiana".into(),
                rank: 9,
                previous_rank: Some(11),
            },
            PollEntry {
                poll: "AP Top 25".into(),
                team: "Michigan".into(),
                rank: 20,
                previous_rank: None,
            },
        ];
        let config = ContextConfig::default();
        let reference = ReferenceData::default();
        // Indiana +3 average, Michigan +6 (entered the poll)
        assert_float_absolute_eq!(
            -1.5,
            poll_momentum("Indiana", "Michigan", &polls, &reference, &config),
            1e-12
        );
        assert_float_absolute_eq!(
            1.5,
            poll_momentum("Indiana", "Purdue", &polls, &reference, &config),
            1e-12
        );
        assert_eq!(0.0, poll_momentum("Purdue", "Rutgers", &polls, &reference, &config));
    }

    #[test]
    fn poll_entries_under_an_alias_count() {
        let polls = [PollEntry {
            poll: "AP Top 25".into(),
            team: "The U".into(),
            rank: 6,
            previous_rank: Some(10),
        }];
        let config = ContextConfig::default();
        let reference = ReferenceData::default().with_alias("The U", "Miami (FL)");
        assert_float_absolute_eq!(
            2.0,
            poll_momentum("Miami (FL)", "Duke", &polls, &reference, &config),
            1e-12
        );
        assert_eq!(
            0.0,
            poll_momentum("Miami (FL)", "Duke", &polls, &ReferenceData::default(), &config)
        );
    }

    #[test]
    fn poll_momentum_is_capped() {
        let polls = [PollEntry {
            poll: "AP Top 25".into(),
            team: "Indiana".into(),
            rank: 1,
            previous_rank: None,
        }];
        assert_eq!(
            5.0,
            poll_momentum(
                "Indiana",
                "Purdue",
                &polls,
                &ReferenceData::default(),
                &ContextConfig::default()
            )
        );
    }

    #[test]
    fn bye_advantage_needs_long_rest() {
        let config = ContextConfig::default();
        assert_eq!(3.0, bye_advantage(Some(14), Some(7), None, None, &config));
        assert_eq!(0.0, bye_advantage(Some(14), Some(13), None, None, &config));
        assert_eq!(0.0, bye_advantage(None, None, None, None, &config));
        let elite = CoachingRecord {
            coach: "Nick Saban".into(),
            wins: 9,
            losses: 1,
            seasons: 1,
        };
        assert_float_absolute_eq!(
            -4.2,
            bye_advantage(Some(6), Some(20), None, Some(&elite), &config),
            1e-12
        );
    }

    #[test]
    fn contextual_score_weights_components() {
        let home = TeamMetricsSnapshot::named("Indiana");
        let away = TeamMetricsSnapshot::named("Purdue");
        let reference = ReferenceData::default();
        let inputs = ContextInputs {
            home: &home,
            away: &away,
            weather: None,
            polls: &[],
            home_rest_days: Some(14),
            away_rest_days: Some(7),
            home_coach: None,
            away_coach: None,
            reference: &reference,
        };
        let score = contextual_score(&inputs, &ContextConfig::default());
        assert_eq!(0.0, score.severity);
        assert_float_absolute_eq!(0.3 * 3.0, score.score, 1e-12);
    }
}
