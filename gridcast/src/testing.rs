//! Fixtures shared by the unit tests: a strong home favourite hosting a weak visitor.

use chrono::{Days, NaiveDate};

use crate::domain::{
    CoachingRecord, Efficiency, GameContext, GameHistoryRecord, MarketLine, PlayerEfficiency,
    PollEntry, Position, TeamInputs, TeamMetricsSnapshot, Weather,
};
use crate::reference::{ReferenceData, Tier};
use crate::source::{MatchupBundle, TeamBundle};

pub const HOME: &str = "Georgia";
pub const AWAY: &str = "Kent State";

pub fn reference() -> ReferenceData {
    ReferenceData::default()
        .with_tier(HOME, Tier::Power)
        .with_tier(AWAY, Tier::Group)
        .with_alias("UGA", HOME)
}

fn week_date(week: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 8, 31)
        .unwrap()
        .checked_add_days(Days::new(7 * (week as u64 - 1)))
        .unwrap()
}

fn game(
    week: u32,
    team: &str,
    opponent: &str,
    points: (u32, u32),
    postgame: f64,
) -> GameHistoryRecord {
    GameHistoryRecord {
        week,
        date: Some(week_date(week)),
        home_team: team.into(),
        away_team: opponent.into(),
        home_points: Some(points.0),
        away_points: Some(points.1),
        home_postgame_win_prob: Some(postgame),
        completed: true,
        ..GameHistoryRecord::default()
    }
}

fn player(name: &str, position: Position, usage: f64, efficiency: f64) -> PlayerEfficiency {
    PlayerEfficiency {
        name: name.into(),
        position,
        usage: Some(usage),
        efficiency: Some(efficiency),
    }
}

fn home_team() -> TeamInputs {
    let season_games = vec![
        game(1, HOME, "Clemson", (34, 3), 0.85),
        game(2, HOME, "Tennessee Tech", (48, 3), 0.70),
        game(3, HOME, "Kentucky", (13, 12), 0.90),
        game(4, HOME, "Alabama", (34, 41), 0.80),
        game(5, HOME, "Auburn", (31, 13), 0.95),
        game(6, HOME, "Mississippi State", (41, 31), 0.88),
    ];
    let snapshot = TeamMetricsSnapshot {
        overall_epa: Efficiency::new(0.30, 0.05),
        passing_epa: Efficiency::new(0.45, 0.10),
        rushing_epa: Efficiency::new(0.20, 0.05),
        success_rate: Some(0.50),
        explosiveness: Some(1.40),
        passing_downs_success: Some(0.36),
        standard_downs_success: Some(0.53),
        line_yards: Some(3.3),
        second_level_yards: Some(1.2),
        open_field_yards: Some(1.6),
        highlight_yards: Some(1.3),
        talent: Some(980.0),
        rating: Some(25.0),
        offense_rating: Some(38.0),
        defense_rating: Some(14.0),
        strength_of_schedule: Some(5.0),
        ..TeamMetricsSnapshot::named(HOME)
    };
    TeamInputs {
        snapshot,
        recent_games: Some(season_games[2..].to_vec()),
        season_games: Some(season_games),
        roster: Some(vec![
            player("Carson Beck", Position::Quarterback, 0.92, 0.30),
            player("Trevor Etienne", Position::RunningBack, 0.45, 0.20),
            player("Nate Frazier", Position::RunningBack, 0.30, 0.15),
            player("Dillon Bell", Position::WideReceiver, 0.22, 0.24),
            player("Arian Smith", Position::WideReceiver, 0.18, 0.21),
            player("Colbie Young", Position::WideReceiver, 0.15, 0.18),
            player("Oscar Delp", Position::TightEnd, 0.12, 0.17),
            player("Malaki Starks", Position::Defender, 0.80, 0.16),
            player("Jalon Walker", Position::Defender, 0.75, 0.18),
            player("Mykel Williams", Position::Defender, 0.70, 0.14),
            player("Smael Mondon", Position::Defender, 0.65, 0.15),
            player("CJ Allen", Position::Defender, 0.60, 0.12),
        ]),
        coaching: Some(CoachingRecord {
            coach: "Kirby Smart".into(),
            wins: 94,
            losses: 16,
            seasons: 8,
        }),
    }
}

fn away_team() -> TeamInputs {
    let season_games = vec![
        game(1, AWAY, "Pittsburgh", (24, 55), 0.30),
        game(2, AWAY, "Tennessee", (0, 71), 0.20),
        game(3, AWAY, "Penn State", (0, 56), 0.35),
        game(4, AWAY, "Eastern Michigan", (37, 52), 0.15),
        game(5, AWAY, "Ball State", (35, 37), 0.25),
        game(6, AWAY, "Bowling Green", (14, 27), 0.10),
    ];
    let snapshot = TeamMetricsSnapshot {
        overall_epa: Efficiency::new(0.05, 0.20),
        passing_epa: Efficiency::new(0.10, 0.30),
        rushing_epa: Efficiency::new(0.02, 0.12),
        success_rate: Some(0.38),
        explosiveness: Some(1.15),
        passing_downs_success: Some(0.26),
        standard_downs_success: Some(0.43),
        line_yards: Some(2.5),
        second_level_yards: Some(0.9),
        open_field_yards: Some(0.9),
        highlight_yards: Some(0.8),
        talent: Some(560.0),
        offense_rating: Some(20.0),
        defense_rating: Some(33.0),
        strength_of_schedule: Some(-5.0),
        ..TeamMetricsSnapshot::named(AWAY)
    };
    TeamInputs {
        snapshot,
        recent_games: Some(season_games[2..].to_vec()),
        season_games: Some(season_games),
        roster: Some(vec![
            player("Devin Kargman", Position::Quarterback, 0.85, 0.05),
            player("Jaylen Thomas", Position::RunningBack, 0.40, 0.05),
            player("Gavin Garcia", Position::RunningBack, 0.25, 0.02),
            player("Chrishon McCray", Position::WideReceiver, 0.24, 0.06),
            player("Luke Floriea", Position::WideReceiver, 0.20, 0.04),
            player("Dante Cephas", Position::WideReceiver, 0.14, 0.03),
            player("Tim Cunningham", Position::TightEnd, 0.10, 0.01),
            player("CJ Meadows", Position::Defender, 0.80, 0.02),
            player("Khalil Hunt", Position::Defender, 0.75, 0.03),
            player("Zayne Turner", Position::Defender, 0.70, 0.02),
            player("Dionte Thornton", Position::Defender, 0.65, 0.01),
            player("Tyler Davis", Position::Defender, 0.60, 0.02),
        ]),
        coaching: Some(CoachingRecord {
            coach: "Kenni Burns".into(),
            wins: 2,
            losses: 22,
            seasons: 2,
        }),
    }
}

/// The home and away teams' inputs, without any matchup-level datasets.
pub fn teams() -> (TeamInputs, TeamInputs) {
    (home_team(), away_team())
}

fn team_bundle(inputs: TeamInputs) -> TeamBundle {
    TeamBundle {
        team: inputs.snapshot.team.clone(),
        metrics: Some(inputs.snapshot),
        season_games: inputs.season_games,
        recent_games: inputs.recent_games,
        roster: inputs.roster,
        coaching: inputs.coaching,
    }
}

/// A complete bundle for Georgia hosting Kent State in week 7. The home team is `teams[0]`.
pub fn bundle() -> MatchupBundle {
    let (home, away) = teams();
    MatchupBundle {
        teams: vec![team_bundle(home), team_bundle(away)],
        market_lines: Some(vec![
            MarketLine::new("DraftKings", -9.5, 53.0).with_moneylines(-380, 300),
            MarketLine::new("FanDuel", -10.0, 52.5).with_moneylines(-420, 320),
            MarketLine::new("BetMGM", -9.0, 53.5).with_moneylines(-360, 290),
        ]),
        weather: Some(Weather {
            temperature: Some(65.0),
            wind_speed: Some(6.0),
            precipitation: Some(0.0),
            humidity: Some(0.55),
            ..Weather::default()
        }),
        polls: Some(vec![
            PollEntry {
                poll: "AP Top 25".into(),
                team: HOME.into(),
                rank: 5,
                previous_rank: Some(5),
            },
            PollEntry {
                poll: "Coaches Poll".into(),
                team: HOME.into(),
                rank: 4,
                previous_rank: Some(4),
            },
        ]),
        context: Some(GameContext {
            week: 7,
            date: Some(week_date(7)),
            kickoff_hour: Some(12),
            ..GameContext::default()
        }),
    }
}
