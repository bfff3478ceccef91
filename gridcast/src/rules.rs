//! Data-driven situational adjustments.
//!
//! Each [`Rule`] compares one snapshot field of the home team, the away team, or their
//! difference against a threshold and, when it fires, adds a fixed number of points to the
//! differential (positive favours home). Rules are supplied through configuration; no team is
//! singled out in code.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::domain::{SnapshotField, TeamMetricsSnapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Home,
    Away,
    /// Home value less away value.
    Differential,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Above,
    Below,
}
impl Comparison {
    fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Above => value > threshold,
            Comparison::Below => value < threshold,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub subject: Subject,
    pub field: SnapshotField,
    pub comparison: Comparison,
    pub threshold: f64,
    pub adjustment: f64,
}
impl Rule {
    /// The rule's adjustment if it fires. A rule over a missing value never fires.
    pub fn evaluate(&self, home: &TeamMetricsSnapshot, away: &TeamMetricsSnapshot) -> Option<f64> {
        let value = match self.subject {
            Subject::Home => home.get(self.field)?,
            Subject::Away => away.get(self.field)?,
            Subject::Differential => home.get(self.field)? - away.get(self.field)?,
        };
        if self.comparison.holds(value, self.threshold) {
            Some(self.adjustment)
        } else {
            None
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FiredRule {
    pub name: String,
    pub adjustment: f64,
}

impl Display for FiredRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:+.1})", self.name, self.adjustment)
    }
}

pub fn apply(
    rules: &[Rule],
    home: &TeamMetricsSnapshot,
    away: &TeamMetricsSnapshot,
) -> Vec<FiredRule> {
    rules
        .iter()
        .filter_map(|rule| {
            rule.evaluate(home, away).map(|adjustment| FiredRule {
                name: rule.name.clone(),
                adjustment,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn talent_gap() -> Rule {
        Rule {
            name: "talent mismatch".into(),
            subject: Subject::Differential,
            field: SnapshotField::Talent,
            comparison: Comparison::Above,
            threshold: 200.0,
            adjustment: 1.5,
        }
    }

    #[test]
    fn fires_on_differential() {
        let home = TeamMetricsSnapshot {
            talent: Some(980.0),
            ..TeamMetricsSnapshot::named("Alabama")
        };
        let away = TeamMetricsSnapshot {
            talent: Some(640.0),
            ..TeamMetricsSnapshot::named("Mercer")
        };
        assert_eq!(Some(1.5), talent_gap().evaluate(&home, &away));
        assert_eq!(None, talent_gap().evaluate(&away, &home));
    }

    #[test]
    fn missing_values_never_fire() {
        let home = TeamMetricsSnapshot {
            talent: Some(980.0),
            ..TeamMetricsSnapshot::named("Alabama")
        };
        let away = TeamMetricsSnapshot::named("Mercer");
        assert_eq!(None, talent_gap().evaluate(&home, &away));
    }

    #[test]
    fn rate_rules_respect_sanitisation() {
        let rule = Rule {
            name: "struggling away offense".into(),
            subject: Subject::Away,
            field: SnapshotField::SuccessRate,
            comparison: Comparison::Below,
            threshold: 0.35,
            adjustment: 0.75,
        };
        let home = TeamMetricsSnapshot::named("Kansas");
        let poor = TeamMetricsSnapshot {
            success_rate: Some(0.31),
            ..TeamMetricsSnapshot::named("Kent State")
        };
        let corrupt = TeamMetricsSnapshot {
            success_rate: Some(-4.0),
            ..TeamMetricsSnapshot::named("Kent State")
        };
        assert_eq!(Some(0.75), rule.evaluate(&home, &poor));
        assert_eq!(None, rule.evaluate(&home, &corrupt));
    }

    #[test]
    fn apply_collects_fired_rules() {
        let rules: Vec<Rule> = serde_json::from_str(
            r#"[
                {"name": "talent mismatch", "subject": "differential", "field": "talent",
                 "comparison": "above", "threshold": 200.0, "adjustment": 1.5},
                {"name": "home rating floor", "subject": "home", "field": "rating",
                 "comparison": "below", "threshold": -10.0, "adjustment": -1.0}
            ]"#,
        )
        .unwrap();
        let home = TeamMetricsSnapshot {
            talent: Some(980.0),
            rating: Some(25.0),
            ..TeamMetricsSnapshot::named("Alabama")
        };
        let away = TeamMetricsSnapshot {
            talent: Some(640.0),
            ..TeamMetricsSnapshot::named("Mercer")
        };
        let fired = apply(&rules, &home, &away);
        assert_eq!(1, fired.len());
        assert_eq!("talent mismatch (+1.5)", fired[0].to_string());
    }
}
