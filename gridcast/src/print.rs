use stanza::style::HAlign::Left;
use stanza::style::{HAlign, Header, MinWidth, Styles};
use stanza::table::{Col, Row, Table};

use crate::aggregate::SignalWeights;
use crate::calibrate::Metrics;
use crate::confidence::ConfidenceBreakdown;
use crate::domain::Forecast;
use crate::forecast::Assessment;
use crate::market::{BettingEdgeReport, Direction, NormalizedMarketLine};

fn label_value_table() -> Table {
    Table::default().with_cols(vec![
        Col::new(Styles::default().with(MinWidth(10)).with(Left)),
        Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
    ])
}

fn push_pair(table: &mut Table, label: &str, value: String) {
    table.push_row(Row::new(Styles::default(), vec![label.to_string().into(), value.into()]));
}

fn signed(value: Option<f64>) -> String {
    value.map(|value| format!("{value:+.1}")).unwrap_or_else(|| "-".into())
}

pub fn tabulate_forecast(forecast: &Forecast) -> Table {
    let mut table = label_value_table();
    push_pair(&mut table, "Home", forecast.home_team.clone());
    push_pair(&mut table, "Away", forecast.away_team.clone());
    push_pair(&mut table, "Home win", format!("{:.3}", forecast.home_win_probability));
    push_pair(&mut table, "Spread", format!("{:+.1}", forecast.predicted_spread));
    push_pair(&mut table, "Total", format!("{:.1}", forecast.predicted_total));
    push_pair(&mut table, "Confidence", format!("{:.2}", forecast.confidence));
    table
}

pub fn tabulate_key_factors(forecast: &Forecast) -> Table {
    let mut table = Table::default()
        .with_cols(vec![Col::new(Styles::default().with(MinWidth(30)).with(Left))])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec!["Key factors".into()],
        ));
    for factor in &forecast.key_factors {
        table.push_row(Row::new(Styles::default(), vec![factor.clone().into()]));
    }
    table
}

pub fn tabulate_signals(assessment: &Assessment, weights: &SignalWeights) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(20)).with(Left)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec!["Signal".into(), "Points".into(), "Weight".into(), "Weighted".into()],
        ));
    for (signal, value) in assessment.aggregated.signals.iter() {
        let weight = weights.weight(signal);
        table.push_row(Row::new(
            Styles::default(),
            vec![
                signal.to_string().into(),
                format!("{value:+.2}").into(),
                format!("{weight:.2}").into(),
                format!("{:+.2}", value * weight).into(),
            ],
        ));
    }
    table.push_row(Row::new(
        Styles::default().with(Header(true)),
        vec![
            "Weighted sum".into(),
            "".into(),
            "".into(),
            format!("{:+.2}", assessment.aggregated.weighted).into(),
        ],
    ));
    for modifier in &assessment.aggregated.modifiers {
        table.push_row(Row::new(
            Styles::default(),
            vec![modifier.to_string().into(), "".into(), "".into(), "".into()],
        ));
    }
    table.push_row(Row::new(
        Styles::default().with(Header(true)),
        vec![
            "Differential".into(),
            "".into(),
            "".into(),
            format!("{:+.2}", assessment.aggregated.differential).into(),
        ],
    ));
    table
}

pub fn tabulate_confidence(breakdown: &ConfidenceBreakdown) -> Table {
    let mut table = label_value_table().with_row(Row::new(
        Styles::default().with(Header(true)),
        vec!["Confidence".into(), "Value".into()],
    ));
    for (component, value) in &breakdown.components {
        push_pair(&mut table, &component.to_string(), format!("{value:+.3}"));
    }
    push_pair(&mut table, "Unclamped", format!("{:.3}", breakdown.unclamped));
    push_pair(&mut table, "Final", format!("{:.3}", breakdown.confidence));
    table
}

pub fn tabulate_lines(lines: &[NormalizedMarketLine]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(12)).with(Left)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec![
                "Provider".into(),
                "Spread".into(),
                "Total".into(),
                "ML team".into(),
                "ML opp".into(),
            ],
        ));
    let moneyline = |odds: Option<i32>| {
        odds.map(|odds| format!("{odds:+}"))
            .unwrap_or_else(|| "-".into())
    };
    for line in lines {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                line.provider.clone().into(),
                signed(line.spread).into(),
                line.total
                    .map(|total| format!("{total:.1}"))
                    .unwrap_or_else(|| "-".into())
                    .into(),
                moneyline(line.moneyline_team).into(),
                moneyline(line.moneyline_opponent).into(),
            ],
        ));
    }
    table
}

pub fn tabulate_edge_report(report: &BettingEdgeReport) -> Table {
    let mut table = label_value_table();
    push_pair(&mut table, "Team", format!("{} ({})", report.team, report.side));
    push_pair(&mut table, "Opponent", report.opponent.clone());
    push_pair(&mut table, "Spread edge", format!("{:+.1}", report.spread_value_edge));
    push_pair(&mut table, "Total edge", format!("{:+.1}", report.total_value_edge));
    if let Some(probability) = report.market_win_probability {
        push_pair(&mut table, "Market win", format!("{probability:.3}"));
    }
    for pick in &report.picks {
        let label = match pick.direction {
            Direction::TeamOfInterest => "Take team",
            Direction::Opponent => "Take opponent",
            Direction::Over => "Over",
            Direction::Under => "Under",
        };
        push_pair(
            &mut table,
            label,
            format!("{:.1} @ {} ({:.1} pts)", pick.line, pick.provider, pick.edge.abs()),
        );
    }
    push_pair(&mut table, "Recommendation", report.recommendation_text.clone());
    for warning in &report.warnings {
        push_pair(&mut table, "Warning", warning.to_string());
    }
    table
}

pub fn tabulate_metrics(before: &Metrics, after: &Metrics) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(10)).with(Left)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec!["Metric".into(), "Before".into(), "After".into()],
        ));
    let rows = [
        ("Samples", before.samples as f64, after.samples as f64),
        ("Brier", before.brier, after.brier),
        ("Log loss", before.log_loss, after.log_loss),
        ("Accuracy", before.accuracy, after.accuracy),
    ];
    for (label, before, after) in rows {
        table.push_row(Row::new(
            Styles::default(),
            vec![label.into(), format!("{before:.4}").into(), format!("{after:.4}").into()],
        ));
    }
    table
}
