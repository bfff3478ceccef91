use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, bail};
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info, warn};

use gridcast::config::ModelConfig;
use gridcast::domain::Side;
use gridcast::forecast::Forecaster;
use gridcast::market::normalize_all;
use gridcast::print;
use gridcast::reference::ReferenceData;
use gridcast::source::BundleSource;

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// file to source the matchup data from
    #[clap(short = 'b', long)]
    bundle: Option<PathBuf>,

    /// reference data (aliases, tiers, coaches and league averages)
    #[clap(short = 'r', long)]
    reference: Option<PathBuf>,

    /// model configuration overrides
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// home team; defaults to the first team in the bundle
    #[clap(long)]
    home: Option<String>,

    /// away team; defaults to the second team in the bundle
    #[clap(long)]
    away: Option<String>,

    /// side whose betting edges to report
    #[clap(short = 't', long, default_value = "home")]
    team: Side,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        self.bundle
            .as_ref()
            .ok_or(anyhow!("a matchup bundle must be specified with -b"))?;
        if let (Some(home), Some(away)) = (&self.home, &self.away) {
            if home.trim().eq_ignore_ascii_case(away.trim()) {
                bail!("home and away teams must differ");
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    if env::var("RUST_BACKTRACE").is_err() {
        env::set_var("RUST_BACKTRACE", "full")
    }
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    args.validate()?;
    debug!("args: {args:?}");

    let reference = match &args.reference {
        None => ReferenceData::default(),
        Some(path) => ReferenceData::read(path)?,
    };
    let reference = Arc::new(reference);
    let config = match &args.config {
        None => ModelConfig::default(),
        Some(path) => ModelConfig::read(path)?,
    };
    let bundle_path = args.bundle.as_ref().ok_or(anyhow!("missing bundle"))?;
    let source = BundleSource::read(bundle_path, reference.clone())?;

    let team_name = |explicit: &Option<String>, index: usize| {
        explicit
            .clone()
            .or_else(|| source.bundle().teams.get(index).map(|team| team.team.clone()))
            .ok_or(anyhow!("the bundle names fewer than {} teams", index + 1))
    };
    let home = team_name(&args.home, 0)?;
    let away = team_name(&args.away, 1)?;
    info!("forecasting {home} vs {away}");

    let start_time = Instant::now();
    let forecaster = Forecaster::new(reference, config)?;
    let inputs = forecaster.gather(&source, &home, &away).await?;
    if !inputs.unavailable.is_empty() {
        warn!("proceeding without {:?}", inputs.unavailable);
    }
    let assessment = forecaster.assess(&inputs);
    let elapsed = start_time.elapsed();
    debug!("assessed in {:.3}s", elapsed.as_millis() as f64 / 1_000.);

    let console = Console::default();
    info!("forecast:\n{}", console.render(&print::tabulate_forecast(&assessment.forecast)));
    info!(
        "signals:\n{}",
        console.render(&print::tabulate_signals(
            &assessment,
            &forecaster.config().aggregate.weights,
        ))
    );
    info!("confidence:\n{}", console.render(&print::tabulate_confidence(&assessment.confidence)));
    info!("key factors:\n{}", console.render(&print::tabulate_key_factors(&assessment.forecast)));

    let market = &forecaster.config().market;
    let lines = normalize_all(&assessment.market_lines, args.team);
    if !lines.is_empty() {
        info!("lines ({}):\n{}", args.team, console.render(&print::tabulate_lines(&lines)));
    }
    let report = assessment.edge_report(args.team, market);
    info!("betting edges:\n{}", console.render(&print::tabulate_edge_report(&report)));
    Ok(())
}
