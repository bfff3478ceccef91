use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::anyhow;
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info};

use gridcast::calibrate::{evaluate, fit_platt, Platt, Sample};
use gridcast::file::ReadJsonFile;
use gridcast::print;

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// file to source the historical predictions from
    #[clap(short = 'f', long)]
    file: Option<PathBuf>,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        self.file
            .as_ref()
            .ok_or(anyhow!("a samples file must be specified with -f"))?;
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
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

    let path = args.file.as_ref().ok_or(anyhow!("missing samples file"))?;
    let samples = Vec::<Sample>::read_json_file(path)?;
    if samples.iter().any(|sample| !(0.0..=1.0).contains(&sample.probability)) {
        return Err(anyhow!("sample probabilities must lie in [0, 1]").into());
    }
    info!("fitting calibration constants to {} samples", samples.len());

    let start_time = Instant::now();
    let fit = fit_platt(&samples)?;
    let elapsed = start_time.elapsed();
    info!(
        "fitted a={:.4}, b={:.4} in {} rounds and {} steps, took {:.3}s",
        fit.platt.a,
        fit.platt.b,
        fit.rounds,
        fit.steps,
        elapsed.as_millis() as f64 / 1_000.
    );

    let before = evaluate(&samples, &Platt::identity());
    let after = evaluate(&samples, &fit.platt);
    info!("metrics:\n{}", Console::default().render(&print::tabulate_metrics(&before, &after)));
    Ok(())
}
