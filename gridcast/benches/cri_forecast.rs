use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use gridcast::config::ModelConfig;
use gridcast::domain::{MarketLine, Side};
use gridcast::forecast::Forecaster;
use gridcast::market::{consensus, MarketConfig};
use gridcast::reference::ReferenceData;
use gridcast::source::BundleSource;

const BUNDLE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../data/bundle.json");
const REFERENCE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../data/reference.json");

fn criterion_benchmark(c: &mut Criterion) {
    let reference = Arc::new(ReferenceData::read(REFERENCE).unwrap());
    let source = BundleSource::read(BUNDLE, reference.clone()).unwrap();
    let forecaster = Forecaster::new(reference, ModelConfig::default()).unwrap();
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let inputs = runtime
        .block_on(forecaster.gather(&source, "Oregon", "Ohio State"))
        .unwrap();

    c.bench_function("cri_forecast_gather", |b| {
        b.iter(|| {
            runtime
                .block_on(forecaster.gather(&source, "Oregon", "Ohio State"))
                .unwrap()
        });
    });

    c.bench_function("cri_forecast_assess", |b| {
        b.iter(|| forecaster.assess(&inputs));
    });

    let assessment = forecaster.assess(&inputs);
    c.bench_function("cri_forecast_edge_report", |b| {
        b.iter(|| assessment.edge_report(Side::Away, &MarketConfig::default()));
    });

    let lines: Vec<_> = (0..40)
        .map(|i| {
            let spread = -3.0 - (i % 7) as f64 * 0.5;
            MarketLine::new(format!("book-{i}"), spread, 48.0 + (i % 5) as f64)
        })
        .collect();
    c.bench_function("cri_forecast_consensus_40", |b| {
        b.iter(|| consensus(&lines, Side::Home, &MarketConfig::default()));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
