use anyhow::{Context, Result};
use clap::Parser;
use marketflow::application::market_data::pipeline::MarketPipeline;
use marketflow::config::PipelineConfig;
use marketflow::domain::market::candle::CandleEvent;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Replay a CSV candle history through the pipeline and print the
/// resulting snapshots and confluence report as JSON.
///
/// Replays take the direct `apply_candle` path, bypassing the live queue:
/// the same candles always rebuild the same state, which is what warm
/// restarts rely on. The CSV must carry a header with the wire field
/// names: t,o,h,l,c,v.
#[derive(Parser, Debug)]
#[command(name = "replay", version, about)]
struct Args {
    /// CSV file of base-resolution candles
    csv: PathBuf,

    /// Candles kept in the render packet
    #[arg(long, default_value_t = 200)]
    max_points: usize,

    /// Also print the chart render packet
    #[arg(long, default_value_t = false)]
    render: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let config = PipelineConfig::default();
    let mut pipeline = MarketPipeline::new(config.clone()).context("pipeline construction failed")?;

    let mut reader = csv::Reader::from_path(&args.csv)
        .with_context(|| format!("cannot open {}", args.csv.display()))?;

    let mut applied = 0u64;
    let mut rejected = 0u64;
    for record in reader.deserialize::<CandleEvent>() {
        let event = record.context("malformed CSV record")?;
        match event.validate() {
            Ok(candle) => {
                pipeline.apply_candle(candle);
                applied += 1;
            }
            Err(err) => {
                // One bad row must not abort the replay
                warn!("replay: event rejected: {}", err);
                rejected += 1;
            }
        }
    }
    info!(
        "replay: {} candles applied, {} rejected from {}",
        applied,
        rejected,
        args.csv.display()
    );

    for timeframe in &config.timeframes {
        match pipeline.snapshot(*timeframe) {
            Some(snapshot) => {
                println!(
                    "{{\"timeframe\":\"{}\",\"snapshot\":{}}}",
                    timeframe,
                    serde_json::to_string(&snapshot)?
                );
            }
            None => warn!("replay: no closed candles on {}", timeframe),
        }
    }

    let report = pipeline.confluence_report();
    println!(
        "{{\"confluence\":{}}}",
        serde_json::to_string(&report).context("report serialization failed")?
    );

    if args.render {
        let packet = pipeline.render_packet(args.max_points);
        println!(
            "{{\"render\":{}}}",
            serde_json::to_string(&packet).context("render packet serialization failed")?
        );
    }

    Ok(())
}
