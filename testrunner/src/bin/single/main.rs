use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Result};
use clap::Parser;
use log::*;

use testrunner::{run_sweep, Format, Op};

#[derive(Parser)]
struct Args {
    op: Op,
    format: Format,

    #[arg(long, default_value_t = 100_000)]
    rounds: u64,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Write the run summary as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .init();
    let args = Args::parse();

    if !args.op.supports(args.format) {
        bail!("{} is not supported for {}", args.op, args.format);
    }

    info!(
        "Sweeping {} / {} for {} rounds (seed {:#x})...",
        args.op, args.format, args.rounds, args.seed
    );
    let start = Instant::now();
    let summary = run_sweep(args.op, args.format, args.seed, args.rounds);
    let duration = (Instant::now() - start).as_secs_f64();
    info!(
        "Completed {} rounds in {:0.04}s ({:0.0} rounds/sec)",
        summary.rounds,
        duration,
        summary.rounds as f64 / duration,
    );

    if let Some(json_fn) = args.json.as_ref() {
        fs::write(json_fn, serde_json::to_string(&summary)?)?;
    }

    if !summary.passed() {
        for m in &summary.sample {
            error!(
                "mismatch: a={} b={} ours={} host={}",
                m.a, m.b, m.ours, m.host
            );
        }
        bail!("{} mismatches", summary.failures);
    }
    Ok(())
}
