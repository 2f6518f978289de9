use std::fs;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use clap::Parser;
use log::*;

use testrunner::{matrix, run_sweep, TestReport};

#[derive(Parser)]
struct Args {
    output_dir: String,

    #[arg(short('j'), default_value_t = num_cpus::get())]
    parallel: usize,

    #[arg(long, default_value_t = 1_000_000)]
    rounds: u64,

    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .init();
    let args = Args::parse();

    let combos = matrix();
    info!(
        "Collected {} sweeps, running {} in parallel",
        combos.len(),
        args.parallel
    );

    let report = Arc::new(Mutex::new(TestReport::default()));
    let pool = rusty_pool::ThreadPool::new(args.parallel, args.parallel, Duration::from_secs(60));
    let start_time = Instant::now();

    for (i, (op, format)) in combos.into_iter().enumerate() {
        let t_report = Arc::clone(&report);
        // Distinct seed per sweep so failures reproduce through `single`
        let seed = args.seed.wrapping_add(i as u64);
        let rounds = args.rounds;

        pool.execute(move || {
            info!("Sweeping {op} / {format} for {rounds} rounds (seed {seed:#x})...");
            let summary = run_sweep(op, format, seed, rounds);
            if !summary.passed() {
                error!("{op} / {format}: {} mismatches", summary.failures);
                for m in &summary.sample {
                    error!(
                        "mismatch: a={} b={} ours={} host={}",
                        m.a, m.b, m.ours, m.host
                    );
                }
            }
            t_report.lock().unwrap().runs.push(summary);
        });
    }
    pool.shutdown_join();

    let report = report.as_ref().lock().unwrap();
    fs::write(
        format!("{}/report.json", args.output_dir),
        serde_json::to_string(&*report)?,
    )?;
    info!("Sweeps completed in {:?}", Instant::now() - start_time);

    let failed = report.runs.iter().filter(|r| !r.passed()).count();
    if failed > 0 {
        bail!("{} of {} sweeps failed", failed, report.runs.len());
    }
    Ok(())
}
